use serde::{Deserialize, Serialize};

/// Body of `POST /v1/auth/<mount>/login` for the kubernetes method
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub jwt: &'a str,
    pub role: &'a str,
}

/// Body of `POST /v1/auth/token/renew-self`
#[derive(Serialize)]
pub(crate) struct RenewSelfRequest {
    pub increment: u64,
}

/// Secret envelope returned by the auth endpoints
#[derive(Deserialize)]
pub(crate) struct AuthResponse {
    #[serde(default)]
    pub auth: Option<AuthData>,
}

#[derive(Deserialize)]
pub(crate) struct AuthData {
    pub client_token: String,
    #[serde(default)]
    pub accessor: Option<String>,
    #[serde(default)]
    pub policies: Vec<String>,
    pub lease_duration: u64,
    pub renewable: bool,
}

/// Error body, e.g. `{"errors": ["permission denied"]}`
#[derive(Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
}
