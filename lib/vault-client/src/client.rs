use crate::error::VaultError;
use crate::lease::Lease;
use crate::models::{AuthResponse, ErrorResponse, LoginRequest, RenewSelfRequest};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const TOKEN_HEADER: &str = "X-Vault-Token";

pub struct VaultClientBuilder {
    base_url: Option<String>,
    application_name: Option<String>,
    timeout: Duration,
}

impl Default for VaultClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            application_name: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<VaultClient, VaultError> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var("VAULT_ADDR").ok())
            .filter(|url| !url.is_empty())
            .ok_or(VaultError::VaultNotDetected)?;

        let mut http = reqwest::Client::builder().timeout(self.timeout);
        if let Some(ref app_name) = self.application_name {
            http = http.user_agent(app_name.as_str());
        }
        let http = http
            .build()
            .map_err(|e| VaultError::Transport(e.to_string()))?;

        Ok(VaultClient {
            base_url: Arc::from(base_url.trim_end_matches('/')),
            http,
        })
    }
}

/// Thin handle over the Vault HTTP API, cheap to clone
#[derive(Clone)]
pub struct VaultClient {
    base_url: Arc<str>,
    http: reqwest::Client,
}

impl VaultClient {
    pub fn builder() -> VaultClientBuilder {
        VaultClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Log in through `auth/<mount>/login` with the kubernetes method payload.
    /// A mount already ending in `/login` is used as the full login path.
    pub async fn login(&self, mount: &str, jwt: &str, role: &str) -> Result<Lease, VaultError> {
        let url = format!("{}/v1/auth/{}", self.base_url, login_path(mount));

        let request = self.http.post(&url).json(&LoginRequest { jwt, role });
        self.send_auth(request).await
    }

    /// Extend the lease of `token`. `increment` is a hint, Vault caps it at the max TTL.
    pub async fn renew_self(&self, token: &str, increment: Duration) -> Result<Lease, VaultError> {
        let url = format!("{}/v1/auth/token/renew-self", self.base_url);

        let request = self
            .http
            .post(&url)
            .header(TOKEN_HEADER, token)
            .json(&RenewSelfRequest {
                increment: increment.as_secs(),
            });
        self.send_auth(request).await
    }

    async fn send_auth(&self, request: reqwest::RequestBuilder) -> Result<Lease, VaultError> {
        let response = request
            .send()
            .await
            .map_err(|e| VaultError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| VaultError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(VaultError::RemoteRejected {
                status: status.as_u16(),
                errors: parse_errors(&body),
            });
        }

        let resp: AuthResponse = serde_json::from_slice(&body)
            .map_err(|e| VaultError::MalformedResponse(format!("Invalid response: {}", e)))?;

        resp.auth
            .map(Lease::from)
            .ok_or_else(|| VaultError::MalformedResponse("Response has no auth block".to_string()))
    }
}

fn login_path(mount: &str) -> String {
    let mount = mount.trim_matches('/');
    if mount.ends_with("/login") {
        mount.to_string()
    } else {
        format!("{}/login", mount)
    }
}

fn parse_errors(body: &[u8]) -> Vec<String> {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(resp) if !resp.errors.is_empty() => resp.errors,
        _ => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                Vec::new()
            } else {
                vec![text]
            }
        }
    }
}
