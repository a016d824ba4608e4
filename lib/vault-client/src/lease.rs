use crate::models::AuthData;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Token lease obtained from an auth endpoint
#[derive(Clone)]
pub struct Lease {
    pub client_token: String,
    pub accessor: Option<String>,
    pub policies: Vec<String>,
    pub lease_duration: Duration,
    pub renewable: bool,
    obtained_at: Instant,
}

impl Lease {
    pub fn new(client_token: String, lease_duration: Duration, renewable: bool) -> Self {
        Self {
            client_token,
            accessor: None,
            policies: Vec::new(),
            lease_duration,
            renewable,
            obtained_at: Instant::now(),
        }
    }

    /// Time left before the lease runs out, measured on the tokio clock
    pub fn remaining(&self) -> Duration {
        self.lease_duration.saturating_sub(self.obtained_at.elapsed())
    }
}

impl From<AuthData> for Lease {
    fn from(auth: AuthData) -> Self {
        Self {
            client_token: auth.client_token,
            accessor: auth.accessor,
            policies: auth.policies,
            lease_duration: Duration::from_secs(auth.lease_duration),
            renewable: auth.renewable,
            obtained_at: Instant::now(),
        }
    }
}

// Keeps the token out of logs.
impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("client_token", &"<redacted>")
            .field("accessor", &self.accessor)
            .field("policies", &self.policies)
            .field("lease_duration", &self.lease_duration)
            .field("renewable", &self.renewable)
            .finish()
    }
}
