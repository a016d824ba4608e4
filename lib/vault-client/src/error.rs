use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Vault not detected: VAULT_ADDR not set")]
    VaultNotDetected,

    #[error("Identity assertion unavailable at {}: {source}", path.display())]
    IdentityUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Vault request error: {0}")]
    Transport(String),

    #[error("Vault rejected request ({status}): {}", errors.join("; "))]
    RemoteRejected { status: u16, errors: Vec<String> },

    #[error("Malformed Vault response: {0}")]
    MalformedResponse(String),

    #[error("Lease is not renewable")]
    NotRenewable,

    #[error("Lease renewal failed: {0}")]
    RenewalFailure(#[source] Box<VaultError>),

    #[error("Lease watcher exited unexpectedly")]
    WatcherExited,
}

impl VaultError {
    pub(crate) fn renewal(reason: VaultError) -> Self {
        Self::RenewalFailure(Box::new(reason))
    }
}
