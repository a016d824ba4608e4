use std::path::PathBuf;

use thiserror::Error;
use vault_client::VaultError;

#[derive(Debug, Error)]
pub enum RenewerError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("Home directory could not be resolved")]
    HomeDirUnavailable,

    #[error("Failed to write token file {}: {source}", path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Logger setup failed: {0}")]
    Logging(#[from] struct_log::SetupError),

    #[error("Signal handler failed: {0}")]
    Signal(#[source] std::io::Error),
}
