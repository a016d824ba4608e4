//! Persistence of the current Vault token for sibling consumers.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use vault_client::Lease;

use crate::error::RenewerError;

pub const TOKEN_FILE_NAME: &str = ".vault-token";

#[cfg(unix)]
const TOKEN_FILE_MODE: u32 = 0o600;

/// Destination of a freshly issued token
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn persist(&self, lease: &Lease) -> Result<(), RenewerError>;
}

enum Location {
    Home,
    Path(PathBuf),
}

/// Token file readable and writable by the owner only
pub struct TokenFile {
    location: Location,
}

impl TokenFile {
    /// `$HOME/.vault-token`, resolved on each write
    pub fn in_home() -> Self {
        Self {
            location: Location::Home,
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::Path(path.into()),
        }
    }

    pub fn path(&self) -> Result<PathBuf, RenewerError> {
        match &self.location {
            Location::Home => directories::BaseDirs::new()
                .map(|dirs| dirs.home_dir().join(TOKEN_FILE_NAME))
                .ok_or(RenewerError::HomeDirUnavailable),
            Location::Path(path) => Ok(path.clone()),
        }
    }

    async fn write(path: &Path, token: &str) -> std::io::Result<()> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(TOKEN_FILE_MODE);

        let mut file = options.open(path).await?;
        // mode() only applies on creation
        #[cfg(unix)]
        file.set_permissions(owner_only()).await?;
        file.write_all(token.as_bytes()).await?;
        file.flush().await
    }
}

#[cfg(unix)]
fn owner_only() -> std::fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    std::fs::Permissions::from_mode(TOKEN_FILE_MODE)
}

#[async_trait]
impl TokenStore for TokenFile {
    async fn persist(&self, lease: &Lease) -> Result<(), RenewerError> {
        let path = self.path()?;
        Self::write(&path, &lease.client_token)
            .await
            .map_err(|source| RenewerError::PersistenceFailure {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "Token file written");
        Ok(())
    }
}
