mod kubernetes;

pub use kubernetes::{KubernetesAuth, DEFAULT_JWT_PATH};

use crate::{Lease, VaultError};
use async_trait::async_trait;

/// Trait for authentication methods
#[async_trait]
pub trait AuthMethod: Send + Sync {
    /// Perform one login attempt. Retrying is up to the caller.
    async fn authenticate(&self) -> Result<Lease, VaultError>;
}
