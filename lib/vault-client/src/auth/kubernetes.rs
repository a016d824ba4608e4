use super::AuthMethod;
use crate::{Lease, VaultClient, VaultError};
use async_trait::async_trait;
use std::path::PathBuf;

pub const DEFAULT_JWT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Kubernetes authentication
pub struct KubernetesAuth {
    client: VaultClient,
    auth_method: String,
    role: String,
    jwt_path: PathBuf,
}

impl KubernetesAuth {
    pub fn new(
        client: VaultClient,
        auth_method: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth_method: auth_method.into(),
            role: role.into(),
            jwt_path: PathBuf::from(DEFAULT_JWT_PATH),
        }
    }

    pub fn with_jwt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.jwt_path = path.into();
        self
    }

    // Re-read on every attempt, the kubelet rotates projected tokens.
    fn read_jwt(&self) -> Result<String, VaultError> {
        std::fs::read_to_string(&self.jwt_path)
            .map(|s| s.trim().to_string())
            .map_err(|source| VaultError::IdentityUnavailable {
                path: self.jwt_path.clone(),
                source,
            })
    }
}

#[async_trait]
impl AuthMethod for KubernetesAuth {
    async fn authenticate(&self) -> Result<Lease, VaultError> {
        let jwt = self.read_jwt()?;

        tracing::debug!(
            auth_method = %self.auth_method,
            role = %self.role,
            "Logging in to Vault"
        );
        self.client.login(&self.auth_method, &jwt, &self.role).await
    }
}
