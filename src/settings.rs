use std::path::PathBuf;
use std::time::Duration;

use vault_client::DEFAULT_JWT_PATH;

use crate::error::RenewerError;
use crate::supervisor::RETRY_BACKOFF;

const DEFAULT_AUTH_METHOD: &str = "kubernetes";
const DEFAULT_ROLE: &str = "app";
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Resolved configuration, fixed for the lifetime of the process
#[derive(Debug, Clone)]
pub struct RenewerSettings {
    pub vault_addr: String,
    pub auth_method: String,
    pub role: String,
    pub jwt_path: PathBuf,
    /// `None` means `$HOME/.vault-token`
    pub token_file: Option<PathBuf>,
    pub retry_interval: Duration,
    pub client_timeout: Duration,
    pub application_name: Option<String>,
}

impl RenewerSettings {
    pub fn builder() -> RenewerSettingsBuilder {
        RenewerSettingsBuilder::default()
    }

    pub fn from_env() -> Result<Self, RenewerError> {
        RenewerSettingsBuilder::default().build()
    }
}

#[derive(Default)]
pub struct RenewerSettingsBuilder {
    vault_addr: Option<String>,
    auth_method: Option<String>,
    role: Option<String>,
    jwt_path: Option<PathBuf>,
    token_file: Option<PathBuf>,
    retry_interval: Option<Duration>,
    client_timeout: Option<Duration>,
    application_name: Option<String>,
}

impl RenewerSettingsBuilder {
    pub fn vault_addr(mut self, addr: impl Into<String>) -> Self {
        self.vault_addr = Some(addr.into());
        self
    }

    pub fn auth_method(mut self, method: impl Into<String>) -> Self {
        self.auth_method = Some(method.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn jwt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.jwt_path = Some(path.into());
        self
    }

    pub fn token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    pub fn client_timeout(mut self, timeout: Duration) -> Self {
        self.client_timeout = Some(timeout);
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<RenewerSettings, RenewerError> {
        self.resolve(|key| std::env::var(key).ok())
    }

    fn resolve(
        self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<RenewerSettings, RenewerError> {
        let vault_addr = self
            .vault_addr
            .or_else(|| env("VAULT_ADDR"))
            .filter(|addr| !addr.is_empty())
            .ok_or_else(|| RenewerError::Config("VAULT_ADDR is not set".to_string()))?;

        let auth_method = self
            .auth_method
            .or_else(|| env("VAULT_AUTH_METHOD"))
            .unwrap_or_else(|| DEFAULT_AUTH_METHOD.to_string());

        let role = self
            .role
            .or_else(|| env("VAULT_ROLE_ID"))
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());

        let jwt_path = self
            .jwt_path
            .or_else(|| env("K8S_JWT_TOKEN_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JWT_PATH));

        let token_file = self
            .token_file
            .or_else(|| env("VAULT_TOKEN_FILE").map(PathBuf::from));

        let retry_interval = match self.retry_interval {
            Some(interval) => interval,
            None => seconds(&env, "VAULT_RETRY_INTERVAL")?.unwrap_or(RETRY_BACKOFF),
        };

        let client_timeout = match self.client_timeout {
            Some(timeout) => timeout,
            None => seconds(&env, "VAULT_CLIENT_TIMEOUT")?.unwrap_or(DEFAULT_CLIENT_TIMEOUT),
        };

        if auth_method.trim_matches('/').is_empty() {
            return Err(RenewerError::Config("auth method must not be empty".to_string()));
        }
        if role.is_empty() {
            return Err(RenewerError::Config("role must not be empty".to_string()));
        }

        Ok(RenewerSettings {
            vault_addr,
            auth_method,
            role,
            jwt_path,
            token_file,
            retry_interval,
            client_timeout,
            application_name: self.application_name,
        })
    }
}

fn seconds(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<Duration>, RenewerError> {
    env(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| {
                    RenewerError::Config(format!(
                        "{} must be a number of seconds, got {:?}",
                        key, raw
                    ))
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = RenewerSettings::builder()
            .resolve(env_from(&[("VAULT_ADDR", "http://vault:8200")]))
            .unwrap();

        assert_eq!(settings.vault_addr, "http://vault:8200");
        assert_eq!(settings.auth_method, "kubernetes");
        assert_eq!(settings.role, "app");
        assert_eq!(settings.jwt_path, PathBuf::from(DEFAULT_JWT_PATH));
        assert!(settings.token_file.is_none());
        assert_eq!(settings.retry_interval, Duration::from_secs(30));
        assert_eq!(settings.client_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_env_values() {
        let settings = RenewerSettings::builder()
            .resolve(env_from(&[
                ("VAULT_ADDR", "https://vault.internal"),
                ("VAULT_AUTH_METHOD", "k8s-prod"),
                ("VAULT_ROLE_ID", "sops-operator"),
                ("K8S_JWT_TOKEN_PATH", "/tmp/token"),
                ("VAULT_TOKEN_FILE", "/run/vault/token"),
                ("VAULT_RETRY_INTERVAL", "5"),
                ("VAULT_CLIENT_TIMEOUT", " 10 "),
            ]))
            .unwrap();

        assert_eq!(settings.auth_method, "k8s-prod");
        assert_eq!(settings.role, "sops-operator");
        assert_eq!(settings.jwt_path, PathBuf::from("/tmp/token"));
        assert_eq!(settings.token_file, Some(PathBuf::from("/run/vault/token")));
        assert_eq!(settings.retry_interval, Duration::from_secs(5));
        assert_eq!(settings.client_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_overrides_env() {
        let settings = RenewerSettings::builder()
            .vault_addr("http://explicit:8200")
            .role("admin")
            .retry_interval(Duration::from_secs(1))
            .resolve(env_from(&[
                ("VAULT_ADDR", "http://env:8200"),
                ("VAULT_ROLE_ID", "env-role"),
                ("VAULT_RETRY_INTERVAL", "not-a-number"),
            ]))
            .unwrap();

        assert_eq!(settings.vault_addr, "http://explicit:8200");
        assert_eq!(settings.role, "admin");
        assert_eq!(settings.retry_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_missing_address() {
        let result = RenewerSettings::builder().resolve(env_from(&[]));
        assert!(matches!(result, Err(RenewerError::Config(_))));
    }

    #[test]
    fn test_invalid_interval() {
        let result = RenewerSettings::builder().resolve(env_from(&[
            ("VAULT_ADDR", "http://vault:8200"),
            ("VAULT_RETRY_INTERVAL", "30s"),
        ]));
        match result {
            Err(RenewerError::Config(message)) => assert!(message.contains("VAULT_RETRY_INTERVAL")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_role_rejected() {
        let result = RenewerSettings::builder()
            .role("")
            .resolve(env_from(&[("VAULT_ADDR", "http://vault:8200")]));
        assert!(matches!(result, Err(RenewerError::Config(_))));
    }
}
