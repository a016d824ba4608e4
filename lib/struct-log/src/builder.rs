use std::env;
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_bunyan_formatter::JsonStorageLayer;
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::error::SetupError;
use crate::formatting_layer::JsonLogLayer;

const DEFAULT_FILTER: &str = "info";

/// Builder for configuring structured JSON logging
pub struct StructLogBuilder {
    application: String,
    version: String,
    hostname: Option<String>,
    json_enabled: bool,
    filter: Option<String>,
}

impl StructLogBuilder {
    /// Create a new builder with required application name and version
    pub fn new(application: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            version: version.into(),
            hostname: None,
            json_enabled: true,
            filter: None,
        }
    }

    /// Set a custom hostname (defaults to system hostname)
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Enable or disable JSON output (defaults to true)
    pub fn json_enabled(mut self, enabled: bool) -> Self {
        self.json_enabled = enabled;
        self
    }

    /// Read JSON_LOG env var to determine if JSON should be enabled
    pub fn json_from_env(mut self) -> Self {
        self.json_enabled = env::var("JSON_LOG").is_ok_and(|s| s.parse().unwrap_or_default());
        self
    }

    /// Filter directive, e.g. `info,vault_client=debug`. Falls back to RUST_LOG.
    pub fn filter(mut self, directive: impl Into<String>) -> Self {
        self.filter = Some(directive.into());
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, SetupError> {
        match &self.filter {
            Some(directive) => EnvFilter::try_new(directive)
                .map_err(|_| SetupError::InvalidFilter(directive.clone())),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
        }
    }

    /// Install the global subscriber. Keep the guard alive until exit when JSON is on.
    pub fn init(self) -> Result<Option<WorkerGuard>, SetupError> {
        let filter = self.env_filter()?;

        // Redirect the logs from log library (reqwest, hyper) to tracing's subscribers.
        LogTracer::init().map_err(|_| SetupError::LogTracerAlreadyInitialized)?;

        if !self.json_enabled {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .map_err(|_| SetupError::SubscriberAlreadySet)?;
            return Ok(None);
        }

        let (non_blocking, guard) = tracing_appender::non_blocking(io::stdout());

        let layer = match self.hostname {
            Some(hostname) => {
                JsonLogLayer::with_hostname(self.application, self.version, hostname, non_blocking)
            }
            None => JsonLogLayer::new(self.application, self.version, non_blocking),
        };

        let subscriber = Registry::default()
            .with(filter)
            .with(JsonStorageLayer)
            .with(layer);

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|_| SetupError::SubscriberAlreadySet)?;

        Ok(Some(guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_filter_is_validated() {
        let builder = StructLogBuilder::new("app", "1.0").filter("info,vault_client=debug");
        assert!(builder.env_filter().is_ok());

        let builder = StructLogBuilder::new("app", "1.0").filter("vault_client=loud");
        assert!(matches!(
            builder.env_filter(),
            Err(SetupError::InvalidFilter(_))
        ));
    }
}
