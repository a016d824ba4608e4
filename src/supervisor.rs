//! Outer control loop keeping one Vault token alive.
//!
//! Each round logs in, persists the token, then hands the lease to a
//! [`LifetimeWatcher`] until it reaches a terminal state. A graceful end
//! starts the next round right away; any failure waits [`RETRY_BACKOFF`]
//! (or the configured interval) first. Only the shutdown signal ends the
//! loop, and it is honoured at every await point.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use vault_client::{
    AuthMethod, KubernetesAuth, Lease, LifetimeWatcher, TokenRenewer, VaultClient, WatchEvent,
    WatcherConfig,
};

use crate::error::RenewerError;
use crate::observer::{RenewalObserver, TracingObserver};
use crate::settings::RenewerSettings;
use crate::shutdown::Shutdown;
use crate::token_file::{TokenFile, TokenStore};

/// Pause after a failed round, whatever the failure was
pub const RETRY_BACKOFF: Duration = Duration::from_secs(30);

/// How a single round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Round {
    /// Lease tracking ended gracefully, log in again now
    Restart,
    /// Something failed, back off before the next round
    Failed,
    Cancelled,
}

pub struct RenewalSupervisor {
    auth: Arc<dyn AuthMethod>,
    store: Arc<dyn TokenStore>,
    renewer: Arc<dyn TokenRenewer>,
    observer: Arc<dyn RenewalObserver>,
    retry_backoff: Duration,
    watcher_config: WatcherConfig,
}

impl RenewalSupervisor {
    pub fn builder(
        auth: Arc<dyn AuthMethod>,
        store: Arc<dyn TokenStore>,
        renewer: Arc<dyn TokenRenewer>,
    ) -> RenewalSupervisorBuilder {
        RenewalSupervisorBuilder {
            auth,
            store,
            renewer,
            observer: Arc::new(TracingObserver),
            retry_backoff: RETRY_BACKOFF,
            watcher_config: WatcherConfig::default(),
        }
    }

    /// Wires the Vault client, kubernetes login and token file from settings.
    pub fn from_settings(settings: &RenewerSettings) -> Result<Self, RenewerError> {
        let mut client = VaultClient::builder()
            .base_url(&settings.vault_addr)
            .timeout(settings.client_timeout);
        if let Some(ref app_name) = settings.application_name {
            client = client.application_name(app_name);
        }
        let client = client.build()?;

        let auth = KubernetesAuth::new(client.clone(), &settings.auth_method, &settings.role)
            .with_jwt_path(&settings.jwt_path);
        let store = match settings.token_file {
            Some(ref path) => TokenFile::at(path),
            None => TokenFile::in_home(),
        };

        Ok(Self::builder(Arc::new(auth), Arc::new(store), Arc::new(client))
            .retry_backoff(settings.retry_interval)
            .build())
    }

    /// Runs the loop on its own task.
    pub fn spawn(self, shutdown: Shutdown) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Returns only once `shutdown` fires.
    pub async fn run(&self, shutdown: Shutdown) {
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.round(&shutdown).await {
                Round::Cancelled => break,
                Round::Restart => continue,
                Round::Failed => {
                    self.observer.retry_scheduled(self.retry_backoff);
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.retry_backoff) => {}
                    }
                }
            }
        }
        tracing::debug!("vault renewal loop stopped");
    }

    async fn round(&self, shutdown: &Shutdown) -> Round {
        let lease = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Round::Cancelled,
            result = self.auth.authenticate() => match result {
                Ok(lease) => lease,
                Err(e) => {
                    self.observer.authentication_failed(&e);
                    return Round::Failed;
                }
            },
        };

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Round::Cancelled,
            result = self.store.persist(&lease) => {
                if let Err(e) = result {
                    self.observer.persistence_failed(&e);
                    return Round::Failed;
                }
            }
        }
        self.observer.token_persisted(&lease);

        self.watch(lease, shutdown).await
    }

    // The watcher is dropped, and its task aborted, on every return path.
    async fn watch(&self, lease: Lease, shutdown: &Shutdown) -> Round {
        let mut watcher =
            LifetimeWatcher::start(Arc::clone(&self.renewer), lease, self.watcher_config.clone());

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Round::Cancelled,
                event = watcher.next_event() => event,
            };

            match event {
                WatchEvent::Renewed(renewal) => self.observer.token_renewed(&renewal),
                WatchEvent::Done(Ok(())) => return Round::Restart,
                WatchEvent::Done(Err(e)) => {
                    self.observer.renewal_failed(&e);
                    return Round::Failed;
                }
            }
        }
    }
}

pub struct RenewalSupervisorBuilder {
    auth: Arc<dyn AuthMethod>,
    store: Arc<dyn TokenStore>,
    renewer: Arc<dyn TokenRenewer>,
    observer: Arc<dyn RenewalObserver>,
    retry_backoff: Duration,
    watcher_config: WatcherConfig,
}

impl RenewalSupervisorBuilder {
    pub fn observer(mut self, observer: Arc<dyn RenewalObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn watcher_config(mut self, config: WatcherConfig) -> Self {
        self.watcher_config = config;
        self
    }

    pub fn build(self) -> RenewalSupervisor {
        RenewalSupervisor {
            auth: self.auth,
            store: self.store,
            renewer: self.renewer,
            observer: self.observer,
            retry_backoff: self.retry_backoff,
            watcher_config: self.watcher_config,
        }
    }
}
