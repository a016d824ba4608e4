//! Background renewal of a single token lease.
//!
//! A [`LifetimeWatcher`] owns one spawned task per lease. The task renews the
//! token right away, then again at roughly two thirds of each returned TTL,
//! and reports every renewal plus exactly one terminal [`WatchEvent::Done`].
//! A failed renewal is retried while the last good lease still has time left
//! outside the grace window. Dropping the watcher aborts the task.

use crate::{Lease, VaultClient, VaultError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const RENEW_FRACTION: f64 = 2.0 / 3.0;
const GRACE_JITTER_FRACTION: f64 = 0.1;
/// Upper bound on the wait between retries after a failed renewal
const MAX_ERROR_RETRY: Duration = Duration::from_secs(30);

/// Anything able to extend a token lease
#[async_trait]
pub trait TokenRenewer: Send + Sync {
    async fn renew_self(&self, token: &str, increment: Duration) -> Result<Lease, VaultError>;
}

#[async_trait]
impl TokenRenewer for VaultClient {
    async fn renew_self(&self, token: &str, increment: Duration) -> Result<Lease, VaultError> {
        VaultClient::renew_self(self, token, increment).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct WatcherConfig {
    /// Increment requested on each renewal, defaults to the initial lease duration
    pub increment: Option<Duration>,
    /// Fixed grace window, defaults to a random 10-20% of the lease duration
    pub grace: Option<Duration>,
}

impl WatcherConfig {
    fn grace_for(&self, lease_duration: Duration) -> Duration {
        if let Some(grace) = self.grace {
            return grace;
        }
        let jitter_max = lease_duration.mul_f64(GRACE_JITTER_FRACTION);
        if jitter_max.is_zero() {
            return Duration::ZERO;
        }
        let jitter = rand::rng().random_range(Duration::ZERO..jitter_max);
        jitter_max + jitter
    }
}

/// Successful renewal
#[derive(Debug, Clone)]
pub struct RenewOutput {
    pub renewed_at: DateTime<Utc>,
    pub lease: Lease,
}

#[derive(Debug)]
pub enum WatchEvent {
    Renewed(RenewOutput),
    /// Terminal. `Ok(())` means the lease ran its course or the watcher was stopped.
    Done(Result<(), VaultError>),
}

pub struct LifetimeWatcher {
    events: mpsc::UnboundedReceiver<WatchEvent>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    finished: bool,
}

impl LifetimeWatcher {
    /// Spawn the renewal task for `lease`. Must be called inside a tokio runtime.
    pub fn start<R>(renewer: Arc<R>, lease: Lease, config: WatcherConfig) -> Self
    where
        R: TokenRenewer + ?Sized + 'static,
    {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = stop_rx => Ok(()),
                result = renew_loop(renewer.as_ref(), &lease, &config, &events_tx) => result,
            };
            let _ = events_tx.send(WatchEvent::Done(result));
        });

        Self {
            events,
            stop: Some(stop_tx),
            task,
            finished: false,
        }
    }

    /// Next renewal or the terminal event. Keeps returning `Done(Ok(()))` once terminated.
    pub async fn next_event(&mut self) -> WatchEvent {
        if self.finished {
            return WatchEvent::Done(Ok(()));
        }
        let event = self
            .events
            .recv()
            .await
            .unwrap_or(WatchEvent::Done(Err(VaultError::WatcherExited)));
        if matches!(event, WatchEvent::Done(_)) {
            self.finished = true;
        }
        event
    }

    /// Ask the task to finish; it reports `Done(Ok(()))`.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for LifetimeWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn renew_loop<R>(
    renewer: &R,
    lease: &Lease,
    config: &WatcherConfig,
    events: &mpsc::UnboundedSender<WatchEvent>,
) -> Result<(), VaultError>
where
    R: TokenRenewer + ?Sized,
{
    if !lease.renewable {
        return Err(VaultError::renewal(VaultError::NotRenewable));
    }

    let increment = config.increment.unwrap_or(lease.lease_duration);
    let mut grace = config.grace_for(lease.lease_duration);
    let mut prior = Duration::ZERO;
    let mut last_good = lease.clone();

    loop {
        let sleep = match renewer.renew_self(&lease.client_token, increment).await {
            Ok(renewed) => {
                let remaining = renewed.lease_duration;
                let renewable = renewed.renewable;
                tracing::debug!(ttl_secs = remaining.as_secs(), "Token renewed successfully");
                last_good = renewed.clone();
                let _ = events.send(WatchEvent::Renewed(RenewOutput {
                    renewed_at: Utc::now(),
                    lease: renewed,
                }));

                if !renewable {
                    return Err(VaultError::renewal(VaultError::NotRenewable));
                }

                // Grace only moves while the lease keeps growing; once Vault starts
                // capping at the max TTL the last window is kept.
                if remaining > prior {
                    grace = config.grace_for(remaining);
                }
                prior = remaining;

                let sleep = next_renewal(remaining, grace);
                if remaining <= grace || remaining.saturating_sub(sleep) <= grace {
                    tracing::debug!(
                        ttl_secs = remaining.as_secs(),
                        "Lease reached its final renewal window"
                    );
                    return Ok(());
                }
                sleep
            }
            Err(VaultError::NotRenewable) => {
                return Err(VaultError::renewal(VaultError::NotRenewable));
            }
            Err(e) => {
                // The last good lease is still valid, keep retrying until it is
                // within grace of running out.
                let remaining = last_good.remaining();
                let sleep = next_renewal(remaining, grace).min(MAX_ERROR_RETRY);
                if remaining <= grace || remaining.saturating_sub(sleep) <= grace {
                    return Err(VaultError::renewal(e));
                }
                tracing::warn!(
                    error = %e,
                    ttl_secs = remaining.as_secs(),
                    retry_in_secs = sleep.as_secs(),
                    "Token renewal failed, will retry"
                );
                sleep
            }
        };

        tokio::time::sleep(sleep).await;
    }
}

fn next_renewal(remaining: Duration, grace: Duration) -> Duration {
    remaining.mul_f64(RENEW_FRACTION) + grace / 3
}
