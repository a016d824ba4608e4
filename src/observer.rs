//! Log sink handed to the supervisor.

use std::time::Duration;

use vault_client::{Lease, RenewOutput, VaultError};

use crate::error::RenewerError;

/// Lifecycle events emitted by [`RenewalSupervisor`](crate::RenewalSupervisor).
pub trait RenewalObserver: Send + Sync {
    fn authentication_failed(&self, error: &VaultError);

    fn persistence_failed(&self, error: &RenewerError);

    fn token_persisted(&self, lease: &Lease);

    fn token_renewed(&self, renewal: &RenewOutput);

    fn renewal_failed(&self, error: &VaultError);

    fn retry_scheduled(&self, _delay: Duration) {}
}

/// Writes the events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RenewalObserver for TracingObserver {
    fn authentication_failed(&self, error: &VaultError) {
        tracing::error!(error = %error, "could not authenticate with vault");
    }

    fn persistence_failed(&self, error: &RenewerError) {
        tracing::error!(error = %error, "could not write auth token");
    }

    fn token_persisted(&self, lease: &Lease) {
        tracing::info!(
            ttl_secs = lease.lease_duration.as_secs(),
            renewable = lease.renewable,
            accessor = lease.accessor.as_deref().unwrap_or_default(),
            "vault token updated"
        );
    }

    fn token_renewed(&self, renewal: &RenewOutput) {
        tracing::info!(
            ttl_secs = renewal.lease.lease_duration.as_secs(),
            renewed_at = %renewal.renewed_at,
            "vault token renewed"
        );
    }

    fn renewal_failed(&self, error: &VaultError) {
        tracing::error!(error = %error, "could not renew vault token");
    }

    fn retry_scheduled(&self, delay: Duration) {
        tracing::debug!(delay_secs = delay.as_secs(), "next vault login attempt scheduled");
    }
}
