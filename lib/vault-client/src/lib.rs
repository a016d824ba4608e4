//! vault-client - Rust client for HashiCorp Vault
//!
//! Covers the pieces needed to keep a Kubernetes workload logged in:
//! 1. `KubernetesAuth` → exchanges the service account JWT for a token
//! 2. `VaultClient::renew_self` → extends the token lease
//! 3. `LifetimeWatcher` → renews in the background until the lease ends

mod auth;
mod client;
mod error;
mod lease;
mod models;
mod watcher;

pub use auth::{AuthMethod, KubernetesAuth, DEFAULT_JWT_PATH};
pub use client::{VaultClient, VaultClientBuilder};
pub use error::VaultError;
pub use lease::Lease;
pub use watcher::{LifetimeWatcher, RenewOutput, TokenRenewer, WatchEvent, WatcherConfig};
