#![warn(rust_2018_idioms)]

use struct_log::StructLogBuilder;
use vault_token_renewer::{shutdown, RenewalSupervisor, RenewerError, RenewerSettings};

#[tokio::main]
async fn main() -> Result<(), RenewerError> {
    let _guard = StructLogBuilder::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        .json_from_env()
        .init()?;

    let settings = RenewerSettings::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "unable to start vault authenticator");
    })?;

    tracing::info!(
        vault_addr = %settings.vault_addr,
        auth_method = %settings.auth_method,
        role = %settings.role,
        jwt_path = %settings.jwt_path.display(),
        "starting vault authenticator"
    );

    let supervisor = RenewalSupervisor::from_settings(&settings)?;
    let (trigger, shutdown) = shutdown::channel();
    let handle = supervisor.spawn(shutdown);

    let signal = shutdown::wait_for_signal().await;
    trigger.cancel();
    if let Err(e) = handle.await {
        tracing::error!(error = %e, "vault renewal task failed");
    }

    signal.map_err(RenewerError::Signal)
}
