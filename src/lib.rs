mod error;
mod observer;
mod settings;
pub mod shutdown;
mod supervisor;
mod token_file;

pub use error::RenewerError;
pub use observer::{RenewalObserver, TracingObserver};
pub use settings::{RenewerSettings, RenewerSettingsBuilder};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use supervisor::{RenewalSupervisor, RenewalSupervisorBuilder, RETRY_BACKOFF};
pub use token_file::{TokenFile, TokenStore, TOKEN_FILE_NAME};
