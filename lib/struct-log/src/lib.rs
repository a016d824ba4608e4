mod builder;
mod error;
mod formatting_layer;

pub use builder::StructLogBuilder;
pub use error::SetupError;
pub use formatting_layer::JsonLogLayer;
pub use tracing_appender::non_blocking::WorkerGuard;
