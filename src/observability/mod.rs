//! Observability and telemetry.

mod logging;

pub use logging::{init_logging, LoggingConfig, LOG_ENV_VAR};
