//! Structured logging bootstrap.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Environment variable controlling the log filter.
pub const LOG_ENV_VAR: &str = "KINSHIP_LOG";

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Logging configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingConfig {
    /// Lowers the default level from `info` to `debug`.
    pub verbose: bool,
}

impl LoggingConfig {
    /// Creates a config with the default level.
    #[must_use]
    pub const fn new() -> Self {
        Self { verbose: false }
    }

    /// Sets verbose output.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn default_filter(self) -> String {
        if self.verbose {
            "kinship=debug".to_string()
        } else {
            "kinship=info".to_string()
        }
    }
}

/// Initializes the global tracing subscriber.
///
/// Output goes to stderr so progress rendering on stdout stays clean.
/// `KINSHIP_LOG` overrides the default filter. Safe to call more than
/// once; only the first call takes effect.
pub fn init_logging(config: LoggingConfig) {
    LOGGING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(config.default_filter()));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        assert_eq!(LoggingConfig::new().default_filter(), "kinship=info");
        assert_eq!(
            LoggingConfig::new().with_verbose(true).default_filter(),
            "kinship=debug"
        );
    }

    #[test]
    fn test_init_is_idempotent() {
        init_logging(LoggingConfig::new());
        init_logging(LoggingConfig::new().with_verbose(true));
    }
}
