//! Configuration management.

use crate::sync::resolver::DEFAULT_DECISION_TIMEOUT;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Avatars smaller than this are treated as placeholders and excluded from
/// exports.
pub const DEFAULT_MIN_AVATAR_BYTES: u64 = 1024;

/// Main configuration for kinship.
#[derive(Debug, Clone)]
pub struct KinshipConfig {
    /// Data directory holding the store manifest and person directories.
    pub data_dir: PathBuf,
    /// Directory for per-run staging trees.
    pub staging_dir: PathBuf,
    /// Liveness timeout for an unanswered conflict decision.
    pub decision_timeout: Duration,
    /// Minimum avatar size included in exports.
    pub min_avatar_bytes: u64,
}

impl Default for KinshipConfig {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("", "", "kinship")
            .map_or_else(|| PathBuf::from(".kinship"), |dirs| dirs.data_dir().to_path_buf());

        Self {
            data_dir,
            staging_dir: std::env::temp_dir().join("kinship"),
            decision_timeout: DEFAULT_DECISION_TIMEOUT,
            min_avatar_bytes: DEFAULT_MIN_AVATAR_BYTES,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Staging directory.
    pub staging_dir: Option<String>,
    /// Decision timeout in seconds.
    pub decision_timeout_secs: Option<u64>,
    /// Minimum avatar size in bytes.
    pub min_avatar_bytes: Option<u64>,
}

impl KinshipConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::op("read_config_file", e))?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::op("parse_config_file", e))?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/kinship/` on macOS)
    /// 2. XDG config dir (`~/.config/kinship/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("kinship").join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("kinship")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `KinshipConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(staging_dir) = file.staging_dir {
            config.staging_dir = PathBuf::from(staging_dir);
        }
        if let Some(secs) = file.decision_timeout_secs {
            config.decision_timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = file.min_avatar_bytes {
            config.min_avatar_bytes = bytes;
        }

        config
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the staging directory.
    #[must_use]
    pub fn with_staging_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_dir = path.into();
        self
    }

    /// Sets the decision timeout.
    #[must_use]
    pub const fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = timeout;
        self
    }
}
