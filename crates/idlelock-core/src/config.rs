//! TOML-based tracker configuration.
//!
//! Configuration is read from `~/.config/idlelock/config.toml` when present.
//! It is never written back: the last duration passed to `start_tracking`
//! lives in memory only.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::tracker::policy;

/// Tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Timeout used until a caller supplies an explicit duration.
    /// Clamped into the valid range on use.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Capacity of the broadcast channel behind `TimeoutTracker::subscribe`.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Whether a poll tick that finds the app active re-arms the deadline.
    #[serde(default = "default_true")]
    pub poll_resets_deadline: bool,
}

fn default_timeout_secs() -> u64 {
    policy::DEFAULT_TIMEOUT.as_secs()
}
fn default_event_buffer() -> usize {
    64
}
fn default_true() -> bool {
    true
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            event_buffer: default_event_buffer(),
            poll_resets_deadline: true,
        }
    }
}

impl TrackerConfig {
    /// Returns `~/.config/idlelock/config.toml`.
    pub fn path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("idlelock")
            .join("config.toml")
    }

    /// Load from the default location, or return defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: TrackerConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    ///
    /// Returns an error if `event_buffer` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "event_buffer".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// The configured default timeout, clamped into the valid range.
    pub fn default_timeout(&self) -> Duration {
        policy::clamp(Duration::from_secs(self.default_timeout_secs))
    }
}
