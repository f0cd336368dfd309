pub mod clamp;
pub mod config;
pub mod watch;

use std::path::Path;

use idlelock_core::TrackerConfig;

/// Load `path` if given, otherwise the default location.
pub fn load_config(path: Option<&Path>) -> Result<TrackerConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => TrackerConfig::load_from(path)?,
        None => TrackerConfig::load()?,
    };
    Ok(config)
}
