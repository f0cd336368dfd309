use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Foreground state of the host application, as sampled by the poll timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

impl AppState {
    /// Anything but `Active` counts as the user having left.
    pub fn is_active(self) -> bool {
        self == AppState::Active
    }
}

#[derive(Debug, Error)]
#[error("unknown app state '{0}' (expected active, inactive or background)")]
pub struct ParseAppStateError(String);

impl FromStr for AppState {
    type Err = ParseAppStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AppState::Active),
            "inactive" => Ok(AppState::Inactive),
            "background" => Ok(AppState::Background),
            other => Err(ParseAppStateError(other.to_string())),
        }
    }
}

/// Discrete lifecycle signals pushed by the host, in delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    WillEnterForeground,
    DidEnterBackground,
    ProximityChanged,
}

/// What the tracker needs from the device it runs on.
///
/// Implementations are called from timer tasks on arbitrary runtime threads.
/// `set_idle_lock_disabled` runs while the tracker holds its state lock and
/// must not call back into the tracker.
pub trait PlatformHost: Send + Sync {
    fn current_app_state(&self) -> AppState;
    /// `true` disables the automatic display sleep / idle lock.
    fn set_idle_lock_disabled(&self, disabled: bool);
}
