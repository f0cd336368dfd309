//! # idlelock Core Library
//!
//! Tracks user inactivity and fires a single notification when a configured
//! idle duration elapses, staying correct across foreground, background and
//! proximity transitions.
//!
//! ## Architecture
//!
//! - **Session engine**: a pure state machine that turns commands, timer
//!   fires and lifecycle signals into effects
//! - **Tracker runtime**: owns the deadline and liveness-poll timers on a
//!   tokio runtime, serialized behind a single lock
//! - **Observers**: weakly held callbacks notified once per timeout
//! - **Platform**: the host interface for app state and the idle display lock
//!
//! ## Key Components
//!
//! - [`TimeoutTracker`]: start/stop tracking, feed lifecycle signals
//! - [`SessionEngine`]: the underlying state machine
//! - [`TrackerConfig`]: TOML configuration
//! - [`PlatformHost`]: trait implemented by the embedding application

pub mod config;
pub mod error;
pub mod events;
pub mod platform;
pub mod tracker;

pub use config::TrackerConfig;
pub use error::{ConfigError, CoreError};
pub use events::{Event, ResetReason, TimeoutCause, TimeoutEvent};
pub use platform::{AppState, LifecycleEvent, ManualHost, PlatformHost};
pub use tracker::{
    policy, ObserverId, ObserverRegistry, SessionEngine, TimeoutObserver, TimeoutTracker,
    TrackerSnapshot, TrackingState,
};
