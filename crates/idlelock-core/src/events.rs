use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::platform::AppState;

/// Every state change of the tracker produces an Event.
/// The UI layer may subscribe to the full stream; timeout observers only
/// ever see [`Event::TimedOut`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TrackingStarted {
        session_id: Uuid,
        timeout_secs: u64,
        at: DateTime<Utc>,
    },
    TrackingStopped {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    /// The deadline timer was re-armed for the full timeout.
    DeadlineReset {
        session_id: Uuid,
        reason: ResetReason,
        at: DateTime<Utc>,
    },
    /// The app went to the background; the liveness poll is suspended
    /// while the deadline keeps running.
    PollingPaused {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    TimedOut(TimeoutEvent),
}

impl Event {
    pub fn session_id(&self) -> Uuid {
        match self {
            Event::TrackingStarted { session_id, .. }
            | Event::TrackingStopped { session_id, .. }
            | Event::DeadlineReset { session_id, .. }
            | Event::PollingPaused { session_id, .. } => *session_id,
            Event::TimedOut(timeout) => timeout.session_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    Foreground,
    Proximity,
    /// A poll tick found the app active.
    PollActive,
}

/// Payload delivered to timeout observers, once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutEvent {
    pub session_id: Uuid,
    pub cause: TimeoutCause,
    pub timeout_secs: u64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeoutCause {
    /// The full timeout elapsed without a reset.
    DeadlineElapsed,
    /// A poll tick caught the app inactive or backgrounded.
    AppNotActive { app_state: AppState },
}
