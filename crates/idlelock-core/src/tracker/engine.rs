//! Session state machine.
//!
//! The engine is pure: it owns no timers and spawns nothing. Each input
//! returns the [`Effect`]s the caller must apply, in order. The runtime in
//! `runtime.rs` owns the real timers and feeds their fires back in.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Tracking --(stop | deadline | poll: not active)--> Idle
//! ```
//!
//! Every timer arm carries a fresh epoch. A fire whose epoch is not the
//! currently armed one is stale and ignored, so a timer that was cancelled
//! or re-armed can never act on the session, even if its task already ran.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::policy;
use crate::config::TrackerConfig;
use crate::events::{Event, ResetReason, TimeoutCause, TimeoutEvent};
use crate::platform::{AppState, LifecycleEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    Idle,
    Tracking,
}

/// Side effects requested by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Arm the single-shot deadline timer, replacing any armed one.
    ArmDeadline { epoch: u64, after: Duration },
    /// Arm the repeating poll timer, replacing any armed one.
    ArmPoll { epoch: u64, every: Duration },
    CancelDeadline,
    CancelPoll,
    /// `true` disables the device idle lock for the session.
    SuppressIdleLock(bool),
    Emit(Event),
}

#[derive(Debug, Clone)]
pub struct SessionEngine {
    state: TrackingState,
    /// Last clamped timeout; survives stop/start.
    timeout: Duration,
    session_id: Uuid,
    deadline_epoch: Option<u64>,
    poll_epoch: Option<u64>,
    next_epoch: u64,
    idle_lock_suppressed: bool,
    poll_resets_deadline: bool,
}

impl SessionEngine {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            state: TrackingState::Idle,
            timeout: config.default_timeout(),
            session_id: Uuid::nil(),
            deadline_epoch: None,
            poll_epoch: None,
            next_epoch: 0,
            idle_lock_suppressed: false,
            poll_resets_deadline: config.poll_resets_deadline,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == TrackingState::Tracking
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        policy::poll_interval(self.timeout)
    }

    /// Id of the running session, if any.
    pub fn session_id(&self) -> Option<Uuid> {
        self.is_tracking().then_some(self.session_id)
    }

    pub fn deadline_epoch(&self) -> Option<u64> {
        self.deadline_epoch
    }

    pub fn poll_epoch(&self) -> Option<u64> {
        self.poll_epoch
    }

    /// False while tracking only when polling was paused by backgrounding.
    pub fn is_polling(&self) -> bool {
        self.poll_epoch.is_some()
    }

    pub fn idle_lock_suppressed(&self) -> bool {
        self.idle_lock_suppressed
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session. A no-op while already tracking; `requested` is then
    /// ignored as well. Without `requested` the last timeout is reused.
    pub fn start(&mut self, requested: Option<Duration>) -> Vec<Effect> {
        if self.is_tracking() {
            return Vec::new();
        }
        if let Some(requested) = requested {
            self.timeout = policy::clamp(requested);
        }
        self.state = TrackingState::Tracking;
        self.session_id = Uuid::new_v4();
        self.idle_lock_suppressed = true;

        vec![
            self.arm_deadline(),
            self.arm_poll(),
            Effect::SuppressIdleLock(true),
            Effect::Emit(Event::TrackingStarted {
                session_id: self.session_id,
                timeout_secs: self.timeout.as_secs(),
                at: Utc::now(),
            }),
        ]
    }

    /// Stop the session. A no-op while idle.
    pub fn stop(&mut self) -> Vec<Effect> {
        if !self.is_tracking() {
            return Vec::new();
        }
        self.end_session();
        vec![
            Effect::CancelDeadline,
            Effect::CancelPoll,
            Effect::SuppressIdleLock(false),
            Effect::Emit(Event::TrackingStopped {
                session_id: self.session_id,
                at: Utc::now(),
            }),
        ]
    }

    pub fn deadline_fired(&mut self, epoch: u64) -> Vec<Effect> {
        if self.deadline_epoch != Some(epoch) {
            return Vec::new();
        }
        self.time_out(TimeoutCause::DeadlineElapsed)
    }

    pub fn poll_fired(&mut self, epoch: u64, app_state: AppState) -> Vec<Effect> {
        if self.poll_epoch != Some(epoch) {
            return Vec::new();
        }
        if !app_state.is_active() {
            return self.time_out(TimeoutCause::AppNotActive { app_state });
        }
        if self.poll_resets_deadline {
            self.reset_deadline(ResetReason::PollActive)
        } else {
            Vec::new()
        }
    }

    pub fn lifecycle(&mut self, event: LifecycleEvent) -> Vec<Effect> {
        if !self.is_tracking() {
            return Vec::new();
        }
        match event {
            // Also resumes a poll paused by backgrounding, so tracking again
            // implies both timers are armed.
            LifecycleEvent::WillEnterForeground => {
                let mut effects = self.reset_deadline(ResetReason::Foreground);
                if self.poll_epoch.is_none() {
                    effects.push(self.arm_poll());
                }
                effects
            }
            LifecycleEvent::ProximityChanged => self.reset_deadline(ResetReason::Proximity),
            LifecycleEvent::DidEnterBackground => {
                if self.poll_epoch.take().is_none() {
                    return Vec::new();
                }
                vec![
                    Effect::CancelPoll,
                    Effect::Emit(Event::PollingPaused {
                        session_id: self.session_id,
                        at: Utc::now(),
                    }),
                ]
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn time_out(&mut self, cause: TimeoutCause) -> Vec<Effect> {
        self.end_session();
        vec![
            Effect::SuppressIdleLock(false),
            Effect::Emit(Event::TimedOut(TimeoutEvent {
                session_id: self.session_id,
                cause,
                timeout_secs: self.timeout.as_secs(),
                at: Utc::now(),
            })),
            Effect::CancelPoll,
            Effect::CancelDeadline,
        ]
    }

    fn reset_deadline(&mut self, reason: ResetReason) -> Vec<Effect> {
        vec![
            self.arm_deadline(),
            Effect::Emit(Event::DeadlineReset {
                session_id: self.session_id,
                reason,
                at: Utc::now(),
            }),
        ]
    }

    fn end_session(&mut self) {
        self.state = TrackingState::Idle;
        self.deadline_epoch = None;
        self.poll_epoch = None;
        self.idle_lock_suppressed = false;
    }

    fn arm_deadline(&mut self) -> Effect {
        let epoch = self.bump_epoch();
        self.deadline_epoch = Some(epoch);
        Effect::ArmDeadline {
            epoch,
            after: self.timeout,
        }
    }

    fn arm_poll(&mut self) -> Effect {
        let epoch = self.bump_epoch();
        self.poll_epoch = Some(epoch);
        Effect::ArmPoll {
            epoch,
            every: self.poll_interval(),
        }
    }

    fn bump_epoch(&mut self) -> u64 {
        self.next_epoch += 1;
        self.next_epoch
    }
}
