//! Timer-owning tracker.
//!
//! [`TimeoutTracker`] wraps a [`SessionEngine`] behind a single mutex. Every
//! public operation and every timer fire takes that lock, feeds the engine
//! and applies the returned effects before releasing it, so re-arming and
//! cancelling can never interleave.
//!
//! Timers are tokio tasks holding only a [`Weak`] reference to the tracker.
//! Timeout observers are called from a dedicated dispatcher task, after the
//! state lock is released and in emission order, so an observer may call
//! straight back into the tracker (for example to start a new session).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use super::engine::{Effect, SessionEngine, TrackingState};
use super::observer::{ObserverId, ObserverRegistry, TimeoutObserver};
use super::policy;
use crate::config::TrackerConfig;
use crate::error::Result;
use crate::events::{Event, TimeoutEvent};
use crate::platform::{LifecycleEvent, PlatformHost};

/// Point-in-time view of the tracker, for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerSnapshot {
    pub state: TrackingState,
    pub session_id: Option<Uuid>,
    pub timeout_secs: u64,
    /// Whole seconds until the deadline, rounded up.
    pub remaining_secs: Option<u64>,
    pub polling: bool,
}

/// Cheap to clone; all clones drive the same session.
///
/// Dropping the last clone cancels both timers and re-enables the idle lock.
#[derive(Clone)]
pub struct TimeoutTracker {
    inner: Arc<Inner>,
}

struct Inner {
    runtime: Handle,
    host: Arc<dyn PlatformHost>,
    session: Mutex<Session>,
    observers: Arc<ObserverRegistry>,
    timeouts: mpsc::UnboundedSender<TimeoutEvent>,
    events: broadcast::Sender<Event>,
}

struct Session {
    engine: SessionEngine,
    deadline: Option<TimerSlot>,
    poll: Option<TimerSlot>,
}

struct TimerSlot {
    /// Deadline: when it fires. Poll: its first tick.
    due: Instant,
    task: JoinHandle<()>,
}

impl TimerSlot {
    fn cancel(self) {
        self.task.abort();
    }
}

impl TimeoutTracker {
    /// Build a tracker on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if called outside a tokio runtime or if the
    /// configuration is invalid.
    pub fn new(host: Arc<dyn PlatformHost>, config: TrackerConfig) -> Result<Self> {
        let runtime = Handle::try_current()?;
        Self::with_runtime(runtime, host, config)
    }

    /// Build a tracker whose timers run on `runtime`. Usable from threads
    /// that are not part of any runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_runtime(
        runtime: Handle,
        host: Arc<dyn PlatformHost>,
        config: TrackerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let observers = Arc::new(ObserverRegistry::new());
        let (timeouts, pending) = mpsc::unbounded_channel();
        runtime.spawn(dispatch(Arc::clone(&observers), pending));
        let (events, _) = broadcast::channel(config.event_buffer);

        let inner = Inner {
            runtime,
            host,
            session: Mutex::new(Session {
                engine: SessionEngine::new(&config),
                deadline: None,
                poll: None,
            }),
            observers,
            timeouts,
            events,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session, clamping `duration` into the valid range. Without a
    /// duration the last one used is kept. Returns `false` if a session was
    /// already running, in which case nothing changes.
    pub fn start_tracking(&self, duration: Option<Duration>) -> bool {
        let mut session = self.inner.lock();
        let effects = session.engine.start(duration);
        let started = !effects.is_empty();
        if !started {
            debug!("start ignored, already tracking");
        }
        self.inner.apply(&mut session, effects);
        started
    }

    /// [`start_tracking`](Self::start_tracking) for raw second counts.
    pub fn start_tracking_secs(&self, secs: f64) -> bool {
        self.start_tracking(Some(policy::clamp_secs(secs)))
    }

    /// Stop the session. Safe from any state; returns `false` if idle.
    pub fn stop_tracking(&self) -> bool {
        let mut session = self.inner.lock();
        let effects = session.engine.stop();
        let stopped = !effects.is_empty();
        self.inner.apply(&mut session, effects);
        stopped
    }

    pub fn handle_lifecycle(&self, event: LifecycleEvent) {
        self.inner.lifecycle(event);
    }

    /// Forward lifecycle signals from a channel, in delivery order, until the
    /// sender closes or the tracker is dropped.
    pub fn attach(&self, mut signals: mpsc::UnboundedReceiver<LifecycleEvent>) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        self.inner.runtime.spawn(async move {
            while let Some(event) = signals.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.lifecycle(event);
            }
        })
    }

    pub fn register_observer<O>(&self, observer: &Arc<O>) -> ObserverId
    where
        O: TimeoutObserver + 'static,
    {
        self.inner.observers.register(observer)
    }

    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        self.inner.observers.unregister(id)
    }

    /// Every event the tracker emits, timeouts included.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_tracking(&self) -> bool {
        self.inner.lock().engine.is_tracking()
    }

    pub fn current_timeout_duration(&self) -> Duration {
        self.inner.lock().engine.timeout()
    }

    /// When the armed deadline timer fires.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.lock().deadline.as_ref().map(|slot| slot.due)
    }

    /// First tick of the armed poll timer.
    pub fn poll_started(&self) -> Option<Instant> {
        self.inner.lock().poll.as_ref().map(|slot| slot.due)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|due| due.saturating_duration_since(Instant::now()))
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let session = self.inner.lock();
        let remaining_secs = session.deadline.as_ref().map(|slot| {
            let left = slot.due.saturating_duration_since(Instant::now());
            left.as_secs() + u64::from(left.subsec_nanos() > 0)
        });
        TrackerSnapshot {
            state: session.engine.state(),
            session_id: session.engine.session_id(),
            timeout_secs: session.engine.timeout().as_secs(),
            remaining_secs,
            polling: session.poll.is_some(),
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lifecycle(self: &Arc<Self>, event: LifecycleEvent) {
        let mut session = self.lock();
        let effects = session.engine.lifecycle(event);
        if effects.is_empty() {
            debug!(?event, "lifecycle signal ignored");
        }
        self.apply(&mut session, effects);
    }

    fn deadline_fired(self: &Arc<Self>, epoch: u64) {
        let mut session = self.lock();
        let effects = session.engine.deadline_fired(epoch);
        if effects.is_empty() {
            debug!(epoch, "stale deadline fire dropped");
        }
        self.apply(&mut session, effects);
    }

    /// Returns whether the poll timer for `epoch` is still armed.
    fn poll_fired(self: &Arc<Self>, epoch: u64) -> bool {
        let app_state = self.host.current_app_state();
        let mut session = self.lock();
        let effects = session.engine.poll_fired(epoch, app_state);
        self.apply(&mut session, effects);
        let armed = session.engine.poll_epoch() == Some(epoch);
        if !armed {
            debug!(epoch, "poll timer retired");
        }
        armed
    }

    fn apply(self: &Arc<Self>, session: &mut Session, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ArmDeadline { epoch, after } => {
                    if let Some(old) = session.deadline.take() {
                        old.cancel();
                    }
                    session.deadline = Some(self.spawn_deadline(epoch, after));
                }
                Effect::ArmPoll { epoch, every } => {
                    if let Some(old) = session.poll.take() {
                        old.cancel();
                    }
                    session.poll = Some(self.spawn_poll(epoch, every));
                }
                Effect::CancelDeadline => {
                    if let Some(slot) = session.deadline.take() {
                        slot.cancel();
                    }
                }
                Effect::CancelPoll => {
                    if let Some(slot) = session.poll.take() {
                        slot.cancel();
                    }
                }
                Effect::SuppressIdleLock(disabled) => self.host.set_idle_lock_disabled(disabled),
                Effect::Emit(event) => self.emit(event),
            }
        }
    }

    fn emit(&self, event: Event) {
        match &event {
            Event::TrackingStarted {
                session_id,
                timeout_secs,
                ..
            } => info!(session = %session_id, timeout_secs, "tracking started"),
            Event::TrackingStopped { session_id, .. } => {
                info!(session = %session_id, "tracking stopped")
            }
            Event::DeadlineReset {
                session_id, reason, ..
            } => debug!(session = %session_id, ?reason, "deadline reset"),
            Event::PollingPaused { session_id, .. } => {
                debug!(session = %session_id, "polling paused")
            }
            Event::TimedOut(timeout) => {
                info!(session = %timeout.session_id, cause = ?timeout.cause, "idle timeout");
                if self.timeouts.send(timeout.clone()).is_err() {
                    debug!("timeout dispatcher gone, notification dropped");
                }
            }
        }
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn spawn_deadline(self: &Arc<Self>, epoch: u64, after: Duration) -> TimerSlot {
        let weak = Arc::downgrade(self);
        let due = Instant::now() + after;
        let task = self.runtime.spawn(async move {
            tokio::time::sleep_until(due).await;
            if let Some(inner) = weak.upgrade() {
                inner.deadline_fired(epoch);
            }
        });
        TimerSlot { due, task }
    }

    fn spawn_poll(self: &Arc<Self>, epoch: u64, every: Duration) -> TimerSlot {
        let weak: Weak<Inner> = Arc::downgrade(self);
        let due = Instant::now() + every;
        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(due, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if !inner.poll_fired(epoch) {
                    break;
                }
            }
        });
        TimerSlot { due, task }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let session = self.session.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = session.deadline.take() {
            slot.cancel();
        }
        if let Some(slot) = session.poll.take() {
            slot.cancel();
        }
        if session.engine.idle_lock_suppressed() {
            session.engine.stop();
            self.host.set_idle_lock_disabled(false);
            debug!("tracker dropped mid-session, idle lock restored");
        }
    }
}

async fn dispatch(observers: Arc<ObserverRegistry>, mut pending: mpsc::UnboundedReceiver<TimeoutEvent>) {
    while let Some(event) = pending.recv().await {
        let delivered = observers.notify(&event);
        debug!(session = %event.session_id, delivered, "timeout delivered");
    }
}
