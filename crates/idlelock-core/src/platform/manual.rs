//! In-memory host driven by hand.
//!
//! Used by the CLI, where lifecycle signals come from stdin, and by tests.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{AppState, PlatformHost};

#[derive(Debug)]
pub struct ManualHost {
    app_state: AtomicU8,
    /// Every value passed to `set_idle_lock_disabled`, in call order.
    idle_lock_calls: Mutex<Vec<bool>>,
}

impl ManualHost {
    pub fn new(app_state: AppState) -> Self {
        Self {
            app_state: AtomicU8::new(encode(app_state)),
            idle_lock_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_app_state(&self, state: AppState) {
        self.app_state.store(encode(state), Ordering::SeqCst);
    }

    /// Whether the idle lock is currently disabled.
    pub fn idle_lock_disabled(&self) -> bool {
        self.idle_lock_calls().last().copied().unwrap_or(false)
    }

    pub fn idle_lock_calls(&self) -> Vec<bool> {
        self.idle_lock_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new(AppState::Active)
    }
}

impl PlatformHost for ManualHost {
    fn current_app_state(&self) -> AppState {
        decode(self.app_state.load(Ordering::SeqCst))
    }

    fn set_idle_lock_disabled(&self, disabled: bool) {
        self.idle_lock_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(disabled);
    }
}

fn encode(state: AppState) -> u8 {
    match state {
        AppState::Active => 0,
        AppState::Inactive => 1,
        AppState::Background => 2,
    }
}

fn decode(raw: u8) -> AppState {
    match raw {
        0 => AppState::Active,
        1 => AppState::Inactive,
        _ => AppState::Background,
    }
}
