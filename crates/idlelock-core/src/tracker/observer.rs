//! Timeout observer registry.
//!
//! The registry only keeps [`Weak`] handles: an observer lives as long as its
//! owner keeps the `Arc`, and a dropped observer is pruned on the next
//! notification.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::{Deserialize, Serialize};

use crate::events::TimeoutEvent;

/// Receives the timeout notification of a tracking session.
pub trait TimeoutObserver: Send + Sync {
    fn on_timeout(&self, event: &TimeoutEvent);
}

impl<F> TimeoutObserver for F
where
    F: Fn(&TimeoutEvent) + Send + Sync,
{
    fn on_timeout(&self, event: &TimeoutEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObserverId(u64);

#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<Vec<(ObserverId, Weak<dyn TimeoutObserver>)>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Registering has no effect on any timer.
    pub fn register<O>(&self, observer: &Arc<O>) -> ObserverId
    where
        O: TimeoutObserver + 'static,
    {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let weak = Arc::downgrade(observer);
        let weak: Weak<dyn TimeoutObserver> = weak;
        self.lock().push((id, weak));
        id
    }

    /// Returns `false` if the id was unknown or already removed.
    pub fn unregister(&self, id: ObserverId) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of registered observers that are still alive.
    pub fn len(&self) -> usize {
        self.lock()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every live observer once. Observers run outside the registry
    /// lock, so they may register or unregister while being notified.
    /// Returns how many observers were called; zero is not an error.
    pub fn notify(&self, event: &TimeoutEvent) -> usize {
        let live: Vec<Arc<dyn TimeoutObserver>> = {
            let mut observers = self.lock();
            observers.retain(|(_, weak)| weak.strong_count() > 0);
            observers.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };
        for observer in &live {
            observer.on_timeout(event);
        }
        live.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ObserverId, Weak<dyn TimeoutObserver>)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TimeoutCause;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use uuid::Uuid;

    fn event() -> TimeoutEvent {
        TimeoutEvent {
            session_id: Uuid::new_v4(),
            cause: TimeoutCause::DeadlineElapsed,
            timeout_secs: 60,
            at: Utc::now(),
        }
    }

    fn counter() -> (Arc<AtomicUsize>, Arc<impl Fn(&TimeoutEvent) + Send + Sync>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let observer = Arc::new(move |_: &TimeoutEvent| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (hits, observer)
    }

    #[test]
    fn notify_without_observers_is_silent() {
        let registry = ObserverRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.notify(&event()), 0);
    }

    #[test]
    fn every_observer_is_called_once() {
        let registry = ObserverRegistry::new();
        let (a_hits, a) = counter();
        let (b_hits, b) = counter();
        registry.register(&a);
        registry.register(&b);

        assert_eq!(registry.notify(&event()), 2);
        assert_eq!(a_hits.load(Ordering::SeqCst), 1);
        assert_eq!(b_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_removes_observer() {
        let registry = ObserverRegistry::new();
        let (hits, observer) = counter();
        let id = registry.register(&observer);

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert_eq!(registry.notify(&event()), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn registry_does_not_keep_observers_alive() {
        let registry = ObserverRegistry::new();
        let (hits, observer) = counter();
        registry.register(&observer);
        assert_eq!(registry.len(), 1);

        drop(observer);
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.notify(&event()), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    fn register_generic<F>(registry: &ObserverRegistry, observer: &Arc<F>) -> ObserverId
    where
        F: Fn(&TimeoutEvent) + Send + Sync + 'static,
    {
        registry.register(observer)
    }

    #[test]
    fn generic_closure_arc_is_registered_weakly() {
        let registry = ObserverRegistry::new();
        let (hits, observer) = counter();
        let id = register_generic(&registry, &observer);

        assert_eq!(Arc::strong_count(&observer), 1);
        assert_eq!(registry.notify(&event()), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(registry.unregister(id));
    }

    struct Recorder(Mutex<Vec<TimeoutCause>>);

    impl TimeoutObserver for Recorder {
        fn on_timeout(&self, event: &TimeoutEvent) {
            self.0.lock().unwrap().push(event.cause);
        }
    }

    #[test]
    fn trait_objects_can_be_registered() {
        let registry = ObserverRegistry::new();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        registry.register(&recorder);

        registry.notify(&event());
        assert_eq!(*recorder.0.lock().unwrap(), vec![TimeoutCause::DeadlineElapsed]);
    }
}
