mod engine;
mod observer;
pub mod policy;
mod runtime;

pub use engine::{Effect, SessionEngine, TrackingState};
pub use observer::{ObserverId, ObserverRegistry, TimeoutObserver};
pub use runtime::{TimeoutTracker, TrackerSnapshot};
