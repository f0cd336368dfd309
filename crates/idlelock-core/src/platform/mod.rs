//! The tracker's view of the device: lifecycle signals, a queryable app
//! state and the idle display-lock toggle. OS integration lives outside this
//! crate; hosts implement [`PlatformHost`] and forward [`LifecycleEvent`]s.

mod manual;
pub mod types;

pub use manual::ManualHost;
pub use types::{AppState, LifecycleEvent, ParseAppStateError, PlatformHost};
