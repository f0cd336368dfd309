//! Timeout duration bounds.
//!
//! Out-of-range requests are silently corrected, never rejected.

use std::time::Duration;

pub const MIN_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_TIMEOUT: Duration = Duration::from_secs(1800);
/// Used until a caller supplies an explicit duration.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Clamp a requested timeout into `[MIN_TIMEOUT, MAX_TIMEOUT]`.
pub fn clamp(requested: Duration) -> Duration {
    requested.clamp(MIN_TIMEOUT, MAX_TIMEOUT)
}

/// Clamp a raw second count coming from the UI layer, rounded to whole
/// seconds.
///
/// NaN and negative values map to the minimum, infinities to the bound on
/// their side.
pub fn clamp_secs(requested: f64) -> Duration {
    if requested.is_nan() || requested <= MIN_TIMEOUT.as_secs_f64() {
        return MIN_TIMEOUT;
    }
    if requested >= MAX_TIMEOUT.as_secs_f64() {
        return MAX_TIMEOUT;
    }
    clamp(Duration::from_secs(requested.round() as u64))
}

/// The liveness poll runs twice per timeout.
pub fn poll_interval(timeout: Duration) -> Duration {
    timeout / 2
}
