//! Time source for the idle-timeout bookkeeping.

use std::time::Instant;

/// Source of "now" used by the watchdog.
///
/// The daemon runs on [`SystemClock`]; tests substitute a manually advanced
/// clock so timeout expiry can be exercised without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Monotonic clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
