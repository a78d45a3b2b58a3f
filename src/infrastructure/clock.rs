//! Clock adapters for throttle windows.
//!
//! See `MockClock` (in `crate::infrastructure::mocks`) for a clock tests can
//! move by hand. It is available in unit tests and with the `test-helpers`
//! feature.

use crate::application::ports::Clock;
use std::time::Instant;

/// Monotonic clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
