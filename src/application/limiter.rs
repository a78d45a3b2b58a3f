//! Throttle decisions for keyed log calls.
//!
//! The limiter asks the registry for the key's throttler and turns its
//! answer into an emit/skip decision, keeping the metrics up to date.

use crate::application::metrics::Metrics;
use crate::application::ports::Storage;
use crate::application::registry::{ThrottleEntry, ThrottleRegistry};
use std::panic;
use std::time::Duration;

/// Decision about a throttled log call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Emit the line. `suppressed` counts the calls skipped since the
    /// previous emission for this key.
    Emit { suppressed: u64 },
    /// Skip the line
    Skip,
}

impl ThrottleDecision {
    pub fn is_emit(&self) -> bool {
        matches!(self, ThrottleDecision::Emit { .. })
    }
}

/// Coordinates throttle decisions.
#[derive(Debug, Clone)]
pub struct ThrottleLimiter<S>
where
    S: Storage<String, ThrottleEntry>,
{
    registry: ThrottleRegistry<S>,
    metrics: Metrics,
}

impl<S> ThrottleLimiter<S>
where
    S: Storage<String, ThrottleEntry>,
{
    pub fn new(registry: ThrottleRegistry<S>, metrics: Metrics) -> Self {
        Self { registry, metrics }
    }

    /// Decide whether an occurrence of `key` may be emitted, allowing at
    /// most `limit` per `window`.
    ///
    /// # Fail-Safe Behavior
    /// A panic inside limiter accounting is caught and the call is emitted
    /// with `suppressed: 0`. The failure is counted in the metrics.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> ThrottleDecision {
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            self.registry.attempt(key, limit, window)
        }));

        match result {
            Ok(attempt) if attempt.skip => {
                self.metrics.record_throttle_suppressed();
                ThrottleDecision::Skip
            }
            Ok(attempt) => {
                self.metrics.record_throttle_allowed();
                ThrottleDecision::Emit {
                    suppressed: attempt.suppressed,
                }
            }
            Err(_) => {
                self.metrics.record_throttle_failure();
                self.metrics.record_throttle_allowed();
                ThrottleDecision::Emit { suppressed: 0 }
            }
        }
    }

    pub fn registry(&self) -> &ThrottleRegistry<S> {
        &self.registry
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
