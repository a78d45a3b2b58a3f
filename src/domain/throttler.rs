//! Limiter instance owned by a single throttle key.

use crate::domain::policy::{Policy, RateLimitPolicy, ThrottleAlgorithm};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Outcome of one [`Throttler::attempt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// The occurrence must not be emitted.
    pub skip: bool,
    /// Occurrences suppressed since the last emitted one. When `skip` is
    /// false this is the run that just ended; when true it includes this call.
    pub suppressed: u64,
}

/// Rate limiter for one throttle key.
///
/// `attempt` may be called concurrently from any number of threads. The
/// policy state sits behind its own short-lived mutex so that the registry
/// lock never covers limiter accounting.
#[derive(Debug)]
pub struct Throttler {
    policy: Mutex<Policy>,
    suppressed: AtomicU64,
}

impl Throttler {
    /// Allow at most `limit` occurrences per sliding `window`.
    pub fn new(limit: usize, window: Duration) -> Self {
        Self::with_policy(Policy::time_window(limit, window))
    }

    /// Allow at most `limit` occurrences per `window` using `algorithm`.
    pub fn for_algorithm(algorithm: ThrottleAlgorithm, limit: usize, window: Duration) -> Self {
        Self::with_policy(Policy::for_algorithm(algorithm, limit, window))
    }

    pub fn with_policy(policy: Policy) -> Self {
        Self {
            policy: Mutex::new(policy),
            suppressed: AtomicU64::new(0),
        }
    }

    /// Record an occurrence at `now` and report whether to skip it.
    pub fn attempt(&self, now: Instant) -> Attempt {
        // A poisoned policy is still a usable policy. The guard also orders
        // counter updates with the decisions that produced them.
        let mut policy = self.policy.lock().unwrap_or_else(|e| e.into_inner());

        if policy.register_event(now).is_allow() {
            Attempt {
                skip: false,
                suppressed: self.suppressed.swap(0, Ordering::Relaxed),
            }
        } else {
            Attempt {
                skip: true,
                suppressed: self.suppressed.fetch_add(1, Ordering::Relaxed) + 1,
            }
        }
    }

    /// Occurrences suppressed since the last emitted one.
    pub fn pending_suppressed(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }
}
