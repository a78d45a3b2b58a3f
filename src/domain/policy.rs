//! Rate limiting algorithms behind a throttle key.
//!
//! Every algorithm answers the same question: "given `limit` events per
//! `window`, may this occurrence be emitted?". They differ in how strictly
//! they answer it.
//!
//! Only [`TimeWindowPolicy`], the default, guarantees that at most `limit`
//! occurrences are allowed inside any stretch of time shorter than `window`.
//! [`FixedWindowPolicy`] can emit up to `2 * limit` across a window boundary,
//! and [`TokenBucketPolicy`] can emit a full bucket and then its refill
//! within one window. Both keep the long-run rate at `limit` per `window`.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// Decision made by a rate limiting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Emit this occurrence
    Allow,
    /// Drop this occurrence
    Suppress,
}

impl PolicyDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }

    pub fn is_suppress(&self) -> bool {
        matches!(self, PolicyDecision::Suppress)
    }
}

/// A rate limiting algorithm.
pub trait RateLimitPolicy: Send + Sync {
    /// Record an occurrence at `timestamp` and decide whether it may be emitted.
    fn register_event(&mut self, timestamp: Instant) -> PolicyDecision;

    /// Forget all recorded occurrences.
    fn reset(&mut self);
}

/// Error returned when a policy is constructed with invalid parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// Token bucket capacity must be finite and greater than zero
    InvalidCapacity(f64),
    /// Token bucket refill rate must be finite and greater than zero
    InvalidRefillRate(f64),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::InvalidCapacity(c) => {
                write!(f, "token bucket capacity must be positive and finite, got {}", c)
            }
            PolicyError::InvalidRefillRate(r) => {
                write!(f, "token bucket refill rate must be positive and finite, got {}", r)
            }
        }
    }
}

impl std::error::Error for PolicyError {}

/// Sliding window: at most `max_events` within any trailing `window`.
///
/// ```
/// use throttle_log::{RateLimitPolicy, TimeWindowPolicy};
/// use std::time::{Duration, Instant};
///
/// let mut policy = TimeWindowPolicy::new(2, Duration::from_secs(60));
/// let now = Instant::now();
///
/// assert!(policy.register_event(now).is_allow());
/// assert!(policy.register_event(now).is_allow());
/// assert!(policy.register_event(now).is_suppress());
///
/// // Once the window has fully elapsed the key is eligible again.
/// assert!(policy.register_event(now + Duration::from_secs(60)).is_allow());
/// ```
#[derive(Debug, Clone)]
pub struct TimeWindowPolicy {
    max_events: usize,
    window: Duration,
    emitted_at: VecDeque<Instant>,
}

impl TimeWindowPolicy {
    pub fn new(max_events: usize, window: Duration) -> Self {
        Self {
            max_events,
            window,
            emitted_at: VecDeque::new(),
        }
    }

    fn expire(&mut self, now: Instant) {
        while let Some(&oldest) = self.emitted_at.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.emitted_at.pop_front();
            } else {
                break;
            }
        }
    }
}

impl RateLimitPolicy for TimeWindowPolicy {
    fn register_event(&mut self, timestamp: Instant) -> PolicyDecision {
        self.expire(timestamp);

        if self.emitted_at.len() < self.max_events {
            self.emitted_at.push_back(timestamp);
            PolicyDecision::Allow
        } else {
            PolicyDecision::Suppress
        }
    }

    fn reset(&mut self) {
        self.emitted_at.clear();
    }
}

/// Fixed window: at most `max_events` per window, counting restarts when a
/// window boundary is crossed.
///
/// Windows start at the first occurrence rather than at wall-clock
/// boundaries. A burst at the end of one window may be followed by another
/// at the start of the next, so a trailing stretch shorter than `window` can
/// hold up to `2 * max_events` allowed occurrences.
#[derive(Debug, Clone)]
pub struct FixedWindowPolicy {
    max_events: usize,
    window: Duration,
    window_start: Option<Instant>,
    count: usize,
}

impl FixedWindowPolicy {
    pub fn new(max_events: usize, window: Duration) -> Self {
        Self {
            max_events,
            window,
            window_start: None,
            count: 0,
        }
    }
}

impl RateLimitPolicy for FixedWindowPolicy {
    fn register_event(&mut self, timestamp: Instant) -> PolicyDecision {
        let expired = match self.window_start {
            Some(start) => timestamp.saturating_duration_since(start) >= self.window,
            None => true,
        };
        if expired {
            self.window_start = Some(timestamp);
            self.count = 0;
        }

        if self.count < self.max_events {
            self.count += 1;
            PolicyDecision::Allow
        } else {
            PolicyDecision::Suppress
        }
    }

    fn reset(&mut self) {
        self.window_start = None;
        self.count = 0;
    }
}

/// Token bucket: bursts up to `capacity`, refilled at `refill_per_sec`.
///
/// Refill is continuous, so after a full burst tokens keep trickling in and a
/// trailing stretch shorter than the refill period can hold more than
/// `capacity` allowed occurrences.
#[derive(Debug, Clone)]
pub struct TokenBucketPolicy {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_refill: Option<Instant>,
}

impl TokenBucketPolicy {
    /// Create a bucket that starts full.
    ///
    /// # Errors
    /// Returns `PolicyError` if either parameter is not finite and positive.
    pub fn new(capacity: f64, refill_per_sec: f64) -> Result<Self, PolicyError> {
        if !capacity.is_finite() || capacity <= 0.0 {
            return Err(PolicyError::InvalidCapacity(capacity));
        }
        if !refill_per_sec.is_finite() || refill_per_sec <= 0.0 {
            return Err(PolicyError::InvalidRefillRate(refill_per_sec));
        }
        Ok(Self {
            capacity,
            refill_per_sec,
            tokens: capacity,
            last_refill: None,
        })
    }

    /// Bucket holding `limit` tokens that refills at `limit` per `window`.
    ///
    /// # Errors
    /// Returns `PolicyError` if `limit` is zero or `window` is zero.
    pub fn per_window(limit: usize, window: Duration) -> Result<Self, PolicyError> {
        let capacity = limit as f64;
        let secs = window.as_secs_f64();
        let rate = if secs > 0.0 { capacity / secs } else { 0.0 };
        Self::new(capacity, rate)
    }

    fn refill(&mut self, now: Instant) {
        if let Some(last) = self.last_refill {
            let elapsed = now.saturating_duration_since(last).as_secs_f64();
            self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        }
        self.last_refill = Some(now);
    }
}

impl RateLimitPolicy for TokenBucketPolicy {
    fn register_event(&mut self, timestamp: Instant) -> PolicyDecision {
        self.refill(timestamp);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            PolicyDecision::Allow
        } else {
            PolicyDecision::Suppress
        }
    }

    fn reset(&mut self) {
        self.tokens = self.capacity;
        self.last_refill = None;
    }
}

/// Which algorithm new throttle keys are built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThrottleAlgorithm {
    /// [`TimeWindowPolicy`]: never more than `limit` in any trailing window
    #[default]
    SlidingWindow,
    /// [`FixedWindowPolicy`]: up to `2 * limit` across a window boundary
    FixedWindow,
    /// [`TokenBucketPolicy`] sized to `limit` tokens per window; bursts
    /// plus refill may exceed `limit` within one window
    TokenBucket,
}

/// Closed set of the built-in policies.
#[derive(Debug, Clone)]
pub enum Policy {
    TimeWindow(TimeWindowPolicy),
    FixedWindow(FixedWindowPolicy),
    TokenBucket(TokenBucketPolicy),
}

impl Policy {
    /// Sliding window policy.
    pub fn time_window(max_events: usize, window: Duration) -> Self {
        Policy::TimeWindow(TimeWindowPolicy::new(max_events, window))
    }

    /// Fixed window policy.
    pub fn fixed_window(max_events: usize, window: Duration) -> Self {
        Policy::FixedWindow(FixedWindowPolicy::new(max_events, window))
    }

    /// Token bucket policy.
    ///
    /// # Errors
    /// Returns `PolicyError` for non-positive or non-finite parameters.
    pub fn token_bucket(capacity: f64, refill_per_sec: f64) -> Result<Self, PolicyError> {
        TokenBucketPolicy::new(capacity, refill_per_sec).map(Policy::TokenBucket)
    }

    /// Build the policy for `algorithm` enforcing `limit` per `window`.
    ///
    /// A token bucket cannot represent a zero limit or a zero window, so those
    /// fall back to the sliding window, which handles both (a zero limit
    /// suppresses everything, a zero window suppresses nothing).
    pub fn for_algorithm(algorithm: ThrottleAlgorithm, limit: usize, window: Duration) -> Self {
        match algorithm {
            ThrottleAlgorithm::SlidingWindow => Policy::time_window(limit, window),
            ThrottleAlgorithm::FixedWindow => Policy::fixed_window(limit, window),
            ThrottleAlgorithm::TokenBucket => TokenBucketPolicy::per_window(limit, window)
                .map(Policy::TokenBucket)
                .unwrap_or_else(|_| Policy::time_window(limit, window)),
        }
    }
}

impl RateLimitPolicy for Policy {
    fn register_event(&mut self, timestamp: Instant) -> PolicyDecision {
        match self {
            Policy::TimeWindow(p) => p.register_event(timestamp),
            Policy::FixedWindow(p) => p.register_event(timestamp),
            Policy::TokenBucket(p) => p.register_event(timestamp),
        }
    }

    fn reset(&mut self) {
        match self {
            Policy::TimeWindow(p) => p.reset(),
            Policy::FixedWindow(p) => p.reset(),
            Policy::TokenBucket(p) => p.reset(),
        }
    }
}
