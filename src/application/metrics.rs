//! Counters describing what the dispatcher did with each call.
//!
//! Every counter is a relaxed atomic. Values are monotonic between resets
//! and may be read at any time from any thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared dispatcher and throttle counters.
///
/// Cloning is cheap and every clone updates the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Lines handed to a standard sink or the structured sink
    lines_written: AtomicU64,
    /// Calls that found no eligible sink
    lines_dropped: AtomicU64,
    /// Sink writes that returned an error
    write_failures: AtomicU64,
    /// Throttled calls that were let through
    throttle_allowed: AtomicU64,
    /// Throttled calls that were skipped
    throttle_suppressed: AtomicU64,
    /// Limiter checks that panicked and failed open
    throttle_failures: AtomicU64,
    /// Throttle keys removed to bound the registry
    keys_evicted: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_written(&self) {
        self.inner.lines_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.inner.lines_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write_failure(&self) {
        self.inner.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttle_allowed(&self) {
        self.inner.throttle_allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttle_suppressed(&self) {
        self.inner.throttle_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttle_failure(&self) {
        self.inner.throttle_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.inner.keys_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lines_written(&self) -> u64 {
        self.inner.lines_written.load(Ordering::Relaxed)
    }

    pub fn lines_dropped(&self) -> u64 {
        self.inner.lines_dropped.load(Ordering::Relaxed)
    }

    pub fn write_failures(&self) -> u64 {
        self.inner.write_failures.load(Ordering::Relaxed)
    }

    pub fn throttle_allowed(&self) -> u64 {
        self.inner.throttle_allowed.load(Ordering::Relaxed)
    }

    pub fn throttle_suppressed(&self) -> u64 {
        self.inner.throttle_suppressed.load(Ordering::Relaxed)
    }

    pub fn throttle_failures(&self) -> u64 {
        self.inner.throttle_failures.load(Ordering::Relaxed)
    }

    pub fn keys_evicted(&self) -> u64 {
        self.inner.keys_evicted.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_written: self.lines_written(),
            lines_dropped: self.lines_dropped(),
            write_failures: self.write_failures(),
            throttle_allowed: self.throttle_allowed(),
            throttle_suppressed: self.throttle_suppressed(),
            throttle_failures: self.throttle_failures(),
            keys_evicted: self.keys_evicted(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        let inner = &self.inner;
        for counter in [
            &inner.lines_written,
            &inner.lines_dropped,
            &inner.write_failures,
            &inner.throttle_allowed,
            &inner.throttle_suppressed,
            &inner.throttle_failures,
            &inner.keys_evicted,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub lines_written: u64,
    pub lines_dropped: u64,
    pub write_failures: u64,
    pub throttle_allowed: u64,
    pub throttle_suppressed: u64,
    pub throttle_failures: u64,
    pub keys_evicted: u64,
}

impl MetricsSnapshot {
    /// Share of throttled calls that were skipped, from 0.0 to 1.0.
    ///
    /// Returns 0.0 if no throttled call has been made.
    pub fn suppression_rate(&self) -> f64 {
        let total = self.throttled_calls();
        if total == 0 {
            0.0
        } else {
            self.throttle_suppressed as f64 / total as f64
        }
    }

    /// Throttled calls seen, whether let through or skipped.
    pub fn throttled_calls(&self) -> u64 {
        self.throttle_allowed
            .saturating_add(self.throttle_suppressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_initial_state() {
        assert_eq!(Metrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot_reflects_records() {
        let metrics = Metrics::new();
        metrics.record_written();
        metrics.record_written();
        metrics.record_dropped();
        metrics.record_write_failure();
        metrics.record_throttle_allowed();
        metrics.record_throttle_suppressed();
        metrics.record_throttle_failure();
        metrics.record_eviction();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.lines_written, 2);
        assert_eq!(snapshot.lines_dropped, 1);
        assert_eq!(snapshot.write_failures, 1);
        assert_eq!(snapshot.throttle_allowed, 1);
        assert_eq!(snapshot.throttle_suppressed, 1);
        assert_eq!(snapshot.throttle_failures, 1);
        assert_eq!(snapshot.keys_evicted, 1);
    }

    #[test]
    fn test_suppression_rate() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot().suppression_rate(), 0.0);

        metrics.record_throttle_allowed();
        metrics.record_throttle_suppressed();
        metrics.record_throttle_suppressed();
        metrics.record_throttle_suppressed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.throttled_calls(), 4);
        assert!((snapshot.suppression_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_written();
        metrics.record_eviction();
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let other = metrics.clone();
        other.record_written();
        assert_eq!(metrics.lines_written(), 1);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = Metrics::new();
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let m = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_written();
                        m.record_throttle_suppressed();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.lines_written(), 1000);
        assert_eq!(metrics.throttle_suppressed(), 1000);
    }
}
