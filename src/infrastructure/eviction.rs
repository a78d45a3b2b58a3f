//! Eviction adapter bounding the throttle-key registry.
//!
//! Keys built from format templates are few, but explicit keys may be
//! derived from runtime data (peer addresses, user ids). Without a bound
//! every distinct key would live for the lifetime of the process.

use crate::application::ports::{EvictionCandidate, EvictionPolicy};

/// Default number of throttle keys kept before the least recent are evicted.
pub const DEFAULT_MAX_THROTTLE_KEYS: usize = 10_000;

/// LRU eviction with an entry-count limit.
///
/// Once the limit is reached the least recently used entries across the whole
/// registry are dropped, one sixteenth of the limit at a time, so the full
/// scan is paid once per batch of new keys rather than on every insert.
#[derive(Debug, Clone)]
pub struct LruEviction {
    max_entries: usize,
}

impl LruEviction {
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Entries dropped each time the limit is hit.
    pub fn batch_size(&self) -> usize {
        (self.max_entries / 16).max(1)
    }
}

impl Default for LruEviction {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_THROTTLE_KEYS)
    }
}

impl<K, V> EvictionPolicy<K, V> for LruEviction {
    fn select_victims(&self, mut candidates: Vec<EvictionCandidate<K, V>>) -> Vec<K> {
        let count = (candidates.len().saturating_sub(self.max_entries) + self.batch_size())
            .min(candidates.len());
        if count == 0 {
            return Vec::new();
        }
        if count < candidates.len() {
            candidates.select_nth_unstable_by_key(count - 1, |candidate| candidate.last_access);
        }
        candidates.truncate(count);
        candidates.into_iter().map(|candidate| candidate.key).collect()
    }

    fn should_evict(&self, current_entries: usize) -> bool {
        current_entries >= self.max_entries
    }
}
