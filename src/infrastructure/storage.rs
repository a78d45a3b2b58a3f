//! Storage implementations for throttle keys.
//!
//! Provides concurrent, sharded storage that optionally bounds its size
//! through an [`EvictionPolicy`].

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, EvictionCandidate, EvictionPolicy, Storage};
use crate::infrastructure::clock::SystemClock;
use ahash::RandomState;
use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    last_access: Instant,
}

/// Thread-safe sharded storage backed by DashMap.
///
/// Lookups take a shard lock for the duration of the accessor only, so
/// unrelated keys never contend. Each entry remembers when it was last
/// used; an attached eviction policy uses that to pick victims when the map
/// is full.
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    map: DashMap<K, Slot<V>, RandomState>,
    clock: Arc<dyn Clock>,
    eviction: Option<Arc<dyn EvictionPolicy<K, V>>>,
    metrics: Option<Metrics>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Unbounded storage stamped by the system clock.
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(RandomState::new()),
            clock: Arc::new(SystemClock::new()),
            eviction: None,
            metrics: None,
        }
    }

    /// Stamp accesses with `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound the storage with `policy`. Evictions are counted in `metrics`.
    pub fn with_eviction(mut self, policy: Arc<dyn EvictionPolicy<K, V>>, metrics: Metrics) -> Self {
        self.eviction = Some(policy);
        self.metrics = Some(metrics);
        self
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Remove a key and return its value.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.remove(key).map(|(_, slot)| slot.value)
    }
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Drop the entries chosen by the eviction policy.
    ///
    /// Every entry is offered as a candidate. They are cloned out first, so
    /// no shard lock is held while the policy decides or while victims are
    /// removed.
    fn evict(&self, policy: &dyn EvictionPolicy<K, V>) {
        let candidates: Vec<EvictionCandidate<K, V>> = self
            .map
            .iter()
            .map(|entry| EvictionCandidate {
                key: entry.key().clone(),
                value: entry.value().value.clone(),
                last_access: entry.value().last_access,
            })
            .collect();

        let mut evicted = 0usize;
        for victim in policy.select_victims(candidates) {
            if self.map.remove(&victim).is_some() {
                evicted += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.record_eviction();
                }
            }
        }
        if evicted > 0 {
            tracing::trace!(evicted, remaining = self.map.len(), "evicted throttle keys");
        }
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedStorage")
            .field("len", &self.map.len())
            .field("bounded", &self.eviction.is_some())
            .finish()
    }
}

impl<K, V> Storage<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        if let Some(policy) = &self.eviction {
            // Checked before `entry` takes the shard write lock: eviction
            // walks every shard.
            if !self.map.contains_key(&key) && policy.should_evict(self.map.len()) {
                self.evict(policy.as_ref());
            }
        }

        let now = self.clock.now();
        let mut slot = self.map.entry(key).or_insert_with(|| Slot {
            value: factory(),
            last_access: now,
        });
        slot.last_access = now;
        accessor(&mut slot.value)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn clear(&self) {
        self.map.clear()
    }

    fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for entry in self.map.iter() {
            f(entry.key(), &entry.value().value);
        }
    }

    fn retain<F>(&self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.map.retain(|key, slot| f(key, &mut slot.value));
    }

    fn remove_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let before = self.map.len();
        self.map
            .retain(|_, slot| now.saturating_duration_since(slot.last_access) < max_idle);
        before.saturating_sub(self.map.len())
    }
}

// Lets an `Arc<ShardedStorage>` be shared between the registry and callers.
impl<K, V> Storage<K, V> for Arc<ShardedStorage<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        (**self).with_entry_mut(key, factory, accessor)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V),
    {
        (**self).for_each(f)
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        (**self).retain(f)
    }

    fn remove_idle(&self, max_idle: Duration) -> usize {
        (**self).remove_idle(max_idle)
    }
}
