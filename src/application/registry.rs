//! Registry of per-key throttlers.
//!
//! Each throttle key owns one [`Throttler`], created the first time the key
//! is seen. The parameters of that first request stick: later calls naming
//! the same key with a different limit or window share the existing
//! throttler unchanged.

use crate::application::ports::{Clock, Storage};
use crate::domain::policy::ThrottleAlgorithm;
use crate::domain::throttler::{Attempt, Throttler};
use std::sync::Arc;
use std::time::Duration;

/// State kept for each throttle key.
#[derive(Debug, Clone)]
pub struct ThrottleEntry {
    pub throttler: Arc<Throttler>,
    /// Limit the key was registered with
    pub limit: usize,
    /// Window the key was registered with
    pub window: Duration,
}

impl ThrottleEntry {
    pub fn new(algorithm: ThrottleAlgorithm, limit: usize, window: Duration) -> Self {
        Self {
            throttler: Arc::new(Throttler::for_algorithm(algorithm, limit, window)),
            limit,
            window,
        }
    }

    fn matches(&self, limit: usize, window: Duration) -> bool {
        self.limit == limit && self.window == window
    }
}

/// Registry managing all throttle keys.
///
/// Generic over the storage backend; in production this is an
/// `Arc<ShardedStorage>`.
#[derive(Debug, Clone)]
pub struct ThrottleRegistry<S>
where
    S: Storage<String, ThrottleEntry>,
{
    storage: S,
    clock: Arc<dyn Clock>,
    algorithm: ThrottleAlgorithm,
}

impl<S> ThrottleRegistry<S>
where
    S: Storage<String, ThrottleEntry>,
{
    pub fn new(storage: S, clock: Arc<dyn Clock>, algorithm: ThrottleAlgorithm) -> Self {
        Self {
            storage,
            clock,
            algorithm,
        }
    }

    /// Throttler for `key`, registering it with `(limit, window)` if absent.
    ///
    /// The storage guard is released before this returns, so the caller can
    /// run the throttler without blocking other keys in the same shard.
    pub fn throttler_for(&self, key: &str, limit: usize, window: Duration) -> Arc<Throttler> {
        let algorithm = self.algorithm;
        let (throttler, registered) = self.storage.with_entry_mut(
            key.to_owned(),
            || ThrottleEntry::new(algorithm, limit, window),
            |entry| {
                let registered = (!entry.matches(limit, window)).then_some((entry.limit, entry.window));
                (Arc::clone(&entry.throttler), registered)
            },
        );

        if let Some((registered_limit, registered_window)) = registered {
            tracing::debug!(
                key,
                limit,
                ?window,
                registered_limit,
                ?registered_window,
                "throttle key already registered with different parameters; keeping the first"
            );
        }

        throttler
    }

    /// Record one occurrence of `key` at the registry clock's current time.
    pub fn attempt(&self, key: &str, limit: usize, window: Duration) -> Attempt {
        let throttler = self.throttler_for(key, limit, window);
        throttler.attempt(self.clock.now())
    }

    pub fn algorithm(&self) -> ThrottleAlgorithm {
        self.algorithm
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Forget every key. Their next use registers them afresh.
    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Remove keys not used for at least `max_idle`; returns how many.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        self.storage.remove_idle(max_idle)
    }

    /// Visit every key with its registration.
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&String, &ThrottleEntry),
    {
        self.storage.for_each(f);
    }
}
