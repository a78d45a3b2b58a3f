//! Ports (interfaces) for the application layer.
//!
//! The dispatcher and the throttle registry only talk to the outside world
//! through these traits. Infrastructure provides the adapters: writer-backed
//! sinks, the `tracing` bridge, the system clock and sharded storage.

use crate::domain::record::{CallSite, Fields};
use crate::domain::severity::Severity;
use std::fmt::Debug;
use std::hash::Hash;
use std::io;
use std::time::{Duration, Instant};

/// Destination for fully formatted log lines.
///
/// Implementations must serialize their own writes; the dispatcher calls
/// `write_line` from many threads at once and holds no lock while doing so.
pub trait Sink: Send + Sync + Debug {
    /// Write one line. `site` identifies the user's call site.
    ///
    /// Errors are reported back to the dispatcher, which counts and then
    /// discards them.
    fn write_line(&self, site: CallSite, line: &str) -> io::Result<()>;
}

/// Structured backend that takes over formatting and level filtering.
///
/// When registered it receives every dispatched call unformatted, and the
/// standard sinks are bypassed entirely.
pub trait StructuredSink: Send + Sync + Debug {
    fn log(&self, site: CallSite, level: Severity, message: &str, fields: Option<&Fields>);
}

/// Candidate entry for eviction consideration.
///
/// Values are cloned so that no map guard is held while a policy decides.
pub struct EvictionCandidate<K, V> {
    pub key: K,
    pub value: V,
    /// Last time the entry was looked up
    pub last_access: Instant,
}

/// Port for eviction decisions on bounded storage.
pub trait EvictionPolicy<K, V>: Send + Sync + Debug {
    /// Pick the entries to evict. `candidates` holds every stored entry.
    fn select_victims(&self, candidates: Vec<EvictionCandidate<K, V>>) -> Vec<K>;

    /// Whether storage holding `current_entries` must make room before inserting.
    fn should_evict(&self, current_entries: usize) -> bool;
}

/// Port for obtaining current time.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

/// Port for concurrent key-value storage.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Look up `key`, inserting `factory()` if absent, and run `accessor` on it.
    ///
    /// Insert-if-absent is atomic with respect to other callers using the
    /// same key. The entry is locked only while `accessor` runs, so the
    /// accessor must be short and must not call back into the storage.
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool;

    fn clear(&self);

    /// Visit every entry.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);

    /// Keep only the entries for which `f` returns true.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;

    /// Drop entries not looked up for at least `max_idle`; returns how many.
    fn remove_idle(&self, max_idle: Duration) -> usize;
}
