//! Infrastructure layer - external adapters and the public facade.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time vs mock)
//! - Storage for throttle keys (sharded maps, LRU bound)
//! - Line sinks (writers, files, discard) and the `tracing` bridge
//! - Terminal detection
//! - The [`Logger`](logger::Logger) facade tying it all together

pub mod clock;
pub mod eviction;
pub mod logger;
pub mod sinks;
pub mod storage;
pub mod terminal;
pub mod tracing_sink;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides capturing sinks and a controllable
/// clock.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// throttle-log = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
