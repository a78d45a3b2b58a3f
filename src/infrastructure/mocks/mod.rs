//! Mock implementations for testing.
//!
//! Test doubles for the infrastructure adapters: a clock that only moves
//! when told to, and sinks that remember what they were given.

pub mod clock;
pub mod sink;

pub use clock::MockClock;
pub use sink::{CapturedRecord, MockSink, MockStructuredSink};
