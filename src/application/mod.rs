//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain types at runtime:
//! - Throttle registry (one throttler per key)
//! - Throttle limiter (emit/skip decisions with fail-open)
//! - Dispatcher (threshold checks and sink routing)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement, so the routing logic never names a concrete
//! writer, clock or map.

pub mod dispatcher;
pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod registry;
