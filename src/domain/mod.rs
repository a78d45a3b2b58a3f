//! Domain layer - pure logic with no I/O.
//!
//! - Severity model and thresholds
//! - Context carrier and the log prefix chain
//! - Rate limiting policies and the per-key throttler
//! - Stack trace filtering
//! - Call sites, fields and line formatting
//!
//! All types in this layer are plain values and are tested in isolation.

pub mod context;
pub mod policy;
pub mod record;
pub mod severity;
pub mod stack;
pub mod throttler;
