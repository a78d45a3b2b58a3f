//! Structured sink forwarding into the `tracing` ecosystem.
//!
//! Registering a [`TracingSink`] as the custom sink hands every dispatched
//! call to whatever `tracing` subscriber is installed. Level filtering and
//! formatting then belong to the subscriber.

use crate::application::ports::StructuredSink;
use crate::domain::record::{CallSite, DisplayFields, Fields};
use crate::domain::severity::Severity;

/// Target under which forwarded events are recorded.
pub const TARGET: &str = "throttle_log";

/// Emits each call as a `tracing` event.
///
/// FATAL has no `tracing` counterpart and is recorded at ERROR with
/// `severity = "fatal"`. Calls at `Severity::None` are ignored. The user's
/// call site travels in the `caller` field and the frame depth in `depth`;
/// structured fields are rendered into a single `fields` value because
/// `tracing` needs field names at compile time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

macro_rules! forward {
    ($event:ident, $severity:ident, $depth:ident, $caller:ident, $message:ident, $fields:ident) => {
        match $fields {
            Some(fields) if !fields.is_empty() => tracing::$event!(
                target: TARGET,
                severity = $severity,
                depth = $depth,
                caller = %$caller,
                fields = %DisplayFields(fields),
                "{}",
                $message
            ),
            _ => tracing::$event!(
                target: TARGET,
                severity = $severity,
                depth = $depth,
                caller = %$caller,
                "{}",
                $message
            ),
        }
    };
}

impl StructuredSink for TracingSink {
    fn log(&self, site: CallSite, level: Severity, message: &str, fields: Option<&Fields>) {
        let severity = level.as_str();
        let depth = site.depth;
        let caller = site.location;
        match level {
            Severity::Fatal | Severity::Error => {
                forward!(error, severity, depth, caller, message, fields)
            }
            Severity::Warn => forward!(warn, severity, depth, caller, message, fields),
            Severity::Info => forward!(info, severity, depth, caller, message, fields),
            Severity::Debug => forward!(debug, severity, depth, caller, message, fields),
            Severity::None => {}
        }
    }
}
