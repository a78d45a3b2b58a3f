//! Sink routing and line formatting.
//!
//! The dispatcher owns the two thresholds, the three sink slots and the
//! output toggles. It never gates on the primary threshold before routing:
//! callers do that, so that message formatting is skipped for disabled
//! levels. Everything here is safe to call and reconfigure concurrently;
//! sink slots are swapped atomically and a call in flight keeps writing to
//! the sink it loaded.

use crate::application::metrics::Metrics;
use crate::application::ports::{Sink, StructuredSink};
use crate::domain::record::{escape_newlines, format_line, CallSite, Fields};
use crate::domain::severity::{Severity, Threshold};
use arc_swap::ArcSwapOption;
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Depth passed by the leveled logging calls.
pub const CALL_DEPTH: usize = 3;

/// Depth passed by the throttled logging calls, which sit one frame deeper.
pub const THROTTLE_CALL_DEPTH: usize = 4;

/// Where a dispatched call ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Forwarded to the structured sink
    Custom,
    /// Written to the error-only sink
    ErrorSink,
    /// Written to the primary sink
    Primary,
    /// No sink was eligible
    Dropped,
}

impl Routed {
    /// Whether some sink received the call.
    pub fn delivered(&self) -> bool {
        !matches!(self, Routed::Dropped)
    }
}

/// Routes formatted lines to the configured sinks.
pub struct Dispatcher {
    level: Threshold,
    error_level: Threshold,
    sink: ArcSwapOption<Box<dyn Sink>>,
    error_sink: ArcSwapOption<Box<dyn Sink>>,
    custom: ArcSwapOption<Box<dyn StructuredSink>>,
    color: AtomicBool,
    escape_newlines: AtomicBool,
    metrics: Metrics,
}

impl Dispatcher {
    /// Dispatcher with both thresholds at ERROR and no sinks.
    pub fn new(metrics: Metrics) -> Self {
        Self {
            level: Threshold::default(),
            error_level: Threshold::default(),
            sink: ArcSwapOption::empty(),
            error_sink: ArcSwapOption::empty(),
            custom: ArcSwapOption::empty(),
            color: AtomicBool::new(false),
            escape_newlines: AtomicBool::new(false),
            metrics,
        }
    }

    /// Primary threshold.
    pub fn level(&self) -> &Threshold {
        &self.level
    }

    /// Error-sink threshold.
    pub fn error_level(&self) -> &Threshold {
        &self.error_level
    }

    /// Whether `level` passes the primary threshold.
    pub fn enabled(&self, level: Severity) -> bool {
        self.level.admits(level)
    }

    pub fn set_sink(&self, sink: Box<dyn Sink>) {
        self.sink.store(Some(Arc::new(sink)));
    }

    pub fn clear_sink(&self) {
        self.sink.store(None);
    }

    pub fn has_sink(&self) -> bool {
        self.sink.load().is_some()
    }

    pub fn set_error_sink(&self, sink: Box<dyn Sink>) {
        self.error_sink.store(Some(Arc::new(sink)));
    }

    pub fn clear_error_sink(&self) {
        self.error_sink.store(None);
    }

    pub fn has_error_sink(&self) -> bool {
        self.error_sink.load().is_some()
    }

    /// Register a structured sink. While set, it receives every call and
    /// the standard sinks are bypassed.
    pub fn set_custom_sink(&self, sink: Box<dyn StructuredSink>) {
        self.custom.store(Some(Arc::new(sink)));
    }

    pub fn clear_custom_sink(&self) {
        self.custom.store(None);
    }

    pub fn has_custom_sink(&self) -> bool {
        self.custom.load().is_some()
    }

    pub fn set_color(&self, enabled: bool) {
        self.color.store(enabled, Ordering::Relaxed);
    }

    pub fn color(&self) -> bool {
        self.color.load(Ordering::Relaxed)
    }

    pub fn set_escape_newlines(&self, enabled: bool) {
        self.escape_newlines.store(enabled, Ordering::Relaxed);
    }

    pub fn escape_newlines(&self) -> bool {
        self.escape_newlines.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Dispatch without fields. Adds one frame to `site`.
    pub fn dispatch(&self, site: CallSite, level: Severity, message: &str) -> Routed {
        self.dispatch_fields(site.deeper(), level, message, None)
    }

    /// Route one call.
    ///
    /// The structured sink, when present, takes the call unconditionally.
    /// Otherwise the error sink is preferred when its threshold admits the
    /// level, then the primary sink. Fields only reach the structured sink.
    pub fn dispatch_fields(
        &self,
        site: CallSite,
        level: Severity,
        message: &str,
        fields: Option<&Fields>,
    ) -> Routed {
        let message = self.prepare(message);

        if let Some(custom) = self.custom.load().as_ref() {
            custom.log(site, level, &message, fields);
            self.metrics.record_written();
            return Routed::Custom;
        }

        self.write_standard(site, level, "", &message)
    }

    /// Route `prefix + tag + message` to the standard sinks.
    ///
    /// The structured sink is not consulted; a prefixed line only makes
    /// sense as text.
    pub fn dispatch_prefixed(
        &self,
        site: CallSite,
        level: Severity,
        prefix: &str,
        message: &str,
    ) -> Routed {
        let message = self.prepare(message);
        self.write_standard(site, level, prefix, &message)
    }

    fn prepare<'a>(&self, message: &'a str) -> Cow<'a, str> {
        if self.escape_newlines() {
            escape_newlines(message)
        } else {
            Cow::Borrowed(message)
        }
    }

    fn write_standard(&self, site: CallSite, level: Severity, prefix: &str, message: &str) -> Routed {
        // One load: the slot may be cleared between a check and a second read.
        let error_sink = self.error_sink.load_full();
        let (sink, routed) = if self.error_level.admits(level) && error_sink.is_some() {
            (error_sink, Routed::ErrorSink)
        } else if self.level.admits(level) {
            (self.sink.load_full(), Routed::Primary)
        } else {
            (None, Routed::Dropped)
        };

        let Some(sink) = sink else {
            self.metrics.record_dropped();
            return Routed::Dropped;
        };

        let line = format_line(prefix, level, message, self.color());
        match sink.write_line(site, &line) {
            Ok(()) => self.metrics.record_written(),
            Err(_) => self.metrics.record_write_failure(),
        }
        routed
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Metrics::new())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("level", &self.level.get())
            .field("error_level", &self.error_level.get())
            .field("sink", &self.has_sink())
            .field("error_sink", &self.has_error_sink())
            .field("custom_sink", &self.has_custom_sink())
            .field("color", &self.color())
            .field("escape_newlines", &self.escape_newlines())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::{MockSink, MockStructuredSink};

    fn dispatcher(level: Severity, error_level: Severity) -> Dispatcher {
        let dispatcher = Dispatcher::default();
        dispatcher.level().set(level);
        dispatcher.error_level().set(error_level);
        dispatcher
    }

    #[test]
    fn test_no_sinks_drops() {
        let d = dispatcher(Severity::Debug, Severity::Debug);
        assert_eq!(d.dispatch(CallSite::here(CALL_DEPTH), Severity::Error, "x"), Routed::Dropped);
        assert_eq!(d.metrics().lines_dropped(), 1);
    }

    #[test]
    fn test_primary_sink_receives_tagged_line() {
        let d = dispatcher(Severity::Info, Severity::None);
        let sink = MockSink::new();
        d.set_sink(Box::new(sink.clone()));

        let routed = d.dispatch(CallSite::here(CALL_DEPTH), Severity::Error, "disk full");

        assert_eq!(routed, Routed::Primary);
        assert_eq!(sink.lines(), vec!["[ERROR] disk full".to_string()]);
        assert_eq!(sink.depths(), vec![CALL_DEPTH + 1]);
        assert_eq!(d.metrics().lines_written(), 1);
    }

    #[test]
    fn test_error_sink_preferred_when_admitted() {
        let d = dispatcher(Severity::Debug, Severity::Error);
        let primary = MockSink::new();
        let errors = MockSink::new();
        d.set_sink(Box::new(primary.clone()));
        d.set_error_sink(Box::new(errors.clone()));

        let site = CallSite::here(CALL_DEPTH);
        assert_eq!(d.dispatch(site, Severity::Error, "e"), Routed::ErrorSink);
        assert_eq!(d.dispatch(site, Severity::Info, "i"), Routed::Primary);

        assert_eq!(errors.lines(), vec!["[ERROR] e".to_string()]);
        assert_eq!(primary.lines(), vec!["[INFO] i".to_string()]);
    }

    #[test]
    fn test_error_threshold_without_sink_falls_through() {
        let d = dispatcher(Severity::Warn, Severity::Debug);
        let primary = MockSink::new();
        d.set_sink(Box::new(primary.clone()));

        let routed = d.dispatch(CallSite::here(CALL_DEPTH), Severity::Warn, "w");
        assert_eq!(routed, Routed::Primary);
        assert_eq!(primary.len(), 1);
    }

    #[test]
    fn test_below_both_thresholds_is_dropped() {
        let d = dispatcher(Severity::Warn, Severity::Error);
        let primary = MockSink::new();
        d.set_sink(Box::new(primary.clone()));

        assert_eq!(d.dispatch(CallSite::here(CALL_DEPTH), Severity::Debug, "d"), Routed::Dropped);
        assert!(primary.is_empty());
    }

    #[test]
    fn test_custom_sink_takes_everything() {
        let d = dispatcher(Severity::None, Severity::None);
        let primary = MockSink::new();
        let custom = MockStructuredSink::new();
        d.set_sink(Box::new(primary.clone()));
        d.set_custom_sink(Box::new(custom.clone()));

        let mut fields = Fields::new();
        fields.insert("peer".into(), "10.0.0.1".into());
        let routed = d.dispatch_fields(
            CallSite::here(CALL_DEPTH),
            Severity::Fatal,
            "boom",
            Some(&fields),
        );

        assert_eq!(routed, Routed::Custom);
        assert!(primary.is_empty());
        let records = custom.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Severity::Fatal);
        assert_eq!(records[0].message, "boom");
        assert_eq!(records[0].fields.as_ref(), Some(&fields));
        assert_eq!(records[0].depth, CALL_DEPTH);

        d.clear_custom_sink();
        assert!(!d.has_custom_sink());
    }

    #[test]
    fn test_color_mode_replaces_tag() {
        let d = dispatcher(Severity::Debug, Severity::None);
        let sink = MockSink::new();
        d.set_sink(Box::new(sink.clone()));
        d.set_color(true);

        d.dispatch(CallSite::here(CALL_DEPTH), Severity::Warn, "careful");
        assert_eq!(sink.lines(), vec![format!("{}careful\x1b[0m", Severity::Warn.color())]);
    }

    #[test]
    fn test_escape_newlines() {
        let d = dispatcher(Severity::Debug, Severity::None);
        let sink = MockSink::new();
        let custom = MockStructuredSink::new();
        d.set_sink(Box::new(sink.clone()));
        d.set_escape_newlines(true);

        d.dispatch(CallSite::here(CALL_DEPTH), Severity::Info, "a\nb");
        assert_eq!(sink.lines(), vec!["[INFO] a\\nb".to_string()]);

        d.set_custom_sink(Box::new(custom.clone()));
        d.dispatch(CallSite::here(CALL_DEPTH), Severity::Info, "c\nd");
        assert_eq!(custom.records()[0].message, "c\\nd");
    }

    #[test]
    fn test_prefixed_bypasses_custom_sink() {
        let d = dispatcher(Severity::Debug, Severity::None);
        let sink = MockSink::new();
        let custom = MockStructuredSink::new();
        d.set_sink(Box::new(sink.clone()));
        d.set_custom_sink(Box::new(custom.clone()));

        let routed = d.dispatch_prefixed(CallSite::here(CALL_DEPTH), Severity::Info, "[db] ", "up");
        assert_eq!(routed, Routed::Primary);
        assert_eq!(sink.lines(), vec!["[db] [INFO] up".to_string()]);
        assert!(custom.records().is_empty());
    }

    #[test]
    fn test_write_failures_are_counted() {
        let d = dispatcher(Severity::Debug, Severity::None);
        d.set_sink(Box::new(MockSink::failing()));

        let routed = d.dispatch(CallSite::here(CALL_DEPTH), Severity::Info, "lost");
        assert_eq!(routed, Routed::Primary);
        assert_eq!(d.metrics().write_failures(), 1);
        assert_eq!(d.metrics().lines_written(), 0);
    }

    #[test]
    fn test_reconfiguration_while_dispatching() {
        use std::thread;

        let d = Arc::new(dispatcher(Severity::Debug, Severity::None));
        let sink = MockSink::new();
        d.set_sink(Box::new(sink.clone()));

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let d = Arc::clone(&d);
                thread::spawn(move || {
                    for _ in 0..200 {
                        d.dispatch(CallSite::here(CALL_DEPTH), Severity::Info, "tick");
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            d.set_color(true);
            d.set_color(false);
        }

        for writer in writers {
            writer.join().unwrap();
        }

        let lines = sink.lines();
        assert_eq!(lines.len(), 800);
        assert!(lines.iter().all(|line| line.ends_with("tick") || line.ends_with("tick\x1b[0m")));
    }

    #[test]
    fn test_error_sink_cleared_while_dispatching() {
        use std::thread;

        let d = Arc::new(dispatcher(Severity::Debug, Severity::Error));
        let primary = MockSink::new();
        let errors = MockSink::new();
        d.set_sink(Box::new(primary.clone()));
        d.set_error_sink(Box::new(errors.clone()));

        let done = Arc::new(AtomicBool::new(false));
        let toggler = {
            let d = Arc::clone(&d);
            let errors = errors.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    d.clear_error_sink();
                    d.set_error_sink(Box::new(errors.clone()));
                }
            })
        };

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let d = Arc::clone(&d);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let routed = d.dispatch(CallSite::here(CALL_DEPTH), Severity::Error, "e");
                        assert_ne!(routed, Routed::Dropped);
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Relaxed);
        toggler.join().unwrap();

        // Each line reached one of the two sinks.
        assert_eq!(d.metrics().lines_dropped(), 0);
        assert_eq!(primary.len() + errors.len(), 2000);
    }
}
