//! The logging facade.
//!
//! A [`Logger`] ties the dispatcher, the throttle limiter and the stack
//! formatter together behind the calls applications actually make. It is
//! cheap to clone and every clone shares configuration, sinks and throttle
//! state. [`global()`] returns the process-wide instance the macros use.

use crate::application::dispatcher::{Dispatcher, Routed, CALL_DEPTH, THROTTLE_CALL_DEPTH};
use crate::application::limiter::{ThrottleDecision, ThrottleLimiter};
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Sink, StructuredSink};
use crate::application::registry::{ThrottleEntry, ThrottleRegistry};
use crate::domain::context::Context;
use crate::domain::policy::ThrottleAlgorithm;
use crate::domain::record::{CallSite, FieldValue, Fields};
use crate::domain::severity::Severity;
use crate::domain::stack::{BacktraceClassifier, StackFormatter};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::eviction::{LruEviction, DEFAULT_MAX_THROTTLE_KEYS};
use crate::infrastructure::sinks::{DiscardSink, LineFormat, WriterSink};
use crate::infrastructure::storage::ShardedStorage;
use crate::infrastructure::terminal;
use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Window applied by the throttled calls that do not take one.
pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_secs(3600);

/// Field carrying the number of calls a throttled emission stands in for.
pub const SUPPRESSED_FIELD: &str = "suppressed";

type KeyStorage = Arc<ShardedStorage<String, ThrottleEntry>>;

/// Error returned when building a logger with invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Maximum throttle keys must be greater than zero
    ZeroMaxThrottleKeys,
    /// Default throttle window must be greater than zero
    ZeroThrottleWindow,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::ZeroMaxThrottleKeys => {
                write!(f, "max_throttle_keys must be greater than 0")
            }
            BuildError::ZeroThrottleWindow => {
                write!(f, "throttle_window must be greater than 0")
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// Error value returned by [`Logger::log_error`] after logging its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedError {
    message: String,
}

impl LoggedError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LoggedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LoggedError {}

/// Builder for [`Logger`].
///
/// Defaults: both thresholds at ERROR, no sinks, plain tags, newlines kept,
/// a one hour throttle window with the sliding window algorithm, and at
/// most 10 000 throttle keys.
pub struct LoggerBuilder {
    level: Severity,
    error_level: Severity,
    sink: Option<Box<dyn Sink>>,
    error_sink: Option<Box<dyn Sink>>,
    custom_sink: Option<Box<dyn StructuredSink>>,
    color: bool,
    escape_newlines: bool,
    throttle_window: Duration,
    algorithm: ThrottleAlgorithm,
    max_throttle_keys: Option<usize>,
    clock: Option<Arc<dyn Clock>>,
    stack: Option<StackFormatter>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            level: Severity::Error,
            error_level: Severity::Error,
            sink: None,
            error_sink: None,
            custom_sink: None,
            color: false,
            escape_newlines: false,
            throttle_window: DEFAULT_THROTTLE_WINDOW,
            algorithm: ThrottleAlgorithm::default(),
            max_throttle_keys: Some(DEFAULT_MAX_THROTTLE_KEYS),
            clock: None,
            stack: None,
        }
    }

    /// Set the primary threshold.
    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    /// Set the primary threshold from a level word. Unknown words leave it
    /// unchanged.
    pub fn with_level_word(mut self, word: &str) -> Self {
        if let Some(level) = Severity::from_word(word) {
            self.level = level;
        }
        self
    }

    /// Set the error-sink threshold.
    pub fn with_error_level(mut self, level: Severity) -> Self {
        self.error_level = level;
        self
    }

    pub fn with_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn with_error_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.error_sink = Some(Box::new(sink));
        self
    }

    /// Route every call to a structured sink instead of the standard sinks.
    pub fn with_custom_sink(mut self, sink: impl StructuredSink + 'static) -> Self {
        self.custom_sink = Some(Box::new(sink));
        self
    }

    /// Replace tags with ANSI colors.
    pub fn with_color(mut self, enabled: bool) -> Self {
        self.color = enabled;
        self
    }

    /// Write `\n` inside messages as the two characters `\` `n`.
    pub fn with_escape_newlines(mut self, enabled: bool) -> Self {
        self.escape_newlines = enabled;
        self
    }

    /// Window used by throttled calls that do not pass one.
    ///
    /// The value will be validated when `build()` is called.
    pub fn with_throttle_window(mut self, window: Duration) -> Self {
        self.throttle_window = window;
        self
    }

    /// Algorithm new throttle keys are created with.
    pub fn with_throttle_algorithm(mut self, algorithm: ThrottleAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Bound the number of throttle keys; the least recently used keys are
    /// evicted when the bound is reached.
    ///
    /// Default: 10,000 keys
    ///
    /// The value will be validated when `build()` is called.
    pub fn with_max_throttle_keys(mut self, max_keys: usize) -> Self {
        self.max_throttle_keys = Some(max_keys);
        self
    }

    /// Disable the throttle-key bound.
    ///
    /// **Warning**: keys derived from unbounded runtime data then grow
    /// without limit. Pair with [`Logger::sweep_idle_throttle_keys`].
    pub fn with_unlimited_throttle_keys(mut self) -> Self {
        self.max_throttle_keys = None;
        self
    }

    /// Set a custom clock for throttle windows (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the formatter used by the stack-trace calls.
    pub fn with_stack_formatter(mut self, formatter: StackFormatter) -> Self {
        self.stack = Some(formatter);
        self
    }

    /// Build the logger.
    ///
    /// # Errors
    /// Returns `BuildError` if the configuration is invalid.
    pub fn build(self) -> Result<Logger, BuildError> {
        if self.max_throttle_keys == Some(0) {
            return Err(BuildError::ZeroMaxThrottleKeys);
        }
        if self.throttle_window.is_zero() {
            return Err(BuildError::ZeroThrottleWindow);
        }
        Ok(self.assemble())
    }

    fn assemble(self) -> Logger {
        let metrics = Metrics::new();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));

        let mut storage: ShardedStorage<String, ThrottleEntry> =
            ShardedStorage::new().with_clock(Arc::clone(&clock));
        if let Some(max_keys) = self.max_throttle_keys {
            storage = storage.with_eviction(Arc::new(LruEviction::new(max_keys)), metrics.clone());
        }
        let registry = ThrottleRegistry::new(Arc::new(storage), clock, self.algorithm);
        let limiter = ThrottleLimiter::new(registry, metrics.clone());

        let dispatcher = Dispatcher::new(metrics);
        dispatcher.level().set(self.level);
        dispatcher.error_level().set(self.error_level);
        if let Some(sink) = self.sink {
            dispatcher.set_sink(sink);
        }
        if let Some(sink) = self.error_sink {
            dispatcher.set_error_sink(sink);
        }
        if let Some(sink) = self.custom_sink {
            dispatcher.set_custom_sink(sink);
        }
        dispatcher.set_color(self.color);
        dispatcher.set_escape_newlines(self.escape_newlines);

        let stack = self.stack.unwrap_or_else(|| {
            StackFormatter::new(
                Arc::new(BacktraceClassifier::default().with_internal_file(file!())),
                0,
            )
        });

        Logger {
            inner: Arc::new(LoggerInner {
                dispatcher,
                limiter,
                throttle_window: self.throttle_window,
                stack,
            }),
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoggerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerBuilder")
            .field("level", &self.level)
            .field("error_level", &self.error_level)
            .field("throttle_window", &self.throttle_window)
            .field("algorithm", &self.algorithm)
            .field("max_throttle_keys", &self.max_throttle_keys)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct LoggerInner {
    dispatcher: Dispatcher,
    limiter: ThrottleLimiter<KeyStorage>,
    throttle_window: Duration,
    stack: StackFormatter,
}

/// Severity-gated, throttling log dispatcher.
///
/// Every logging method is `#[track_caller]`: sinks that print source
/// positions report the line that called the method, whatever the depth
/// argument says.
///
/// ```
/// use throttle_log::{Logger, Severity};
/// use throttle_log::infrastructure::sinks::{LineFormat, WriterSink};
///
/// let logger = Logger::builder()
///     .with_level(Severity::Info)
///     .with_sink(WriterSink::stderr(LineFormat::SHORT_FILE))
///     .build()
///     .unwrap();
///
/// logger.info(format_args!("listening on {}", 8080));
/// for _ in 0..100 {
///     // Emitted at most 5 times per hour.
///     logger.log_throttle_key(Severity::Warn, 5, "backlog", "queue backlog growing");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Logger {
    /// Logger with default settings: ERROR thresholds and no sinks.
    pub fn new() -> Self {
        LoggerBuilder::new().assemble()
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    // Leveled calls

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.leveled(CALL_DEPTH, Severity::Debug, None, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.leveled(CALL_DEPTH, Severity::Info, None, message);
    }

    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.leveled(CALL_DEPTH, Severity::Warn, None, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.leveled(CALL_DEPTH, Severity::Error, None, message);
    }

    #[track_caller]
    pub fn debug_ctx(&self, ctx: &Context, message: impl fmt::Display) {
        self.leveled(CALL_DEPTH, Severity::Debug, Some(ctx), message);
    }

    #[track_caller]
    pub fn info_ctx(&self, ctx: &Context, message: impl fmt::Display) {
        self.leveled(CALL_DEPTH, Severity::Info, Some(ctx), message);
    }

    #[track_caller]
    pub fn warn_ctx(&self, ctx: &Context, message: impl fmt::Display) {
        self.leveled(CALL_DEPTH, Severity::Warn, Some(ctx), message);
    }

    #[track_caller]
    pub fn error_ctx(&self, ctx: &Context, message: impl fmt::Display) {
        self.leveled(CALL_DEPTH, Severity::Error, Some(ctx), message);
    }

    /// Log the current stack, at most `lines` frames, at DEBUG.
    #[track_caller]
    pub fn debug_trace(&self, lines: usize) {
        self.pretty_trace(Severity::Debug, lines);
    }

    /// Log the current stack, at most `lines` frames, at INFO.
    #[track_caller]
    pub fn info_trace(&self, lines: usize) {
        self.pretty_trace(Severity::Info, lines);
    }

    /// Log the current stack, at most `lines` frames, at WARN.
    #[track_caller]
    pub fn warn_trace(&self, lines: usize) {
        self.pretty_trace(Severity::Warn, lines);
    }

    #[track_caller]
    fn pretty_trace(&self, level: Severity, lines: usize) {
        if self.enabled(level) {
            let trace = self.inner.stack.capture(lines);
            self.dispatcher()
                .dispatch(CallSite::here(CALL_DEPTH), level, &format!("\n{}", trace));
        }
    }

    #[track_caller]
    fn leveled(&self, depth: usize, level: Severity, ctx: Option<&Context>, message: impl fmt::Display) -> Routed {
        if !self.enabled(level) {
            return Routed::Dropped;
        }
        let message = compose(ctx, message);
        self.dispatcher().dispatch(CallSite::here(depth), level, &message)
    }

    // Generic calls

    /// Log `message` at `level`.
    #[track_caller]
    pub fn log(&self, level: Severity, message: impl fmt::Display) -> Routed {
        self.leveled(CALL_DEPTH, level, None, message)
    }

    /// Log with an explicit call depth, for wrappers that add frames of
    /// their own.
    #[track_caller]
    pub fn log_d(&self, depth: usize, level: Severity, message: impl fmt::Display) -> Routed {
        self.leveled(depth, level, None, message)
    }

    /// Log with a context prefix and an explicit call depth.
    #[track_caller]
    pub fn log_ctx(&self, ctx: &Context, depth: usize, level: Severity, message: impl fmt::Display) -> Routed {
        self.leveled(depth + 1, level, Some(ctx), message)
    }

    /// Log with structured fields. Only a custom sink receives the fields.
    #[track_caller]
    pub fn log_fields(&self, level: Severity, fields: &Fields, message: impl fmt::Display) -> Routed {
        if !self.enabled(level) {
            return Routed::Dropped;
        }
        self.dispatcher().dispatch_fields(
            CallSite::here(CALL_DEPTH),
            level,
            &message.to_string(),
            Some(fields),
        )
    }

    /// Write `prefix` ahead of the tag. Goes to the standard sinks only, and
    /// is routed purely by the sink thresholds.
    #[track_caller]
    pub fn log_p(&self, level: Severity, prefix: &str, message: impl fmt::Display) -> Routed {
        self.dispatcher().dispatch_prefixed(
            CallSite::here(CALL_DEPTH),
            level,
            prefix,
            &message.to_string(),
        )
    }

    /// Log `message` followed by the full current stack.
    #[track_caller]
    pub fn log_trace(&self, level: Severity, message: impl fmt::Display) -> Routed {
        if !self.enabled(level) {
            return Routed::Dropped;
        }
        let trace = self.inner.stack.capture_full();
        self.dispatcher().dispatch(
            CallSite::here(CALL_DEPTH),
            level,
            &format!("{}\n{}", message, trace),
        )
    }

    /// Log `message` followed by the stack compacted to about `lines / 2`
    /// lines.
    #[track_caller]
    pub fn log_trace_d(&self, level: Severity, lines: usize, message: impl fmt::Display) -> Routed {
        if !self.enabled(level) {
            return Routed::Dropped;
        }
        let trace = self.inner.stack.capture_compact(lines);
        self.dispatcher().dispatch(
            CallSite::here(CALL_DEPTH),
            level,
            &format!("{}\n{}", message, trace),
        )
    }

    /// Log `message` at ERROR and hand it back as an error value.
    #[track_caller]
    pub fn log_error(&self, message: impl fmt::Display) -> LoggedError {
        let message = message.to_string();
        self.leveled(CALL_DEPTH, Severity::Error, None, &message);
        LoggedError { message }
    }

    /// The current stack, at most `lines` user frames.
    pub fn stack_trace(&self, lines: usize) -> String {
        self.inner.stack.capture(lines)
    }

    // Throttled calls

    /// Emit at most `limit` times per throttle window for `key`.
    ///
    /// The first call naming a key fixes its limit; later calls with another
    /// limit share the existing one. Returns whether the call got past the
    /// level check and the throttle.
    #[track_caller]
    pub fn log_throttle_key(&self, level: Severity, limit: usize, key: &str, message: impl fmt::Display) -> bool {
        self.throttled(THROTTLE_CALL_DEPTH, level, limit, self.throttle_window(), key, None, message)
    }

    /// [`log_throttle_key`](Self::log_throttle_key) with a context prefix.
    /// The key is used as given.
    #[track_caller]
    pub fn log_throttle_key_ctx(
        &self,
        ctx: &Context,
        level: Severity,
        limit: usize,
        key: &str,
        message: impl fmt::Display,
    ) -> bool {
        self.throttled(THROTTLE_CALL_DEPTH, level, limit, self.throttle_window(), key, Some(ctx), message)
    }

    /// Throttle by message template: calls sharing `template` share a key
    /// whatever their arguments.
    #[track_caller]
    pub fn log_throttle(&self, level: Severity, limit: usize, template: &str, message: impl fmt::Display) -> bool {
        self.throttled(THROTTLE_CALL_DEPTH, level, limit, self.throttle_window(), template, None, message)
    }

    /// [`log_throttle`](Self::log_throttle) with a context prefix. The key is
    /// the prefixed template, so each context is throttled separately.
    #[track_caller]
    pub fn log_throttle_ctx(
        &self,
        ctx: &Context,
        level: Severity,
        limit: usize,
        template: &str,
        message: impl fmt::Display,
    ) -> bool {
        let key = compose(Some(ctx), template);
        self.throttled(THROTTLE_CALL_DEPTH, level, limit, self.throttle_window(), &key, Some(ctx), message)
    }

    /// [`log_throttle`](Self::log_throttle) with an explicit call depth.
    #[track_caller]
    pub fn log_throttle_d(
        &self,
        depth: usize,
        level: Severity,
        limit: usize,
        template: &str,
        message: impl fmt::Display,
    ) -> bool {
        self.throttled(depth, level, limit, self.throttle_window(), template, None, message)
    }

    /// Emit at most `limit` times per `window` for `key`.
    #[track_caller]
    pub fn throttle(
        &self,
        level: Severity,
        limit: usize,
        window: Duration,
        key: &str,
        message: impl fmt::Display,
    ) -> bool {
        self.throttled(THROTTLE_CALL_DEPTH, level, limit, window, key, None, message)
    }

    /// Emissions that follow suppressed calls carry the count as the
    /// [`SUPPRESSED_FIELD`] field.
    #[allow(clippy::too_many_arguments)]
    #[track_caller]
    fn throttled(
        &self,
        depth: usize,
        level: Severity,
        limit: usize,
        window: Duration,
        key: &str,
        ctx: Option<&Context>,
        message: impl fmt::Display,
    ) -> bool {
        if !self.enabled(level) {
            return false;
        }
        let suppressed = match self.inner.limiter.check(key, limit, window) {
            ThrottleDecision::Emit { suppressed } => suppressed,
            ThrottleDecision::Skip => return false,
        };
        let message = compose(ctx, message);
        let site = CallSite::here(depth).deeper();
        if suppressed > 0 {
            let fields = Fields::from([(
                Cow::Borrowed(SUPPRESSED_FIELD),
                FieldValue::from(suppressed),
            )]);
            self.dispatcher().dispatch_fields(site, level, &message, Some(&fields));
        } else {
            self.dispatcher().dispatch_fields(site, level, &message, None);
        }
        true
    }

    // Configuration

    pub fn level(&self) -> Severity {
        self.dispatcher().level().get()
    }

    pub fn set_level(&self, level: Severity) {
        self.dispatcher().level().set(level);
    }

    /// Set the primary threshold from a level word; unknown words are
    /// ignored and reported as `false`.
    pub fn set_level_word(&self, word: &str) -> bool {
        self.dispatcher().level().set_word(word)
    }

    pub fn error_level(&self) -> Severity {
        self.dispatcher().error_level().get()
    }

    pub fn set_error_level(&self, level: Severity) {
        self.dispatcher().error_level().set(level);
    }

    pub fn set_error_level_word(&self, word: &str) -> bool {
        self.dispatcher().error_level().set_word(word)
    }

    /// Whether a call at `level` passes the primary threshold.
    pub fn enabled(&self, level: Severity) -> bool {
        self.dispatcher().enabled(level)
    }

    /// Install the primary sink and set the primary threshold from `word`.
    ///
    /// The sink is installed even when `word` is unknown; the return value
    /// reports whether the threshold changed.
    pub fn set_sink(&self, sink: impl Sink + 'static, word: &str) -> bool {
        self.dispatcher().set_sink(Box::new(sink));
        self.set_level_word(word)
    }

    /// Install the error-only sink and set its threshold from `word`.
    pub fn set_error_sink(&self, sink: impl Sink + 'static, word: &str) -> bool {
        self.dispatcher().set_error_sink(Box::new(sink));
        self.set_error_level_word(word)
    }

    pub fn clear_sink(&self) {
        self.dispatcher().clear_sink();
    }

    pub fn clear_error_sink(&self) {
        self.dispatcher().clear_error_sink();
    }

    pub fn has_sink(&self) -> bool {
        self.dispatcher().has_sink()
    }

    pub fn has_error_sink(&self) -> bool {
        self.dispatcher().has_error_sink()
    }

    /// Route every call to `sink`, bypassing the standard sinks and their
    /// thresholds. The primary threshold still gates the calls.
    pub fn set_custom_sink(&self, sink: impl StructuredSink + 'static) {
        self.dispatcher().set_custom_sink(Box::new(sink));
    }

    pub fn clear_custom_sink(&self) {
        self.dispatcher().clear_custom_sink();
    }

    pub fn has_custom_sink(&self) -> bool {
        self.dispatcher().has_custom_sink()
    }

    /// Switch to colored output.
    pub fn set_color_output(&self) {
        self.set_color(true);
    }

    pub fn set_color(&self, enabled: bool) {
        self.dispatcher().set_color(enabled);
    }

    /// Switch to colored output when attached to a terminal; returns
    /// whether color was turned on.
    pub fn set_color_if_terminal(&self) -> bool {
        let enabled = terminal::is_terminal();
        if enabled {
            self.set_color_output();
        }
        enabled
    }

    pub fn set_escape_newlines(&self, enabled: bool) {
        self.dispatcher().set_escape_newlines(enabled);
    }

    /// Log to standard error with date, time, microseconds and file name.
    pub fn setup_logging(&self, word: &str) -> bool {
        self.set_sink(WriterSink::stderr(LineFormat::SHORT_FILE), word)
    }

    /// Like [`setup_logging`](Self::setup_logging) with the full source path.
    pub fn setup_logging_long(&self, word: &str) -> bool {
        self.set_sink(WriterSink::stderr(LineFormat::LONG_FILE), word)
    }

    /// Log to an opened file with date, time, microseconds and file name.
    pub fn setup_logging_file(&self, file: File, word: &str) -> bool {
        self.set_sink(WriterSink::file(file, LineFormat::SHORT_FILE), word)
    }

    /// Replace the primary sink with one that discards everything, keeping
    /// the threshold.
    pub fn discard_output(&self) {
        self.dispatcher().set_sink(Box::new(DiscardSink));
    }

    // Introspection

    pub fn metrics(&self) -> &Metrics {
        self.dispatcher().metrics()
    }

    pub fn throttle_window(&self) -> Duration {
        self.inner.throttle_window
    }

    /// Number of throttle keys currently registered.
    pub fn throttle_key_count(&self) -> usize {
        self.inner.limiter.registry().len()
    }

    /// Forget throttle keys unused for at least `max_idle`; returns how many.
    pub fn sweep_idle_throttle_keys(&self, max_idle: Duration) -> usize {
        self.inner.limiter.registry().sweep_idle(max_idle)
    }

    /// Forget every throttle key.
    pub fn clear_throttle_keys(&self) {
        self.inner.limiter.registry().clear();
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// `"<prefix> <message>"`, or the message alone without a prefix.
fn compose(ctx: Option<&Context>, message: impl fmt::Display) -> String {
    match ctx.map(Context::prefix) {
        Some(prefix) if !prefix.is_empty() => format!("{} {}", prefix, message),
        _ => message.to_string(),
    }
}

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// The process-wide logger used by the crate's macros.
///
/// Starts at level ERROR with no sinks, so calls are dropped until a sink
/// is installed, e.g. with [`Logger::setup_logging`].
pub fn global() -> &'static Logger {
    GLOBAL.get_or_init(Logger::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::{MockClock, MockSink, MockStructuredSink};
    use std::time::Instant;

    fn logger_with(level: Severity) -> (Logger, MockSink) {
        let sink = MockSink::new();
        let logger = Logger::builder()
            .with_level(level)
            .with_error_level(Severity::None)
            .with_sink(sink.clone())
            .build()
            .unwrap();
        (logger, sink)
    }

    #[test]
    fn test_build_validation() {
        assert_eq!(
            Logger::builder().with_max_throttle_keys(0).build().unwrap_err(),
            BuildError::ZeroMaxThrottleKeys
        );
        assert_eq!(
            Logger::builder()
                .with_throttle_window(Duration::ZERO)
                .build()
                .unwrap_err(),
            BuildError::ZeroThrottleWindow
        );
        assert_eq!(
            BuildError::ZeroMaxThrottleKeys.to_string(),
            "max_throttle_keys must be greater than 0"
        );
    }

    #[test]
    fn test_defaults() {
        let logger = Logger::new();
        assert_eq!(logger.level(), Severity::Error);
        assert_eq!(logger.error_level(), Severity::Error);
        assert!(!logger.has_sink());
        assert_eq!(logger.throttle_window(), DEFAULT_THROTTLE_WINDOW);
        // No sinks: silently dropped.
        logger.error("nobody listens");
        assert_eq!(logger.metrics().lines_dropped(), 1);
    }

    #[test]
    fn test_leveled_calls_respect_threshold() {
        let (logger, sink) = logger_with(Severity::Warn);
        logger.debug("d");
        logger.info("i");
        logger.warn("w");
        logger.error(format_args!("e{}", 1));
        assert_eq!(sink.lines(), vec!["[WARN] w", "[ERROR] e1"]);
        assert_eq!(sink.depths(), vec![CALL_DEPTH + 1, CALL_DEPTH + 1]);
    }

    #[test]
    fn test_call_site_is_the_caller() {
        let (logger, sink) = logger_with(Severity::Debug);
        let line = line!() + 1;
        logger.info("here");
        let site = sink.sites()[0];
        assert_eq!(site.location.file(), file!());
        assert_eq!(site.location.line(), line);
    }

    #[test]
    fn test_ctx_prefix() {
        let (logger, sink) = logger_with(Severity::Debug);
        let ctx = Context::background().with_prefix("req-7");
        logger.info_ctx(&ctx, "started");
        logger.info_ctx(&Context::background(), "bare");
        assert_eq!(sink.lines(), vec!["[INFO] req-7 started", "[INFO] bare"]);
    }

    #[test]
    fn test_log_ctx_adds_a_frame() {
        let (logger, sink) = logger_with(Severity::Debug);
        logger.log_ctx(&Context::background(), 3, Severity::Info, "x");
        assert_eq!(sink.depths(), vec![5]);
    }

    #[test]
    fn test_log_d_uses_given_depth() {
        let (logger, sink) = logger_with(Severity::Debug);
        logger.log_d(7, Severity::Info, "x");
        assert_eq!(sink.depths(), vec![8]);
    }

    #[test]
    fn test_log_p_writes_prefix_before_tag() {
        let (logger, sink) = logger_with(Severity::Info);
        assert_eq!(logger.log_p(Severity::Info, "worker-1 ", "ready"), Routed::Primary);
        assert_eq!(logger.log_p(Severity::Debug, "worker-1 ", "noise"), Routed::Dropped);
        assert_eq!(sink.lines(), vec!["worker-1 [INFO] ready"]);
    }

    #[test]
    fn test_log_fields_reach_custom_sink() {
        let custom = MockStructuredSink::new();
        let logger = Logger::builder()
            .with_level(Severity::Info)
            .with_custom_sink(custom.clone())
            .build()
            .unwrap();

        let mut fields = Fields::new();
        fields.insert("user".into(), "alice".into());
        assert_eq!(logger.log_fields(Severity::Info, &fields, "login"), Routed::Custom);
        assert_eq!(logger.log_fields(Severity::Debug, &fields, "hidden"), Routed::Dropped);

        let records = custom.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields.as_ref(), Some(&fields));
        assert_eq!(records[0].depth, CALL_DEPTH);
    }

    #[test]
    fn test_log_error_returns_error() {
        let (logger, sink) = logger_with(Severity::Error);
        let err = logger.log_error(format_args!("open {} failed", "db.sqlite"));
        assert_eq!(err.to_string(), "open db.sqlite failed");
        assert_eq!(sink.lines(), vec!["[ERROR] open db.sqlite failed"]);

        logger.set_level(Severity::None);
        let silent = logger.log_error("still returned");
        assert_eq!(silent.message(), "still returned");
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_throttle_key_limits_per_window() {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let sink = MockSink::new();
        let logger = Logger::builder()
            .with_level(Severity::Debug)
            .with_sink(sink.clone())
            .with_clock(clock.clone())
            .build()
            .unwrap();

        let emitted = (0..10)
            .filter(|i| logger.log_throttle_key(Severity::Warn, 3, "flood", format_args!("n={}", i)))
            .count();
        assert_eq!(emitted, 3);
        assert_eq!(sink.lines(), vec!["[WARN] n=0", "[WARN] n=1", "[WARN] n=2"]);
        assert_eq!(sink.depths()[0], THROTTLE_CALL_DEPTH + 1);

        clock.advance(DEFAULT_THROTTLE_WINDOW);
        assert!(logger.log_throttle_key(Severity::Warn, 3, "flood", "again"));
        assert_eq!(logger.metrics().throttle_suppressed(), 7);
    }

    #[test]
    fn test_throttle_below_level_does_not_touch_registry() {
        let (logger, sink) = logger_with(Severity::Error);
        assert!(!logger.log_throttle(Severity::Info, 1, "tmpl {}", "tmpl 1"));
        assert_eq!(logger.throttle_key_count(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_throttle_ctx_keys_by_prefixed_template() {
        let (logger, sink) = logger_with(Severity::Debug);
        let a = Context::background().with_prefix("a");
        let b = Context::background().with_prefix("b");

        assert!(logger.log_throttle_ctx(&a, Severity::Info, 1, "tick {}", "tick 1"));
        assert!(!logger.log_throttle_ctx(&a, Severity::Info, 1, "tick {}", "tick 2"));
        assert!(logger.log_throttle_ctx(&b, Severity::Info, 1, "tick {}", "tick 3"));
        assert_eq!(logger.throttle_key_count(), 2);
        assert_eq!(sink.lines(), vec!["[INFO] a tick 1", "[INFO] b tick 3"]);

        // Explicit keys ignore the prefix.
        assert!(logger.log_throttle_key_ctx(&a, Severity::Info, 1, "k", "x"));
        assert!(!logger.log_throttle_key_ctx(&b, Severity::Info, 1, "k", "y"));
    }

    #[test]
    fn test_throttle_with_explicit_window() {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let logger = Logger::builder()
            .with_level(Severity::Debug)
            .with_sink(MockSink::new())
            .with_clock(clock.clone())
            .build()
            .unwrap();

        let window = Duration::from_secs(5);
        assert!(logger.throttle(Severity::Info, 1, window, "k", "a"));
        assert!(!logger.throttle(Severity::Info, 1, window, "k", "b"));
        clock.advance(window);
        assert!(logger.throttle(Severity::Info, 1, window, "k", "c"));
    }

    #[test]
    fn test_throttle_key_bound_and_sweep() {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let logger = Logger::builder()
            .with_level(Severity::Debug)
            .with_max_throttle_keys(4)
            .with_clock(clock.clone())
            .build()
            .unwrap();

        for i in 0..10 {
            logger.log_throttle_key(Severity::Info, 1, &format!("peer-{}", i), "x");
            clock.advance(Duration::from_secs(1));
        }
        assert_eq!(logger.throttle_key_count(), 4);
        assert_eq!(logger.metrics().keys_evicted(), 6);

        clock.advance(Duration::from_secs(60));
        assert_eq!(logger.sweep_idle_throttle_keys(Duration::from_secs(30)), 4);
        assert_eq!(logger.throttle_key_count(), 0);
    }

    #[test]
    fn test_sink_setters() {
        let logger = Logger::new();
        let sink = MockSink::new();
        assert!(logger.set_sink(sink.clone(), "INFO"));
        assert_eq!(logger.level(), Severity::Info);
        assert!(!logger.set_sink(sink.clone(), "verbose"));
        assert_eq!(logger.level(), Severity::Info);

        let errors = MockSink::new();
        assert!(logger.set_error_sink(errors.clone(), "warn"));
        logger.warn("to errors");
        logger.info("to primary");
        assert_eq!(errors.lines(), vec!["[WARN] to errors"]);
        assert_eq!(sink.lines(), vec!["[INFO] to primary"]);

        logger.clear_error_sink();
        logger.clear_sink();
        assert!(!logger.has_sink() && !logger.has_error_sink());
    }

    #[test]
    fn test_discard_output_keeps_level() {
        let (logger, sink) = logger_with(Severity::Info);
        logger.discard_output();
        logger.info("gone");
        assert!(sink.is_empty());
        assert_eq!(logger.level(), Severity::Info);
        assert_eq!(logger.metrics().lines_written(), 1);
    }

    #[test]
    fn test_color_and_escape() {
        let (logger, sink) = logger_with(Severity::Info);
        logger.set_color_output();
        logger.set_escape_newlines(true);
        logger.info("a\nb");
        assert_eq!(
            sink.lines(),
            vec![format!("{}a\\nb\x1b[0m", Severity::Info.color())]
        );
    }

    #[test]
    fn test_trace_calls() {
        let (logger, sink) = logger_with(Severity::Debug);
        logger.debug_trace(5);
        logger.log_trace_d(Severity::Info, 6, "compact");
        logger.log_trace(Severity::Warn, "full");

        let lines = sink.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("[DEBUG] \n"));
        assert!(lines[0].lines().count() <= 6);
        assert!(lines[1].starts_with("[INFO] compact\n"));
        assert!(lines[2].starts_with("[WARN] full\n"));
    }

    #[test]
    fn test_clones_share_state() {
        let (logger, sink) = logger_with(Severity::Info);
        let other = logger.clone();
        other.set_level(Severity::Debug);
        logger.debug("shared");
        assert_eq!(sink.len(), 1);
    }
}
