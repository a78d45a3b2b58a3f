//! # throttle-log
//!
//! A process-wide log dispatcher: severity gating, a primary sink plus an
//! optional error-only sink, an optional structured sink, context-carried
//! message prefixes, and per-key throttling of noisy log sites.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use throttle_log::Severity;
//!
//! // Log INFO and above to stderr with date, time and file:line.
//! throttle_log::global().setup_logging("info");
//!
//! throttle_log::info!("listening on {}", 8080);
//! throttle_log::debug!("not shown at INFO");
//!
//! // At most 5 of these per hour, however often the loop runs.
//! for peer in 0..1000 {
//!     throttle_log::log_throttle!(Severity::Warn, 5, "peer {} timed out", peer);
//! }
//! ```
//!
//! Applications that prefer an owned instance build one:
//!
//! ```rust
//! use throttle_log::{Logger, Severity};
//! use throttle_log::infrastructure::sinks::{LineFormat, WriterSink};
//!
//! let logger = Logger::builder()
//!     .with_level(Severity::Debug)
//!     .with_error_level(Severity::Warn)
//!     .with_sink(WriterSink::stdout(LineFormat::BARE))
//!     .with_error_sink(WriterSink::stderr(LineFormat::STANDARD))
//!     .build()
//!     .unwrap();
//!
//! logger.info("to stdout");
//! logger.error("to stderr");
//! ```
//!
//! ## Severity
//!
//! Levels order `Fatal < Error < Warn < Info < Debug`; `None` sits below
//! them all and silences a threshold. A call is emitted when its level is at
//! or below the threshold. Thresholds can be set from the words `fatal`,
//! `error`, `warn`, `info`, `debug` and `none`, case-insensitively. Unknown
//! words leave the threshold unchanged.
//!
//! ## Routing
//!
//! Every call is first gated by the primary threshold. Then:
//!
//! 1. If a structured sink is installed it receives the call, with its
//!    fields, and nothing else does.
//! 2. Otherwise, if an error sink is installed and the error threshold
//!    admits the level, the error sink receives the line.
//! 3. Otherwise the primary sink receives it.
//!
//! Standard sinks receive `"<tag><message>"`, e.g. `"[WARN] disk low"`. In
//! color mode the tag is replaced by an ANSI color and the line ends with a
//! reset. With newline escaping on, `\n` in messages becomes `\\n` so each
//! call stays on one line.
//!
//! ## Context Prefixes
//!
//! A [`Context`] carries a prefix through a call chain. Each
//! [`extend_prefix`](Context::extend_prefix) appends a space plus the new
//! text, and the `*_ctx` calls write `"<prefix> <message>"`:
//!
//! ```rust
//! use throttle_log::Context;
//!
//! let ctx = Context::background().with_prefix("req=7").extend_prefix("user=alice");
//! assert_eq!(ctx.prefix(), "req=7 user=alice");
//! ```
//!
//! ## Throttling
//!
//! Throttled calls take a key and a limit: at most `limit` calls per key are
//! emitted within any window (one hour unless configured). Keys are
//! independent. The first call registering a key fixes its limit and window.
//! The sliding window is the default; [`ThrottleAlgorithm`] also offers a
//! fixed window and a token bucket, which allow bursts beyond `limit` inside
//! a single window.
//!
//! The key table is bounded (10 000 keys by default) and evicts the least
//! recently used keys when full; unbounded tables can be swept with
//! [`Logger::sweep_idle_throttle_keys`].
//!
//! An emission that follows suppressed calls carries their count in the
//! [`SUPPRESSED_FIELD`] field. Only a structured sink sees it.
//!
//! Throttling fails open: if deciding panics, the call is emitted and the
//! failure is counted in [`Metrics`].
//!
//! ## Stack Traces
//!
//! `debug_trace`/`info_trace`/`warn_trace` log the current stack, filtered
//! to application frames. [`Logger::log_trace`] appends the whole stack and
//! [`Logger::log_trace_d`] a compacted one.
//!
//! ## `tracing` Integration
//!
//! Installing a [`TracingSink`] as the structured sink forwards every call
//! to the active `tracing` subscriber:
//!
//! ```rust
//! use throttle_log::{Logger, Severity, TracingSink};
//!
//! let logger = Logger::builder()
//!     .with_level(Severity::Debug)
//!     .with_custom_sink(TracingSink::new())
//!     .build()
//!     .unwrap();
//! logger.warn("forwarded to tracing");
//! ```
//!
//! ## Observability
//!
//! [`Logger::metrics`] counts written, dropped and failed lines, throttled
//! decisions and evicted keys:
//!
//! ```rust
//! # let logger = throttle_log::Logger::new();
//! let snapshot = logger.metrics().snapshot();
//! println!("suppression rate: {:.1}%", snapshot.suppression_rate() * 100.0);
//! ```

// Domain layer - pure logic
pub mod domain;

// Application layer - routing and throttling
pub mod application;

// Infrastructure layer - sinks, storage and the facade
pub mod infrastructure;

mod macros;

// Re-export commonly used types for convenience
pub use domain::{
    context::{extend_prefix, prefix_of, with_prefix, Context, ContextKey},
    policy::{
        FixedWindowPolicy, Policy, PolicyDecision, PolicyError, RateLimitPolicy,
        ThrottleAlgorithm, TimeWindowPolicy, TokenBucketPolicy,
    },
    record::{CallSite, FieldValue, Fields},
    severity::{ParseSeverityError, Severity, Threshold},
    stack::{BacktraceClassifier, ContinuationClassifier, FrameClassifier, StackFormatter},
    throttler::{Attempt, Throttler},
};

pub use application::{
    dispatcher::{Dispatcher, Routed},
    limiter::{ThrottleDecision, ThrottleLimiter},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, EvictionCandidate, EvictionPolicy, Sink, Storage, StructuredSink},
    registry::{ThrottleEntry, ThrottleRegistry},
};

pub use infrastructure::{
    clock::SystemClock,
    eviction::LruEviction,
    logger::{global, BuildError, LoggedError, Logger, LoggerBuilder, SUPPRESSED_FIELD},
    sinks::{DiscardSink, LineFormat, WriterSink},
    storage::ShardedStorage,
    tracing_sink::TracingSink,
};
