//! Logging macros over the process-wide [`global()`](crate::global) logger.
//!
//! Arguments are only formatted when the call passes the primary threshold.

/// Log at DEBUG.
///
/// ```
/// throttle_log::debug!("cache miss for {}", "user:42");
/// ```
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => {
        $crate::global().debug(::core::format_args!($($arg)+))
    };
}

/// Log at INFO.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {
        $crate::global().info(::core::format_args!($($arg)+))
    };
}

/// Log at WARN.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => {
        $crate::global().warn(::core::format_args!($($arg)+))
    };
}

/// Log at ERROR.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => {
        $crate::global().error(::core::format_args!($($arg)+))
    };
}

/// Log at an explicit level.
///
/// ```
/// use throttle_log::Severity;
///
/// throttle_log::log!(Severity::Fatal, "unrecoverable: {}", "disk full");
/// ```
#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)+) => {
        $crate::global().log($level, ::core::format_args!($($arg)+))
    };
}

/// Log at DEBUG with the prefix carried by a context.
#[macro_export]
macro_rules! debug_ctx {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::global().debug_ctx(&$ctx, ::core::format_args!($($arg)+))
    };
}

/// Log at INFO with the prefix carried by a context.
///
/// ```
/// use throttle_log::Context;
///
/// let ctx = Context::background().with_prefix("conn-9");
/// throttle_log::info_ctx!(ctx, "handshake done in {}ms", 12);
/// ```
#[macro_export]
macro_rules! info_ctx {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::global().info_ctx(&$ctx, ::core::format_args!($($arg)+))
    };
}

/// Log at WARN with the prefix carried by a context.
#[macro_export]
macro_rules! warn_ctx {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::global().warn_ctx(&$ctx, ::core::format_args!($($arg)+))
    };
}

/// Log at ERROR with the prefix carried by a context.
#[macro_export]
macro_rules! error_ctx {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::global().error_ctx(&$ctx, ::core::format_args!($($arg)+))
    };
}

/// Log with structured fields; only a custom sink sees them.
#[macro_export]
macro_rules! log_fields {
    ($level:expr, $fields:expr, $($arg:tt)+) => {
        $crate::global().log_fields($level, &$fields, ::core::format_args!($($arg)+))
    };
}

/// Throttled log keyed by the format string: every call sharing the
/// literal shares one budget, whatever the arguments.
///
/// ```
/// use throttle_log::Severity;
///
/// for port in 0..100 {
///     throttle_log::log_throttle!(Severity::Warn, 3, "port {} refused", port);
/// }
/// ```
#[macro_export]
macro_rules! log_throttle {
    ($level:expr, $limit:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::global().log_throttle($level, $limit, $fmt, ::core::format_args!($fmt $(, $arg)*))
    };
}

/// Throttled log under an explicit key.
#[macro_export]
macro_rules! log_throttle_key {
    ($level:expr, $limit:expr, $key:expr, $($arg:tt)+) => {
        $crate::global().log_throttle_key($level, $limit, $key, ::core::format_args!($($arg)+))
    };
}

/// Log at ERROR and evaluate to the [`LoggedError`](crate::LoggedError).
///
/// ```
/// fn open(path: &str) -> Result<(), throttle_log::LoggedError> {
///     Err(throttle_log::log_error!("cannot open {}", path))
/// }
///
/// assert_eq!(open("a.db").unwrap_err().to_string(), "cannot open a.db");
/// ```
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => {
        $crate::global().log_error(::core::format_args!($($arg)+))
    };
}
