//! Severity model and per-sink thresholds.
//!
//! Severities are ordered so that a lower value is more critical. A message
//! at severity `S` is eligible for a sink iff `S <= threshold`. The
//! [`Severity::None`] threshold disables every sink it is applied to.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI8, Ordering};

/// ANSI sequence that resets terminal colors.
pub const COLOR_RESET: &str = "\x1b[0m";

/// Ordered log severity.
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Disables emission when used as a threshold. Never an emitting level.
    None = -1,
    Fatal = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl Severity {
    /// Every severity that can be attached to a message, most critical first.
    pub const EMITTING: [Severity; 5] = [
        Severity::Fatal,
        Severity::Error,
        Severity::Warn,
        Severity::Info,
        Severity::Debug,
    ];

    /// Numeric value of this severity.
    pub const fn as_i8(self) -> i8 {
        self as i8
    }

    /// Convert a raw value back into a severity.
    pub const fn from_i8(value: i8) -> Option<Self> {
        match value {
            -1 => Some(Severity::None),
            0 => Some(Severity::Fatal),
            1 => Some(Severity::Error),
            2 => Some(Severity::Warn),
            3 => Some(Severity::Info),
            4 => Some(Severity::Debug),
            _ => None,
        }
    }

    /// Look up a level word, ignoring ASCII case and surrounding whitespace.
    ///
    /// Recognized words are `fatal`, `error`, `warn`, `info`, `debug` and `none`.
    /// Anything else yields `None` so callers can keep their previous setting.
    pub fn from_word(word: &str) -> Option<Self> {
        let word = word.trim();
        [
            ("fatal", Severity::Fatal),
            ("error", Severity::Error),
            ("warn", Severity::Warn),
            ("info", Severity::Info),
            ("debug", Severity::Debug),
            ("none", Severity::None),
        ]
        .into_iter()
        .find(|(name, _)| word.eq_ignore_ascii_case(name))
        .map(|(_, level)| level)
    }

    /// Lowercase level word, the inverse of [`Severity::from_word`].
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Fatal => "fatal",
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
            Severity::Debug => "debug",
        }
    }

    /// Plain bracketed tag written in front of a message.
    pub const fn tag(self) -> &'static str {
        match self {
            Severity::None => "",
            Severity::Fatal => "[FATAL] ",
            Severity::Error => "[ERROR] ",
            Severity::Warn => "[WARN] ",
            Severity::Info => "[INFO] ",
            Severity::Debug => "[DEBUG] ",
        }
    }

    /// ANSI color sequence used in place of the tag when color mode is on.
    pub const fn color(self) -> &'static str {
        match self {
            Severity::None => "",
            Severity::Fatal => "\x1b[0m\x1b[37m",
            Severity::Error => "\x1b[0m\x1b[31m",
            Severity::Warn => "\x1b[0m\x1b[33m",
            Severity::Info => "\x1b[0m\x1b[35m",
            Severity::Debug => "\x1b[0m\x1b[34m",
        }
    }

    /// Whether this threshold admits a message at `level`.
    pub const fn admits(self, level: Severity) -> bool {
        should_emit(level, self)
    }
}

/// Decide whether a message at `level` passes `threshold`.
///
/// True iff `threshold >= level`. A `None` level never passes and a `None`
/// threshold admits nothing.
pub const fn should_emit(level: Severity, threshold: Severity) -> bool {
    if matches!(level, Severity::None) {
        return false;
    }
    threshold as i8 >= level as i8
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when strict severity parsing fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSeverityError {
    word: String,
}

impl ParseSeverityError {
    /// The word that failed to parse.
    pub fn word(&self) -> &str {
        &self.word
    }
}

impl fmt::Display for ParseSeverityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown log level {:?} (expected fatal, error, warn, info, debug or none)",
            self.word
        )
    }
}

impl std::error::Error for ParseSeverityError {}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::from_word(s).ok_or_else(|| ParseSeverityError {
            word: s.to_string(),
        })
    }
}

/// Runtime-adjustable severity threshold.
///
/// Reads and writes are single atomic operations, so a threshold can be
/// changed while other threads are logging. Changes apply to later calls only.
#[derive(Debug)]
pub struct Threshold(AtomicI8);

impl Threshold {
    /// Create a threshold starting at `level`.
    pub const fn new(level: Severity) -> Self {
        Self(AtomicI8::new(level as i8))
    }

    /// Current threshold.
    pub fn get(&self) -> Severity {
        // Only valid discriminants are ever stored.
        Severity::from_i8(self.0.load(Ordering::Relaxed)).unwrap_or(Severity::None)
    }

    /// Replace the threshold.
    pub fn set(&self, level: Severity) {
        self.0.store(level as i8, Ordering::Relaxed);
    }

    /// Replace the threshold from a level word.
    ///
    /// Unrecognized words leave the threshold untouched and return `false`.
    pub fn set_word(&self, word: &str) -> bool {
        match Severity::from_word(word) {
            Some(level) => {
                self.set(level);
                true
            }
            None => false,
        }
    }

    /// Whether a message at `level` passes this threshold.
    pub fn admits(&self, level: Severity) -> bool {
        should_emit(level, self.get())
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::new(Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Severity; 6] = [
        Severity::None,
        Severity::Fatal,
        Severity::Error,
        Severity::Warn,
        Severity::Info,
        Severity::Debug,
    ];

    #[test]
    fn test_should_emit_matches_numeric_order() {
        for level in Severity::EMITTING {
            for threshold in ALL {
                assert_eq!(
                    should_emit(level, threshold),
                    threshold.as_i8() >= level.as_i8(),
                    "level {} threshold {}",
                    level,
                    threshold
                );
            }
        }
    }

    #[test]
    fn test_none_threshold_disables_everything() {
        for level in ALL {
            assert!(!should_emit(level, Severity::None));
        }
    }

    #[test]
    fn test_none_level_never_emits() {
        for threshold in ALL {
            assert!(!should_emit(Severity::None, threshold));
        }
    }

    #[test]
    fn test_from_word_is_case_insensitive() {
        assert_eq!(Severity::from_word("WARN"), Some(Severity::Warn));
        assert_eq!(Severity::from_word("Debug"), Some(Severity::Debug));
        assert_eq!(Severity::from_word(" none "), Some(Severity::None));
        assert_eq!(Severity::from_word("warning"), None);
        assert_eq!(Severity::from_word(""), None);
    }

    #[test]
    fn test_from_str_reports_word() {
        let err = "verbose".parse::<Severity>().unwrap_err();
        assert_eq!(err.word(), "verbose");
        assert!(err.to_string().contains("verbose"));
        assert_eq!("fatal".parse::<Severity>(), Ok(Severity::Fatal));
    }

    #[test]
    fn test_word_round_trip() {
        for level in ALL {
            assert_eq!(Severity::from_word(level.as_str()), Some(level));
            assert_eq!(Severity::from_i8(level.as_i8()), Some(level));
        }
        assert_eq!(Severity::from_i8(5), None);
    }

    #[test]
    fn test_threshold_ignores_unknown_words() {
        let threshold = Threshold::new(Severity::Info);
        assert!(!threshold.set_word("loud"));
        assert_eq!(threshold.get(), Severity::Info);

        assert!(threshold.set_word("warn"));
        assert_eq!(threshold.get(), Severity::Warn);
        assert!(threshold.admits(Severity::Error));
        assert!(!threshold.admits(Severity::Info));
    }

    #[test]
    fn test_tags_and_colors() {
        assert_eq!(Severity::Error.tag(), "[ERROR] ");
        assert_eq!(Severity::Warn.tag(), "[WARN] ");
        assert_eq!(Severity::None.tag(), "");
        for level in Severity::EMITTING {
            assert!(level.color().starts_with("\x1b["));
        }
    }
}
