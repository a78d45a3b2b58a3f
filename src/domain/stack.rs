//! Stack capture and filtering for diagnostic traces.
//!
//! Capturing is easy; making the result readable is the hard part. A trace
//! is split into lines, a fixed number of leading lines describing the
//! capture itself are skipped, and each remaining line is handed to a
//! [`FrameClassifier`] that decides whether it is worth showing.
//!
//! Classification is a heuristic tied to one trace text format, so it is
//! pluggable:
//!
//! - [`ContinuationClassifier`] drops lines ending in `)` (argument list
//!   continuations) and lines under library installation prefixes.
//! - [`BacktraceClassifier`] understands `std::backtrace::Backtrace` output
//!   and keeps the `at file:line:col` lines of user frames.

use std::backtrace::Backtrace;
use std::fmt::Debug;
use std::sync::Arc;

/// Path of this file as it appears in backtrace location lines.
pub(crate) const SOURCE_FILE: &str = file!();

/// Decides whether one raw trace line is shown to the user.
pub trait FrameClassifier: Send + Sync + Debug {
    /// `true` keeps the line, `false` drops it as noise.
    fn is_signal(&self, line: &str) -> bool;
}

/// Drops argument-continuation lines and library frames.
///
/// A line is noise when it ends with `)` or starts with one of the
/// configured library prefixes.
#[derive(Debug, Clone)]
pub struct ContinuationClassifier {
    library_prefixes: Vec<String>,
}

impl ContinuationClassifier {
    pub fn new(library_prefixes: Vec<String>) -> Self {
        Self { library_prefixes }
    }
}

impl Default for ContinuationClassifier {
    fn default() -> Self {
        Self::new(vec!["/usr/local".to_string()])
    }
}

impl FrameClassifier for ContinuationClassifier {
    fn is_signal(&self, line: &str) -> bool {
        !line.ends_with(')')
            && !self
                .library_prefixes
                .iter()
                .any(|prefix| line.starts_with(prefix.as_str()))
    }
}

/// Classifier for the text form of [`std::backtrace::Backtrace`].
///
/// Backtraces alternate a numbered symbol line with an indented
/// `at path:line:col` line. Symbol lines play the role of continuations and
/// are dropped; location lines are kept unless their path contains one of
/// the library markers (toolchain sources, the cargo registry) or one of the
/// internal files (the logging machinery itself).
#[derive(Debug, Clone)]
pub struct BacktraceClassifier {
    library_markers: Vec<String>,
    internal_files: Vec<String>,
}

impl BacktraceClassifier {
    pub fn new(library_markers: Vec<String>, internal_files: Vec<String>) -> Self {
        Self {
            library_markers,
            internal_files,
        }
    }

    /// Also treat locations inside `file` as internal.
    pub fn with_internal_file(mut self, file: impl Into<String>) -> Self {
        self.internal_files.push(file.into());
        self
    }
}

impl Default for BacktraceClassifier {
    fn default() -> Self {
        Self::new(
            [
                "/rustc/",
                "/.cargo/registry/",
                "/.rustup/toolchains/",
                "library/std/src",
                "library/core/src",
                "library/alloc/src",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            vec![SOURCE_FILE.to_string()],
        )
    }
}

impl FrameClassifier for BacktraceClassifier {
    fn is_signal(&self, line: &str) -> bool {
        let Some(location) = line.trim_start().strip_prefix("at ") else {
            return false;
        };
        !self
            .library_markers
            .iter()
            .chain(self.internal_files.iter())
            .any(|marker| location.contains(marker.as_str()))
    }
}

/// Turns raw traces into bounded, human-readable text.
#[derive(Debug, Clone)]
pub struct StackFormatter {
    classifier: Arc<dyn FrameClassifier>,
    skip_lines: usize,
}

impl StackFormatter {
    /// Formatter that skips `skip_lines` leading lines and filters the rest
    /// with `classifier`.
    pub fn new(classifier: Arc<dyn FrameClassifier>, skip_lines: usize) -> Self {
        Self {
            classifier,
            skip_lines,
        }
    }

    pub fn skip_lines(&self) -> usize {
        self.skip_lines
    }

    /// Keep at most `max_lines` signal lines of `raw`.
    ///
    /// A trace no longer than the skip offset is returned unchanged.
    pub fn format(&self, raw: &str, max_lines: usize) -> String {
        let lines: Vec<&str> = raw.lines().collect();
        if lines.len() <= self.skip_lines {
            return raw.to_string();
        }

        lines[self.skip_lines..]
            .iter()
            .copied()
            .filter(|line| self.classifier.is_signal(line))
            .take(max_lines)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every line of `raw` after the skip offset, unfiltered.
    pub fn full(&self, raw: &str) -> String {
        raw.lines()
            .skip(self.skip_lines)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Bounded display variant.
    ///
    /// When the trace after the skip offset is deeper than `max_lines`, only
    /// its first `max_lines` lines are considered and every other one of them
    /// is kept, folding header/location pairs into single lines. Shallower
    /// traces are returned whole.
    pub fn compact(&self, raw: &str, max_lines: usize) -> String {
        let lines: Vec<&str> = raw.lines().skip(self.skip_lines).collect();
        if lines.len() > max_lines {
            lines[..max_lines]
                .iter()
                .skip(1)
                .step_by(2)
                .copied()
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            lines.join("\n")
        }
    }

    /// Capture the current thread's stack and [`format`](Self::format) it.
    pub fn capture(&self, max_lines: usize) -> String {
        self.format(&capture_raw(), max_lines)
    }

    /// Capture the current thread's stack and return it [`full`](Self::full).
    pub fn capture_full(&self) -> String {
        self.full(&capture_raw())
    }

    /// Capture the current thread's stack and [`compact`](Self::compact) it.
    pub fn capture_compact(&self, max_lines: usize) -> String {
        self.compact(&capture_raw(), max_lines)
    }
}

impl Default for StackFormatter {
    fn default() -> Self {
        Self::new(Arc::new(BacktraceClassifier::default()), 0)
    }
}

/// Capture the current stack as text, regardless of `RUST_BACKTRACE`.
pub fn capture_raw() -> String {
    Backtrace::force_capture().to_string()
}
