//! Capturing sinks for testing.

use crate::application::ports::{Sink, StructuredSink};
use crate::domain::record::{CallSite, Fields};
use crate::domain::severity::Severity;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct CapturedLine {
    line: String,
    site: CallSite,
}

/// Sink that records every line it is given.
///
/// Clones share the captured lines, so a test keeps one clone and hands
/// the other to the logger.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    captured: Arc<Mutex<Vec<CapturedLine>>>,
    failing: bool,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every write fails; nothing is captured.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn captured(&self) -> MutexGuard<'_, Vec<CapturedLine>> {
        self.captured.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Captured lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.captured().iter().map(|c| c.line.clone()).collect()
    }

    /// Call depth each line was written with.
    pub fn depths(&self) -> Vec<usize> {
        self.captured().iter().map(|c| c.site.depth).collect()
    }

    /// Call sites each line was written with.
    pub fn sites(&self) -> Vec<CallSite> {
        self.captured().iter().map(|c| c.site).collect()
    }

    pub fn len(&self) -> usize {
        self.captured().len()
    }

    pub fn is_empty(&self) -> bool {
        self.captured().is_empty()
    }

    pub fn clear(&self) {
        self.captured().clear();
    }
}

impl Sink for MockSink {
    fn write_line(&self, site: CallSite, line: &str) -> io::Result<()> {
        if self.failing {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock sink closed"));
        }
        self.captured().push(CapturedLine {
            line: line.to_string(),
            site,
        });
        Ok(())
    }
}

/// One call received by a [`MockStructuredSink`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct CapturedRecord {
    pub level: Severity,
    pub message: String,
    pub fields: Option<Fields>,
    pub depth: usize,
    pub file: &'static str,
    pub line: u32,
}

/// Structured sink that records every call it receives.
#[derive(Debug, Clone, Default)]
pub struct MockStructuredSink {
    captured: Arc<Mutex<Vec<CapturedRecord>>>,
}

impl MockStructuredSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured calls, oldest first.
    pub fn records(&self) -> Vec<CapturedRecord> {
        self.captured
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.captured.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StructuredSink for MockStructuredSink {
    fn log(&self, site: CallSite, level: Severity, message: &str, fields: Option<&Fields>) {
        self.captured
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(CapturedRecord {
                level,
                message: message.to_string(),
                fields: fields.cloned(),
                depth: site.depth,
                file: site.location.file(),
                line: site.location.line(),
            });
    }
}
