//! Text sinks: anything implementing `io::Write`, and a discarding sink.

use crate::application::ports::Sink;
use crate::domain::record::CallSite;
use chrono::Local;
use std::fmt;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Write};
use std::sync::Mutex;

/// Header fields written before each line.
///
/// Renders as `2024/05/01 13:45:10.123456 main.rs:42: <line>` with every
/// field enabled. When both file flags are set the long form wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineFormat {
    pub date: bool,
    pub time: bool,
    pub micros: bool,
    pub short_file: bool,
    pub long_file: bool,
}

impl LineFormat {
    /// No header at all.
    pub const BARE: LineFormat = LineFormat {
        date: false,
        time: false,
        micros: false,
        short_file: false,
        long_file: false,
    };

    /// Date and time to the second.
    pub const STANDARD: LineFormat = LineFormat {
        date: true,
        time: true,
        micros: false,
        short_file: false,
        long_file: false,
    };

    /// Date, time with microseconds, and the call site's file name.
    pub const SHORT_FILE: LineFormat = LineFormat {
        date: true,
        time: true,
        micros: true,
        short_file: true,
        long_file: false,
    };

    /// Like [`SHORT_FILE`](Self::SHORT_FILE) with the full source path.
    pub const LONG_FILE: LineFormat = LineFormat {
        date: true,
        time: true,
        micros: true,
        short_file: false,
        long_file: true,
    };

    fn write_header(&self, out: &mut String, site: CallSite) {
        if self.date || self.time {
            let now = Local::now();
            if self.date {
                let _ = write!(out, "{} ", now.format("%Y/%m/%d"));
            }
            if self.time {
                if self.micros {
                    let _ = write!(out, "{} ", now.format("%H:%M:%S%.6f"));
                } else {
                    let _ = write!(out, "{} ", now.format("%H:%M:%S"));
                }
            }
        }

        let file = if self.long_file {
            Some(site.location.file())
        } else if self.short_file {
            Some(site.short_file())
        } else {
            None
        };
        if let Some(file) = file {
            let _ = write!(out, "{}:{}: ", file, site.location.line());
        }
    }
}

/// Sink writing one line per call to an `io::Write`.
///
/// Writes are serialized through an internal mutex, so lines from
/// concurrent callers never interleave.
pub struct WriterSink {
    writer: Mutex<Box<dyn Write + Send>>,
    format: LineFormat,
}

impl WriterSink {
    pub fn new(writer: impl Write + Send + 'static, format: LineFormat) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            format,
        }
    }

    pub fn stderr(format: LineFormat) -> Self {
        Self::new(io::stderr(), format)
    }

    pub fn stdout(format: LineFormat) -> Self {
        Self::new(io::stdout(), format)
    }

    /// Append to an already opened file. Opening, rotation and retention
    /// stay with the caller.
    pub fn file(file: File, format: LineFormat) -> Self {
        Self::new(file, format)
    }

    pub fn format(&self) -> LineFormat {
        self.format
    }
}

impl Sink for WriterSink {
    fn write_line(&self, site: CallSite, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 48);
        self.format.write_header(&mut buf, site);
        buf.push_str(line);
        if !line.ends_with('\n') {
            buf.push('\n');
        }

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.write_all(buf.as_bytes())?;
        writer.flush()
    }
}

impl fmt::Debug for WriterSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSink")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Sink that accepts and forgets every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl Sink for DiscardSink {
    fn write_line(&self, _site: CallSite, _line: &str) -> io::Result<()> {
        Ok(())
    }
}
