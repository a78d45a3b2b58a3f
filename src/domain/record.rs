//! Call sites, structured fields and line formatting.

use crate::domain::severity::{Severity, COLOR_RESET};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;

/// Where a log call came from.
///
/// `depth` is the caller-maintained frame count used by sinks that report
/// source positions by skipping frames; every wrapper that forwards a call
/// adds one. `location` is resolved through `#[track_caller]` and is always
/// the user's call site, however many wrappers were crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub depth: usize,
    pub location: &'static Location<'static>,
}

impl CallSite {
    /// Call site of whoever called the function this is invoked from.
    #[track_caller]
    pub fn here(depth: usize) -> Self {
        Self {
            depth,
            location: Location::caller(),
        }
    }

    /// The same site seen through one more wrapper frame.
    pub fn deeper(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }

    /// File name without directories.
    pub fn short_file(&self) -> &'static str {
        let file = self.location.file();
        file.rsplit(['/', '\\']).next().unwrap_or(file)
    }
}

/// Value of a structured field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(Cow<'static, str>),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::I64(v) => write!(f, "{}", v),
            FieldValue::U64(v) => write!(f, "{}", v),
            FieldValue::F64(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<&'static str> for FieldValue {
    fn from(value: &'static str) -> Self {
        FieldValue::Str(Cow::Borrowed(value))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(Cow::Owned(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::F64(value)
    }
}

macro_rules! signed_field_value {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(value: $t) -> Self {
                FieldValue::I64(value as i64)
            }
        })*
    };
}

macro_rules! unsigned_field_value {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(value: $t) -> Self {
                FieldValue::U64(value as u64)
            }
        })*
    };
}

signed_field_value!(i8, i16, i32, i64, isize);
unsigned_field_value!(u8, u16, u32, u64, usize);

/// Structured fields attached to a call, ordered by name.
pub type Fields = BTreeMap<Cow<'static, str>, FieldValue>;

/// `key=value` pairs separated by spaces.
pub struct DisplayFields<'a>(pub &'a Fields);

impl fmt::Display for DisplayFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Replace every `\n` with the two characters `\` `n`.
///
/// Lossy: an escaped message cannot be told apart from one that already
/// contained a literal backslash followed by `n`.
pub fn escape_newlines(message: &str) -> Cow<'_, str> {
    if message.contains('\n') {
        Cow::Owned(message.replace('\n', "\\n"))
    } else {
        Cow::Borrowed(message)
    }
}

/// Build `<prefix><tag><message><reset>` for the standard sinks.
///
/// In color mode the tag is replaced by the level's color sequence and the
/// line is terminated by a reset; otherwise the reset is empty.
pub fn format_line(prefix: &str, level: Severity, message: &str, color: bool) -> String {
    let (tag, reset) = if color {
        (level.color(), COLOR_RESET)
    } else {
        (level.tag(), "")
    };
    let mut line = String::with_capacity(prefix.len() + tag.len() + message.len() + reset.len());
    line.push_str(prefix);
    line.push_str(tag);
    line.push_str(message);
    line.push_str(reset);
    line
}
