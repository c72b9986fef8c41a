//! Log records

use crate::span::Span;
use std::fmt;
use std::str::FromStr;

/// Log level
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Level::Trace),
            1 => Some(Level::Debug),
            2 => Some(Level::Info),
            3 => Some(Level::Warn),
            4 => Some(Level::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Level {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" => Ok(Level::Warn),
            "error" | "silent" => Ok(Level::Error),
            _ => Err(crate::Error::UnknownLevel(s.to_string())),
        }
    }
}

/// A single log record
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Milliseconds since the unix epoch
    pub timestamp_ms: u64,
    pub level: Level,
    /// Module path of the call site
    pub target: &'static str,
    pub message: String,
    /// Innermost span active when the record was written
    pub span: Option<Span>,
}

impl Record {
    pub fn new(level: Level, target: &'static str, message: impl Into<String>) -> Self {
        Self {
            timestamp_ms: current_timestamp_ms(),
            level,
            target,
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Name of the enclosing span, if any
    pub fn span_name(&self) -> Option<&'static str> {
        self.span.as_ref().map(|span| span.name)
    }

    pub fn format(&self) -> String {
        let span_info = match &self.span {
            Some(span) => format!(" [{}#{}]", span.name, span.id.0),
            None => String::new(),
        };

        format!(
            "[{}] {} {}{}: {}",
            format_timestamp(self.timestamp_ms),
            self.level,
            self.target,
            span_info,
            self.message
        )
    }
}

fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Render as `HH:MM:SS.mmm` (UTC, time of day only)
fn format_timestamp(timestamp_ms: u64) -> String {
    let secs = timestamp_ms / 1000;
    let millis = timestamp_ms % 1000;

    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;

    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SpanId;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_level_from_u8() {
        assert_eq!(Level::from_u8(0), Some(Level::Trace));
        assert_eq!(Level::from_u8(4), Some(Level::Error));
        assert_eq!(Level::from_u8(5), None);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("debug".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("silent".parse::<Level>().unwrap(), Level::Error);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_record_with_span() {
        let record = Record::new(Level::Debug, "test", "msg").with_span(Span::new(SpanId(42), "vm"));
        assert_eq!(record.span.as_ref().map(|s| s.id), Some(SpanId(42)));
        assert_eq!(record.span_name(), Some("vm"));
        assert_eq!(Record::new(Level::Debug, "test", "msg").span_name(), None);
    }

    #[test]
    fn test_record_format() {
        let record = Record {
            timestamp_ms: 3600000 + 120000 + 3000 + 456,
            level: Level::Info,
            target: "cub::parser",
            message: String::from("parsed 3 nodes"),
            span: Some(Span::new(SpanId(7), "parser")),
        };

        let formatted = record.format();
        assert!(formatted.starts_with("[01:02:03.456]"));
        assert!(formatted.contains("INFO"));
        assert!(formatted.contains("cub::parser"));
        assert!(formatted.contains("parsed 3 nodes"));
        assert!(formatted.contains("[parser#7]"));
    }
}
