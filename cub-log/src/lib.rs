//! cub-log - structured logging for the Cub toolchain
//!
//! - **Explicit**: there is no global logger; components receive an `Arc<Logger>`.
//! - **Lazy**: the macros check the level before formatting the message.
//! - **Post-mortem friendly**: a ring buffer sink keeps the last N records.
//!
//! ```
//! use cub_log::{debug, Level, LogRingBuffer, Logger};
//!
//! let ring = LogRingBuffer::new(100);
//! let logger = Logger::new(Level::Debug).with_sink(ring.clone());
//! debug!(logger, "compiled {} instructions", 12);
//! assert_eq!(ring.len(), 1);
//! ```

mod config;
mod logger;
mod macros;
mod record;
mod ring_buffer;
mod span;

pub use config::{LogConfig, OutputConfig};
pub use logger::{FileSink, LogSink, Logger, SpanGuard, StderrSink, StdoutSink};
pub use record::{Level, Record};
pub use ring_buffer::{LogRingBuffer, RingBufferStats};
pub use span::{Span, SpanId};

// trace!, debug!, info!, warn!, error!, log! are exported at the crate root via #[macro_export]

pub type Result<T> = std::result::Result<T, Error>;

/// Logging system errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Error > Level::Warn);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", Error::UnknownLevel("loud".into())),
            "Unknown log level: loud"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }
}
