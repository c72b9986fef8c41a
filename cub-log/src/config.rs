//! One-call logger setup

use crate::logger::{FileSink, StderrSink, StdoutSink};
use crate::{Level, LogRingBuffer, Logger};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum OutputConfig {
    Stdout,
    Stderr,
    /// Append to the file at this path
    File(String),
    /// Keep the last N records in memory
    RingBuffer(usize),
}

/// Logger configuration
///
/// ```
/// use cub_log::{LogConfig, Level};
///
/// let (logger, ring) = LogConfig::new(Level::Debug).with_ring_buffer(100).init();
/// assert!(ring.is_some());
/// assert_eq!(logger.level(), Level::Debug);
/// ```
#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: Level,
    pub outputs: Vec<OutputConfig>,
}

impl LogConfig {
    pub fn new(level: Level) -> Self {
        LogConfig {
            level,
            outputs: Vec::new(),
        }
    }

    /// Debug level to stderr, with a crash ring buffer
    pub fn dev() -> Self {
        LogConfig {
            level: Level::Debug,
            outputs: vec![OutputConfig::Stderr, OutputConfig::RingBuffer(10000)],
        }
    }

    /// Silent
    pub fn test() -> Self {
        LogConfig::new(Level::Error)
    }

    pub fn with_stdout(mut self) -> Self {
        if !self.outputs.contains(&OutputConfig::Stdout) {
            self.outputs.push(OutputConfig::Stdout);
        }
        self
    }

    pub fn with_stderr(mut self) -> Self {
        if !self.outputs.contains(&OutputConfig::Stderr) {
            self.outputs.push(OutputConfig::Stderr);
        }
        self
    }

    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.outputs.push(OutputConfig::File(path.into()));
        self
    }

    pub fn with_ring_buffer(mut self, capacity: usize) -> Self {
        self.outputs.push(OutputConfig::RingBuffer(capacity));
        self
    }

    /// Build the logger. Returns the ring buffer too when one was configured.
    pub fn init(self) -> (Arc<Logger>, Option<Arc<LogRingBuffer>>) {
        self.try_init().unwrap_or_else(|_| (Logger::noop(), None))
    }

    /// Like `init`, but fails when a file output cannot be opened
    pub fn try_init(self) -> crate::Result<(Arc<Logger>, Option<Arc<LogRingBuffer>>)> {
        let logger = Logger::new(self.level);
        let mut ring_buffer = None;

        for output in self.outputs {
            match output {
                OutputConfig::Stdout => logger.add_sink(StdoutSink),
                OutputConfig::Stderr => logger.add_sink(StderrSink),
                OutputConfig::File(path) => logger.add_sink(FileSink::new(&path)?),
                OutputConfig::RingBuffer(capacity) => {
                    let ring = LogRingBuffer::new(capacity);
                    ring_buffer = Some(Arc::clone(&ring));
                    logger.add_sink(ring);
                }
            }
        }

        Ok((logger, ring_buffer))
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig::new(Level::Info)
    }
}
