//! Logger and sinks

use crate::record::{Level, Record};
use crate::span::{Span, SpanId};
use std::io::Write;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Log output target
pub trait LogSink: Send + Sync {
    fn write(&self, record: &Record);
}

/// Logger state: level, sinks and the span stack
pub struct Logger {
    level: AtomicU8,
    sinks: Mutex<Vec<Box<dyn LogSink>>>,
    span_stack: Mutex<Vec<Span>>,
    next_span_id: AtomicU64,
}

/// Locks ignoring poisoning; a panicked writer must not silence logging elsewhere.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Logger {
    pub fn new(level: Level) -> Arc<Self> {
        Arc::new(Logger {
            level: AtomicU8::new(level as u8),
            sinks: Mutex::new(Vec::new()),
            span_stack: Mutex::new(Vec::new()),
            next_span_id: AtomicU64::new(1),
        })
    }

    /// Add a sink (builder style)
    pub fn with_sink<S: LogSink + 'static>(self: Arc<Self>, sink: S) -> Arc<Self> {
        self.add_sink(sink);
        self
    }

    pub fn add_sink<S: LogSink + 'static>(&self, sink: S) {
        lock(&self.sinks).push(Box::new(sink));
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or(Level::Info)
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    /// Write a record to every sink. Prefer the macros, they skip formatting when disabled.
    #[inline(never)]
    pub fn log(&self, level: Level, target: &'static str, message: impl Into<String>) {
        if !self.is_enabled(level) {
            return;
        }

        let mut record = Record::new(level, target, message);

        if let Some(span) = lock(&self.span_stack).last() {
            record = record.with_span(span.clone());
        }

        for sink in lock(&self.sinks).iter() {
            sink.write(&record);
        }
    }

    /// Enter a span; it is popped when the guard drops
    pub fn enter_span(self: &Arc<Self>, name: &'static str) -> SpanGuard {
        let id = SpanId(self.next_span_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.span_stack).push(Span::new(id, name));

        SpanGuard {
            logger: Arc::clone(self),
        }
    }

    pub fn span_depth(&self) -> usize {
        lock(&self.span_stack).len()
    }

    /// Logger with no sinks, used as the default everywhere a logger is optional
    pub fn noop() -> Arc<Self> {
        Self::new(Level::Error)
    }
}

pub struct SpanGuard {
    logger: Arc<Logger>,
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        lock(&self.logger.span_stack).pop();
    }
}

pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write(&self, record: &Record) {
        println!("{}", record.format());
    }
}

pub struct StderrSink;

impl LogSink for StderrSink {
    fn write(&self, record: &Record) {
        eprintln!("{}", record.format());
    }
}

/// Append-only file sink
pub struct FileSink {
    file: Mutex<std::fs::File>,
}

impl FileSink {
    pub fn new(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        Ok(FileSink {
            file: Mutex::new(file),
        })
    }
}

impl LogSink for FileSink {
    #[inline(never)]
    fn write(&self, record: &Record) {
        let mut file = lock(&self.file);
        // a failed log write has nowhere to be reported
        let _ = writeln!(file, "{}", record.format());
    }
}
