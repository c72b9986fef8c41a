//! In-memory ring buffer sink

use crate::logger::LogSink;
use crate::record::Record;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RingBufferStats {
    pub record_count: usize,
    /// Records overwritten because the buffer was full
    pub dropped_count: usize,
    pub capacity: usize,
}

#[derive(Default)]
struct Slots {
    records: VecDeque<Record>,
    dropped: usize,
}

/// The most recent `capacity` records, for post-mortem dumps and tests
pub struct LogRingBuffer {
    slots: Mutex<Slots>,
    capacity: usize,
}

impl LogRingBuffer {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(LogRingBuffer {
            slots: Mutex::new(Slots {
                records: VecDeque::with_capacity(capacity),
                dropped: 0,
            }),
            capacity,
        })
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All retained records, oldest first
    pub fn dump_records(&self) -> Vec<Record> {
        self.slots().records.iter().cloned().collect()
    }

    /// Retained records formatted one per line
    pub fn dump(&self) -> String {
        let slots = self.slots();
        let mut out = String::new();
        for (i, record) in slots.records.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&record.format());
        }
        out
    }

    pub fn clear(&self) {
        *self.slots() = Slots::default();
    }

    pub fn stats(&self) -> RingBufferStats {
        let slots = self.slots();
        RingBufferStats {
            record_count: slots.records.len(),
            dropped_count: slots.dropped,
            capacity: self.capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.slots().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots().records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl LogSink for Arc<LogRingBuffer> {
    fn write(&self, record: &Record) {
        let mut slots = self.slots();
        if self.capacity == 0 {
            slots.dropped += 1;
            return;
        }
        if slots.records.len() == self.capacity {
            slots.records.pop_front();
            slots.dropped += 1;
        }
        slots.records.push_back(record.clone());
    }
}
