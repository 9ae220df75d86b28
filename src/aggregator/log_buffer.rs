//! Bounded log buffer
//!
//! This module provides the LogBuffer which keeps the most recent log entries
//! delivered by the feed, newest first, under a fixed capacity.

use crate::events::{LogEntry, Timestamp};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

/// Maximum number of entries kept by the dashboard
pub const DEFAULT_CAPACITY: usize = 1000;

/// Bounded buffer of log entries ordered newest first
///
/// New batches are placed in front of existing entries and the oldest entries
/// beyond `capacity` are dropped. Overflow is silent truncation, not a failure.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    /// Buffered entries, index 0 is the most recent arrival
    entries: VecDeque<LogEntry>,
    /// Maximum number of entries to keep
    capacity: usize,
}

impl LogBuffer {
    /// Create a buffer with the default capacity of 1000 entries
    ///
    /// # Examples
    ///
    /// ```
    /// use logpulse::aggregator::LogBuffer;
    ///
    /// let buffer = LogBuffer::new();
    /// assert_eq!(buffer.capacity(), 1000);
    /// assert!(buffer.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer holding at most `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend a batch of new entries
    ///
    /// The batch is expected newest first, as the feed delivers it. After the
    /// batch is placed in front of the existing entries the buffer is truncated
    /// back to capacity, dropping the oldest entries.
    ///
    /// # Arguments
    ///
    /// * `batch` - New entries, most recent first
    pub fn append(&mut self, batch: Vec<LogEntry>) {
        for entry in batch.into_iter().rev() {
            self.entries.push_front(entry);
        }
        self.enforce_capacity();
    }

    /// Prepend a single new entry
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.enforce_capacity();
    }

    /// Replace the whole buffer with `batch` (newest first)
    pub fn replace(&mut self, batch: Vec<LogEntry>) {
        self.entries = VecDeque::from(batch);
        self.enforce_capacity();
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate over the entries, newest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Copy the buffered entries into a contiguous vector, newest first
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Latest parseable timestamp among the buffered entries
    pub fn latest_timestamp(&self) -> Option<Timestamp> {
        self.entries
            .iter()
            .filter_map(|entry| entry.parsed_timestamp().ok())
            .max()
    }

    /// Drop the oldest entries until the buffer fits its capacity
    fn enforce_capacity(&mut self) {
        self.entries.truncate(self.capacity);
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Log buffer shared between threads
///
/// A single writer mutates the buffer while readers take a consistent copy of
/// it, so every derived computation runs over a snapshot that is never torn by
/// a concurrent append or clear.
#[derive(Debug, Clone, Default)]
pub struct SharedLogBuffer {
    inner: Arc<RwLock<LogBuffer>>,
}

impl SharedLogBuffer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self {
            inner: Arc::new(RwLock::new(buffer)),
        }
    }

    pub fn append(&self, batch: Vec<LogEntry>) {
        self.write(|buffer| buffer.append(batch));
    }

    pub fn replace(&self, batch: Vec<LogEntry>) {
        self.write(|buffer| buffer.replace(batch));
    }

    pub fn clear(&self) {
        self.write(LogBuffer::clear);
    }

    pub fn len(&self) -> usize {
        self.read(LogBuffer::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read(LogBuffer::is_empty)
    }

    /// Take a copy of the buffer as it is right now
    pub fn snapshot(&self) -> LogBuffer {
        self.read(LogBuffer::clone)
    }

    fn read<T>(&self, f: impl FnOnce(&LogBuffer) -> T) -> T {
        // A panicking writer cannot leave the buffer half-updated: every
        // mutation is a single call on the inner LogBuffer.
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&*guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut LogBuffer) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::events::LogLevel;
    use chrono::Utc;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    /// Generate a buffer capacity (1-100)
    #[derive(Debug, Clone)]
    struct BufferCapacity(usize);

    impl Arbitrary for BufferCapacity {
        fn arbitrary(g: &mut Gen) -> Self {
            BufferCapacity((u8::arbitrary(g) % 100 + 1) as usize)
        }
    }

    /// Generate a sequence of batch sizes (each 0-20)
    #[derive(Debug, Clone)]
    struct BatchSizes(Vec<usize>);

    impl Arbitrary for BatchSizes {
        fn arbitrary(g: &mut Gen) -> Self {
            let batches = usize::arbitrary(g) % 30 + 1;
            BatchSizes(
                (0..batches)
                    .map(|_| (u8::arbitrary(g) % 21) as usize)
                    .collect(),
            )
        }
    }

    // The buffer never exceeds capacity and always holds the newest arrivals
    #[quickcheck]
    fn prop_buffer_enforces_capacity_and_keeps_newest(
        capacity: BufferCapacity,
        batches: BatchSizes,
    ) -> bool {
        let mut buffer = LogBuffer::with_capacity(capacity.0);
        let mut sequence = 0usize;

        for size in &batches.0 {
            // Feed batches are newest first
            let batch: Vec<LogEntry> = (0..*size)
                .map(|offset| {
                    LogEntry::new(
                        Utc::now(),
                        LogLevel::Info,
                        "app",
                        (sequence + size - 1 - offset).to_string(),
                    )
                })
                .collect();
            sequence += size;
            buffer.append(batch);

            if buffer.len() > capacity.0 {
                return false;
            }
        }

        let expected: Vec<String> = (0..sequence)
            .rev()
            .take(capacity.0)
            .map(|n| n.to_string())
            .collect();
        let actual: Vec<String> = buffer.iter().map(|e| e.message.clone()).collect();

        actual == expected
    }
}
