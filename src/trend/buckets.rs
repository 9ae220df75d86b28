//! Partition of a time window into equal sub-intervals

use crate::aggregator::{TimeWindow, WindowedEntry};
use crate::events::Timestamp;
use chrono::Duration;

/// Number of buckets in every trend chart
pub const TREND_BUCKET_COUNT: usize = 8;

/// Format of bucket labels (24h clock, UTC)
const LABEL_FORMAT: &str = "%H:%M";

/// Time range covered by one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpan {
    /// Oldest instant covered, inclusive in age terms
    pub start: Timestamp,
    /// Newest instant covered
    pub end: Timestamp,
    /// Bucket midpoint as `HH:MM`
    pub label: String,
}

/// Partition of a window into `count` buckets of width `window / count`
///
/// Buckets are defined on entry age: bucket `i` counted from the newest holds
/// ages in `[i·Δ, (i+1)·Δ)`, and the oldest bucket absorbs any remainder of an
/// uneven division, so the buckets tile `[0, window)` with no gap or overlap.
#[derive(Debug, Clone, Copy)]
pub struct BucketPartition {
    window: TimeWindow,
    count: usize,
    width_ms: i64,
}

impl BucketPartition {
    pub fn new(window: TimeWindow, count: usize) -> Self {
        let count = count.max(1);
        let width_ms = (window.length_ms() / count as i64).max(1);
        Self {
            window,
            count,
            width_ms,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn width_ms(&self) -> i64 {
        self.width_ms
    }

    /// Oldest-first bucket index for an age, or `None` outside the window
    pub fn index_for_age(&self, age_ms: i64) -> Option<usize> {
        if age_ms < 0 || age_ms >= self.window.length_ms() {
            return None;
        }
        let from_newest = ((age_ms / self.width_ms) as usize).min(self.count - 1);
        Some(self.count - 1 - from_newest)
    }

    /// Bucket spans, oldest first
    pub fn spans(&self) -> Vec<BucketSpan> {
        let reference = self.window.reference;
        let window_ms = self.window.length_ms();

        (0..self.count)
            .rev()
            .map(|from_newest| {
                let newest_age = from_newest as i64 * self.width_ms;
                let oldest_age = if from_newest == self.count - 1 {
                    window_ms.max(newest_age + self.width_ms)
                } else {
                    newest_age + self.width_ms
                };
                let end = reference - Duration::milliseconds(newest_age);
                let midpoint = end - Duration::milliseconds(self.width_ms / 2);

                BucketSpan {
                    start: reference - Duration::milliseconds(oldest_age),
                    end,
                    label: midpoint.format(LABEL_FORMAT).to_string(),
                }
            })
            .collect()
    }

    /// Distribute windowed entries into buckets, oldest first
    pub fn assign<'a>(&self, entries: &[WindowedEntry<'a>]) -> Vec<Vec<WindowedEntry<'a>>> {
        let mut buckets = vec![Vec::new(); self.count];
        for windowed in entries {
            if let Some(index) = self.index_for_age(windowed.age_ms) {
                buckets[index].push(*windowed);
            }
        }
        buckets
    }
}
