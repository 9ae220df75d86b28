//! Per-level log volume over the same buckets as the error trend

use crate::aggregator::TimeWindow;
use crate::events::{LogEntry, LogLevel, Timestamp};
use crate::trend::buckets::BucketPartition;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeBucket {
    pub label: String,
    pub error_count: usize,
    pub warn_count: usize,
    pub info_count: usize,
    pub debug_count: usize,
}

impl VolumeBucket {
    pub fn total(&self) -> usize {
        self.error_count + self.warn_count + self.info_count + self.debug_count
    }

    fn record(&mut self, level: LogLevel) {
        match level {
            LogLevel::Error => self.error_count += 1,
            LogLevel::Warn => self.warn_count += 1,
            LogLevel::Info => self.info_count += 1,
            LogLevel::Debug => self.debug_count += 1,
        }
    }
}

/// Count entries per level in each bucket of the window, oldest first
pub fn build_volume_timeline<'a, I>(
    entries: I,
    reference: Timestamp,
    window_minutes: u32,
    bucket_count: usize,
) -> Vec<VolumeBucket>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let window = TimeWindow::new(reference, window_minutes);
    let partition = BucketPartition::new(window, bucket_count);
    let selected = window.select(entries);

    partition
        .spans()
        .into_iter()
        .zip(partition.assign(&selected))
        .map(|(span, members)| {
            let mut bucket = VolumeBucket {
                label: span.label,
                error_count: 0,
                warn_count: 0,
                info_count: 0,
                debug_count: 0,
            };
            for windowed in &members {
                bucket.record(windowed.entry.level);
            }
            bucket
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_volume_timeline_counts_levels() {
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap();
        let at = |minutes: i64, level| LogEntry::new(reference - Duration::minutes(minutes), level, "app", "m");
        let entries = vec![
            at(1, LogLevel::Error),
            at(2, LogLevel::Warn),
            at(3, LogLevel::Info),
            at(4, LogLevel::Info),
            at(50, LogLevel::Debug),
        ];

        let timeline = build_volume_timeline(&entries, reference, 60, 8);
        assert_eq!(timeline.len(), 8);

        let latest = &timeline[7];
        assert_eq!(latest.error_count, 1);
        assert_eq!(latest.warn_count, 1);
        assert_eq!(latest.info_count, 2);
        assert_eq!(latest.debug_count, 0);
        assert_eq!(latest.total(), 4);

        // 50 minutes ago falls in the second-oldest 7.5 minute slice
        assert_eq!(timeline[1].debug_count, 1);
        assert_eq!(timeline.iter().map(VolumeBucket::total).sum::<usize>(), 5);
    }
}
