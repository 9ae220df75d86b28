//! Grouping and per-group aggregation of windowed entries

use crate::aggregator::window::WindowedEntry;
use crate::events::{LogEntry, LogLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// Length of the trailing sub-window used for recent activity
pub const RECENT_ACTIVITY_MINUTES: u32 = 5;

/// Group windowed entries by a key derived from each entry
///
/// Groups come back in the order their key was first seen.
pub fn group_by<'a, K, F>(entries: &[WindowedEntry<'a>], key_fn: F) -> Vec<(K, Vec<WindowedEntry<'a>>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&LogEntry) -> K,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<WindowedEntry<'a>>)> = Vec::new();

    for windowed in entries {
        let key = key_fn(windowed.entry);
        match positions.get(&key) {
            Some(&index) => groups[index].1.push(*windowed),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, vec![*windowed]));
            }
        }
    }

    groups
}

/// Counts and rates computed over one group of windowed entries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMetrics {
    pub total_logs: usize,
    pub error_count: usize,
    pub warn_count: usize,
    /// Percentage of the group's entries at ERROR level (0-100)
    pub error_rate: f64,
    /// Entries per minute over the whole window
    pub log_frequency: f64,
    /// Entries inside the trailing recent-activity sub-window
    pub recent_activity: usize,
}

impl GroupMetrics {
    /// Compute metrics for a group selected from a window of `window_minutes`
    pub fn compute(entries: &[WindowedEntry<'_>], window_minutes: u32) -> Self {
        let total_logs = entries.len();
        let error_count = count_level(entries, LogLevel::Error);
        let warn_count = count_level(entries, LogLevel::Warn);

        let recent_ms = i64::from(RECENT_ACTIVITY_MINUTES.min(window_minutes)) * 60_000;
        let recent_activity = entries.iter().filter(|w| w.age_ms < recent_ms).count();

        let log_frequency = if window_minutes > 0 {
            total_logs as f64 / f64::from(window_minutes)
        } else {
            0.0
        };

        Self {
            total_logs,
            error_count,
            warn_count,
            error_rate: percentage(error_count, total_logs),
            log_frequency,
            recent_activity,
        }
    }
}

/// `part / whole * 100`, or 0 when `whole` is 0
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn count_level(entries: &[WindowedEntry<'_>], level: LogLevel) -> usize {
    entries.iter().filter(|w| w.entry.level == level).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::window::TimeWindow;
    use chrono::{Duration, TimeZone, Utc};

    fn sample_entries() -> Vec<LogEntry> {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        vec![
            LogEntry::new(base, LogLevel::Error, "A", "boom"),
            LogEntry::new(base + Duration::milliseconds(1), LogLevel::Info, "A", "ok"),
            LogEntry::new(base + Duration::milliseconds(2), LogLevel::Error, "B", "boom"),
        ]
    }

    #[test]
    fn test_group_by_application() {
        let entries = sample_entries();
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::milliseconds(2);
        let window = TimeWindow::new(reference, 60);
        let selected = window.select(&entries);

        let groups = group_by(&selected, |e| e.application_name.clone());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "A");
        assert_eq!(groups[1].0, "B");

        let a = GroupMetrics::compute(&groups[0].1, 60);
        assert_eq!(a.total_logs, 2);
        assert_eq!(a.error_count, 1);
        assert_eq!(a.error_rate, 50.0);

        let b = GroupMetrics::compute(&groups[1].1, 60);
        assert_eq!(b.total_logs, 1);
        assert_eq!(b.error_count, 1);
        assert_eq!(b.error_rate, 100.0);
    }

    #[test]
    fn test_empty_group_has_zero_rates() {
        let metrics = GroupMetrics::compute(&[], 30);
        assert_eq!(metrics.total_logs, 0);
        assert_eq!(metrics.error_rate, 0.0);
        assert_eq!(metrics.log_frequency, 0.0);
        assert_eq!(metrics.recent_activity, 0);
    }

    #[test]
    fn test_zero_minute_window_has_zero_frequency() {
        let entries = sample_entries();
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::milliseconds(2);
        let selected = TimeWindow::new(reference, 60).select(&entries);
        assert_eq!(selected.len(), 3);
        assert_eq!(GroupMetrics::compute(&selected, 0).log_frequency, 0.0);
    }

    #[test]
    fn test_recent_activity_counts_trailing_five_minutes() {
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let entries = vec![
            LogEntry::new(reference - Duration::minutes(1), LogLevel::Info, "A", "x"),
            LogEntry::new(reference - Duration::minutes(4), LogLevel::Info, "A", "x"),
            LogEntry::new(reference - Duration::minutes(5), LogLevel::Info, "A", "x"),
            LogEntry::new(reference - Duration::minutes(20), LogLevel::Warn, "A", "x"),
        ];
        let selected = TimeWindow::new(reference, 30).select(&entries);
        let metrics = GroupMetrics::compute(&selected, 30);

        assert_eq!(metrics.total_logs, 4);
        assert_eq!(metrics.recent_activity, 2);
        assert_eq!(metrics.warn_count, 1);
        assert!((metrics.log_frequency - 4.0 / 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percentage_guards_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
    }
}

// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::aggregator::window::TimeWindow;
    use chrono::{Duration, TimeZone, Utc};
    use quickcheck_macros::quickcheck;

    // Error rates stay within 0-100 and group totals add up to the window total
    #[quickcheck]
    fn prop_group_metrics_are_bounded(levels: Vec<(u8, u8)>) -> bool {
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let entries: Vec<LogEntry> = levels
            .iter()
            .enumerate()
            .map(|(i, (level, app))| {
                LogEntry::new(
                    reference - Duration::seconds(i as i64),
                    LogLevel::ALL[(*level % 4) as usize],
                    format!("app-{}", app % 5),
                    "m",
                )
            })
            .collect();

        let selected = TimeWindow::new(reference, 120).select(&entries);
        let groups = group_by(&selected, |e| e.application_name.clone());

        let mut total = 0;
        for (_, group) in &groups {
            let metrics = GroupMetrics::compute(group, 120);
            if !(0.0..=100.0).contains(&metrics.error_rate) {
                return false;
            }
            total += metrics.total_logs;
        }

        total == selected.len()
    }
}
