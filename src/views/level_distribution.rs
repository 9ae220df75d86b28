use crate::aggregator::{percentage, TimeWindow};
use crate::events::{LogEntry, LogLevel, LogStats};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelShare {
    pub level: LogLevel,
    pub count: usize,
    pub percentage: f64,
}

/// Count and share of each log level, in [`LogLevel::ALL`] order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelDistribution {
    pub total: usize,
    pub levels: Vec<LevelShare>,
}

impl LevelDistribution {
    /// Distribution from the feed's own totals snapshot
    pub fn from_stats(stats: &LogStats) -> Self {
        let counts = [
            stats.error_count,
            stats.warn_count,
            stats.info_count,
            stats.debug_count,
        ]
        .map(|count| usize::try_from(count).unwrap_or(usize::MAX));
        Self::from_counts(counts)
    }

    /// Distribution over the buffered entries inside `window`
    pub fn from_entries<'a, I>(entries: I, window: &TimeWindow) -> Self
    where
        I: IntoIterator<Item = &'a LogEntry>,
    {
        let mut counts = [0usize; 4];
        for windowed in window.select(entries) {
            counts[level_index(windowed.entry.level)] += 1;
        }
        Self::from_counts(counts)
    }

    fn from_counts(counts: [usize; 4]) -> Self {
        let total = counts.iter().fold(0usize, |sum, &count| sum.saturating_add(count));
        let levels = LogLevel::ALL
            .iter()
            .zip(counts)
            .map(|(level, count)| LevelShare {
                level: *level,
                count,
                percentage: percentage(count, total),
            })
            .collect();

        Self { total, levels }
    }
}

fn level_index(level: LogLevel) -> usize {
    match level {
        LogLevel::Error => 0,
        LogLevel::Warn => 1,
        LogLevel::Info => 2,
        LogLevel::Debug => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_distribution_from_stats() {
        let stats = LogStats {
            total_logs: 10,
            error_count: 1,
            warn_count: 2,
            info_count: 5,
            debug_count: 2,
            ..LogStats::default()
        };
        let distribution = LevelDistribution::from_stats(&stats);

        assert_eq!(distribution.total, 10);
        assert_eq!(distribution.levels[0].level, LogLevel::Error);
        assert_eq!(distribution.levels[0].percentage, 10.0);
        assert_eq!(distribution.levels[2].percentage, 50.0);
    }

    #[test]
    fn test_huge_feed_counts_saturate_total() {
        let stats: LogStats = serde_json::from_str(r#"{"errorCount":18446744073709551615,"warnCount":1}"#).unwrap();
        let distribution = LevelDistribution::from_stats(&stats);

        assert_eq!(distribution.total, usize::MAX);
        assert_eq!(distribution.levels[0].percentage, 100.0);
        assert_eq!(distribution.levels[1].count, 1);
    }

    #[test]
    fn test_all_zero_totals_give_zero_percentages() {
        let distribution = LevelDistribution::from_stats(&LogStats::default());
        assert_eq!(distribution.total, 0);
        assert!(distribution.levels.iter().all(|share| share.percentage == 0.0));
    }

    #[test]
    fn test_distribution_from_entries() {
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let entries = vec![
            LogEntry::new(reference, LogLevel::Debug, "app", "m"),
            LogEntry::new(reference, LogLevel::Debug, "app", "m"),
            LogEntry::new(reference, LogLevel::Error, "app", "m"),
            LogEntry::new(reference, LogLevel::Info, "app", "m"),
        ];
        let distribution = LevelDistribution::from_entries(&entries, &TimeWindow::new(reference, 60));

        assert_eq!(distribution.total, 4);
        assert_eq!(distribution.levels[3].count, 2);
        assert_eq!(distribution.levels[3].percentage, 50.0);
        assert_eq!(distribution.levels[1].count, 0);
    }
}
