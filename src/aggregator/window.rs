//! Time-window selection over buffered log entries
//!
//! A window is a reference instant plus a length in minutes. An entry belongs to
//! the window when its age relative to the reference lies in `[0, length)`.

use crate::error::TimestampError;
use crate::events::{LogEntry, Timestamp};
use log::debug;
use serde::{Deserialize, Serialize};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// How a view picks the instant its window ends at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// Window ends at the current wall-clock time
    #[default]
    WallClock,
    /// Window ends at the newest buffered timestamp, so a lagging feed still
    /// yields a meaningful "recent" window
    LatestLog,
}

impl ReferencePolicy {
    /// Resolve the reference instant for a set of entries
    ///
    /// Returns `None` under [`ReferencePolicy::LatestLog`] when no entry has a
    /// parseable timestamp.
    pub fn resolve<'a, I>(&self, entries: I, now: Timestamp) -> Option<Timestamp>
    where
        I: IntoIterator<Item = &'a LogEntry>,
    {
        match self {
            ReferencePolicy::WallClock => Some(now),
            ReferencePolicy::LatestLog => entries
                .into_iter()
                .filter_map(|entry| entry.parsed_timestamp().ok())
                .max(),
        }
    }
}

/// A log entry selected into a window, with its parsed timestamp and age
#[derive(Debug, Clone, Copy)]
pub struct WindowedEntry<'a> {
    pub entry: &'a LogEntry,
    pub timestamp: Timestamp,
    /// Milliseconds between the entry and the window's reference instant
    pub age_ms: i64,
}

/// A window of `minutes` ending at `reference`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub reference: Timestamp,
    pub minutes: u32,
}

impl TimeWindow {
    pub fn new(reference: Timestamp, minutes: u32) -> Self {
        Self { reference, minutes }
    }

    /// Build a window whose reference instant follows `policy`
    pub fn resolve<'a, I>(
        policy: ReferencePolicy,
        entries: I,
        now: Timestamp,
        minutes: u32,
    ) -> Option<Self>
    where
        I: IntoIterator<Item = &'a LogEntry>,
    {
        policy
            .resolve(entries, now)
            .map(|reference| Self::new(reference, minutes))
    }

    /// Window length in milliseconds
    pub fn length_ms(&self) -> i64 {
        i64::from(self.minutes) * MILLIS_PER_MINUTE
    }

    /// Age of `timestamp` relative to the reference instant
    pub fn age_ms(&self, timestamp: Timestamp) -> i64 {
        (self.reference - timestamp).num_milliseconds()
    }

    /// Whether `timestamp` falls inside the window
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        let age = self.age_ms(timestamp);
        age >= 0 && age < self.length_ms()
    }

    /// Select the entries inside the window, failing on the first bad timestamp
    pub fn try_select<'a, I>(&self, entries: I) -> Result<Vec<WindowedEntry<'a>>, TimestampError>
    where
        I: IntoIterator<Item = &'a LogEntry>,
    {
        let mut selected = Vec::new();
        for entry in entries {
            let timestamp = entry.parsed_timestamp()?;
            if let Some(windowed) = self.admit(entry, timestamp) {
                selected.push(windowed);
            }
        }
        Ok(selected)
    }

    /// Select the entries inside the window, skipping unparseable timestamps
    pub fn select<'a, I>(&self, entries: I) -> Vec<WindowedEntry<'a>>
    where
        I: IntoIterator<Item = &'a LogEntry>,
    {
        entries
            .into_iter()
            .filter_map(|entry| match entry.parsed_timestamp() {
                Ok(timestamp) => self.admit(entry, timestamp),
                Err(e) => {
                    debug!("Skipping entry from window: {}", e);
                    None
                }
            })
            .collect()
    }

    fn admit<'a>(&self, entry: &'a LogEntry, timestamp: Timestamp) -> Option<WindowedEntry<'a>> {
        let age_ms = self.age_ms(timestamp);
        (age_ms >= 0 && age_ms < self.length_ms()).then_some(WindowedEntry {
            entry,
            timestamp,
            age_ms,
        })
    }
}

/// Select the entries of `entries` within `window_minutes` before `reference`
///
/// Fails fast with the first timestamp that cannot be parsed.
pub fn select_window<'a, I>(
    entries: I,
    reference: Timestamp,
    window_minutes: u32,
) -> Result<Vec<&'a LogEntry>, TimestampError>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    Ok(TimeWindow::new(reference, window_minutes)
        .try_select(entries)?
        .into_iter()
        .map(|windowed| windowed.entry)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LogLevel;
    use chrono::{Duration, TimeZone, Utc};

    fn reference() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn entry_at(offset: Duration) -> LogEntry {
        LogEntry::new(reference() - offset, LogLevel::Info, "app", "message")
    }

    #[test]
    fn test_window_bounds_are_half_open() {
        let window = TimeWindow::new(reference(), 10);

        assert!(window.contains(reference()));
        assert!(window.contains(reference() - Duration::minutes(10) + Duration::milliseconds(1)));
        assert!(!window.contains(reference() - Duration::minutes(10)));
        assert!(!window.contains(reference() + Duration::milliseconds(1)));
    }

    #[test]
    fn test_select_window_filters_entries() {
        let entries = vec![
            entry_at(Duration::minutes(1)),
            entry_at(Duration::minutes(59)),
            entry_at(Duration::minutes(60)),
            entry_at(Duration::minutes(-1)),
        ];

        let selected = select_window(&entries, reference(), 60).unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_select_window_empty_input() {
        let entries: Vec<LogEntry> = Vec::new();
        assert!(select_window(&entries, reference(), 60).unwrap().is_empty());
    }

    #[test]
    fn test_strict_selection_surfaces_bad_timestamp() {
        let mut bad = entry_at(Duration::minutes(1));
        bad.timestamp = "31/12/2024".to_string();
        let entries = vec![entry_at(Duration::minutes(2)), bad];

        let err = select_window(&entries, reference(), 60).unwrap_err();
        assert_eq!(err.value, "31/12/2024");
    }

    #[test]
    fn test_lenient_selection_skips_bad_timestamp() {
        let mut bad = entry_at(Duration::minutes(1));
        bad.timestamp = "31/12/2024".to_string();
        let entries = vec![entry_at(Duration::minutes(2)), bad];

        let selected = TimeWindow::new(reference(), 60).select(&entries);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].age_ms, 120_000);
    }

    #[test]
    fn test_reference_policies() {
        let entries = vec![
            entry_at(Duration::hours(3)),
            entry_at(Duration::hours(2)),
        ];
        let now = reference();

        assert_eq!(ReferencePolicy::WallClock.resolve(&entries, now), Some(now));
        assert_eq!(
            ReferencePolicy::LatestLog.resolve(&entries, now),
            Some(now - Duration::hours(2))
        );

        let empty: Vec<LogEntry> = Vec::new();
        assert_eq!(ReferencePolicy::LatestLog.resolve(&empty, now), None);
    }

    #[test]
    fn test_latest_log_policy_keeps_stale_data_visible() {
        let entries = vec![entry_at(Duration::hours(5)), entry_at(Duration::hours(5) + Duration::minutes(3))];
        let now = reference();

        let wall = TimeWindow::resolve(ReferencePolicy::WallClock, &entries, now, 30).unwrap();
        assert!(wall.select(&entries).is_empty());

        let latest = TimeWindow::resolve(ReferencePolicy::LatestLog, &entries, now, 30).unwrap();
        assert_eq!(latest.select(&entries).len(), 2);
    }

    #[test]
    fn test_reference_policy_config_names() {
        let policy: ReferencePolicy = serde_json::from_str("\"latest_log\"").unwrap();
        assert_eq!(policy, ReferencePolicy::LatestLog);
        assert_eq!(
            serde_json::to_string(&ReferencePolicy::WallClock).unwrap(),
            "\"wall_clock\""
        );
    }
}

// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::events::LogLevel;
    use chrono::{Duration, TimeZone, Utc};
    use quickcheck_macros::quickcheck;

    // Every selected entry lies inside the window and every excluded one outside
    #[quickcheck]
    fn prop_selection_matches_window_bounds(offsets_seconds: Vec<i32>, minutes: u8) -> bool {
        let minutes = u32::from(minutes % 180) + 1;
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let entries: Vec<LogEntry> = offsets_seconds
            .iter()
            .map(|offset| {
                LogEntry::new(
                    reference - Duration::seconds(i64::from(*offset % 20_000)),
                    LogLevel::Info,
                    "app",
                    "m",
                )
            })
            .collect();

        let window = TimeWindow::new(reference, minutes);
        let selected = window.select(&entries);
        let window_ms = i64::from(minutes) * 60_000;

        let inside = selected
            .iter()
            .all(|w| w.age_ms >= 0 && w.age_ms < window_ms);
        let expected = entries
            .iter()
            .filter(|e| {
                let age = window.age_ms(e.parsed_timestamp().unwrap());
                age >= 0 && age < window_ms
            })
            .count();

        inside && selected.len() == expected
    }
}
