//! Error-rate trend over a bucketed window

use crate::aggregator::{percentage, TimeWindow};
use crate::classification::{TrendDirection, TrendStatus, TrendThresholds};
use crate::events::{LogEntry, Timestamp};
use crate::trend::buckets::BucketPartition;
use serde::Serialize;

/// Error-rate metrics for one time slice of the trend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendBucket {
    pub label: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub total_count: usize,
    pub error_count: usize,
    pub error_rate: f64,
    pub status: TrendStatus,
}

/// Summary of a trend: its buckets plus the current reading and direction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorTrend {
    /// Buckets, oldest first
    pub buckets: Vec<TrendBucket>,
    pub current_error_rate: f64,
    pub current_errors: usize,
    pub current_status: TrendStatus,
    pub previous_error_rate: f64,
    pub direction: TrendDirection,
    pub peak_error_rate: f64,
}

/// Build `bucket_count` error-rate buckets over the window ending at `reference`
///
/// Buckets come back oldest first. Entries with unparseable timestamps are
/// skipped.
pub fn build_trend<'a, I>(
    entries: I,
    reference: Timestamp,
    window_minutes: u32,
    bucket_count: usize,
    thresholds: &TrendThresholds,
) -> Vec<TrendBucket>
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
            let total_count = members.len();
            let error_count = members.iter().filter(|w| w.entry.is_error()).count();
            let error_rate = percentage(error_count, total_count);

            TrendBucket {
                label: span.label,
                start: span.start,
                end: span.end,
                total_count,
                error_count,
                error_rate,
                status: thresholds.classify(error_rate),
            }
        })
        .collect()
}

impl ErrorTrend {
    /// Summarize oldest-first buckets
    ///
    /// Missing current or previous buckets read as a zero error rate.
    pub fn from_buckets(buckets: Vec<TrendBucket>) -> Self {
        let current = buckets.last();
        let current_error_rate = current.map_or(0.0, |b| b.error_rate);
        let current_errors = current.map_or(0, |b| b.error_count);
        let current_status = current.map_or(TrendStatus::Normal, |b| b.status);
        let previous_error_rate = buckets
            .len()
            .checked_sub(2)
            .map_or(0.0, |index| buckets[index].error_rate);
        let peak_error_rate = buckets.iter().map(|b| b.error_rate).fold(0.0, f64::max);

        Self {
            direction: TrendDirection::between(previous_error_rate, current_error_rate),
            buckets,
            current_error_rate,
            current_errors,
            current_status,
            previous_error_rate,
            peak_error_rate,
        }
    }
}
