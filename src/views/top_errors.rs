use crate::aggregator::{group_by, percentage, TimeWindow, WindowedEntry};
use crate::classification::TrendDirection;
use crate::events::LogEntry;
use serde::Serialize;

/// Characters of an error message used as its ranking key
pub const ERROR_KEY_CHARS: usize = 80;

/// Share of window errors above which a message is flagged as rising
const RISING_SHARE: f64 = 20.0;

/// Share of window errors below which a message is flagged as falling
const FALLING_SHARE: f64 = 5.0;

/// A distinct error message and how often it occurred
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessageRank {
    pub message: String,
    pub count: usize,
    /// Share of all ERROR entries in the window (0-100)
    pub percentage: f64,
    pub trend: TrendDirection,
}

/// Rank distinct ERROR messages inside the window, most frequent first
///
/// The trend is read from the message's current share alone; no earlier window
/// is consulted.
pub fn top_errors<'a, I>(entries: I, window: &TimeWindow) -> Vec<ErrorMessageRank>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let errors: Vec<WindowedEntry<'a>> = window
        .select(entries)
        .into_iter()
        .filter(|w| w.entry.is_error())
        .collect();

    let mut ranked: Vec<ErrorMessageRank> = group_by(&errors, |entry| entry.message_preview(ERROR_KEY_CHARS))
        .into_iter()
        .map(|(message, group)| {
            let count = group.len();
            let share = percentage(count, errors.len());
            ErrorMessageRank {
                message,
                count,
                percentage: share,
                trend: share_trend(share),
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

fn share_trend(share: f64) -> TrendDirection {
    if share > RISING_SHARE {
        TrendDirection::Up
    } else if share < FALLING_SHARE {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}
