//! Running detectors over a window of entries

use crate::events::LogEntry;
use crate::patterns::detector::{Detector, PatternCategory, PatternSeverity};
use serde::Serialize;

/// Maximum number of example messages kept per pattern
pub const MAX_EXAMPLES: usize = 3;

/// Characters kept from each example message
pub const EXAMPLE_PREVIEW_CHARS: usize = 60;

/// A detector that matched at least one entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub name: String,
    pub regex: String,
    pub match_count: usize,
    pub severity: PatternSeverity,
    pub category: PatternCategory,
    pub examples: Vec<String>,
    /// Match count relative to the most frequent pattern (0-100)
    pub relative_frequency: f64,
}

/// Totals across detected patterns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSummary {
    pub detected: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total_matches: usize,
}

/// Count each detector's matches among `entries`
///
/// Detectors with no match are omitted. The result is sorted by match count,
/// highest first, keeping detector order for ties.
pub fn detect_patterns<'a, I>(entries: I, detectors: &[Detector]) -> Vec<Pattern>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let entries: Vec<&LogEntry> = entries.into_iter().collect();

    let mut patterns: Vec<Pattern> = detectors
        .iter()
        .filter_map(|detector| {
            let matching: Vec<&LogEntry> = entries
                .iter()
                .copied()
                .filter(|entry| detector.is_match(&entry.message))
                .collect();

            if matching.is_empty() {
                return None;
            }

            Some(Pattern {
                name: detector.name().to_string(),
                regex: detector.pattern().to_string(),
                match_count: matching.len(),
                severity: detector.severity(),
                category: detector.category(),
                examples: matching
                    .iter()
                    .take(MAX_EXAMPLES)
                    .map(|entry| entry.message_preview(EXAMPLE_PREVIEW_CHARS))
                    .collect(),
                relative_frequency: 0.0,
            })
        })
        .collect();

    patterns.sort_by(|a, b| b.match_count.cmp(&a.match_count));

    if let Some(largest) = patterns.first().map(|p| p.match_count) {
        for pattern in &mut patterns {
            pattern.relative_frequency = pattern.match_count as f64 / largest as f64 * 100.0;
        }
    }

    patterns
}

impl PatternSummary {
    pub fn from_patterns(patterns: &[Pattern]) -> Self {
        let mut summary = Self {
            detected: patterns.len(),
            ..Self::default()
        };

        for pattern in patterns {
            match pattern.severity {
                PatternSeverity::High => summary.high += 1,
                PatternSeverity::Medium => summary.medium += 1,
                PatternSeverity::Low => summary.low += 1,
            }
            summary.total_matches += pattern.match_count;
        }

        summary
    }
}
