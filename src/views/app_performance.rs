use crate::aggregator::{group_by, GroupMetrics, TimeWindow};
use crate::classification::{ClassificationPolicy, HealthStatus};
use crate::events::LogEntry;
use serde::Serialize;

/// Activity and error share of one application inside the window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStats {
    pub application_name: String,
    pub total_logs: usize,
    pub error_count: usize,
    pub error_rate: f64,
    pub log_frequency: f64,
    pub recent_activity: usize,
    pub status: HealthStatus,
}

/// Number of applications in each health state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    pub silent: usize,
}

/// Per-application statistics, busiest application first
pub fn application_performance<'a, I>(
    entries: I,
    window: &TimeWindow,
    policy: &dyn ClassificationPolicy,
) -> Vec<AppStats>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let selected = window.select(entries);

    let mut stats: Vec<AppStats> = group_by(&selected, |e| e.application_name.clone())
        .into_iter()
        .map(|(application_name, group)| {
            let metrics = GroupMetrics::compute(&group, window.minutes);
            AppStats {
                application_name,
                total_logs: metrics.total_logs,
                error_count: metrics.error_count,
                error_rate: metrics.error_rate,
                log_frequency: metrics.log_frequency,
                recent_activity: metrics.recent_activity,
                status: policy.classify(&metrics),
            }
        })
        .collect();

    stats.sort_by(|a, b| b.total_logs.cmp(&a.total_logs));
    stats
}

impl StatusSummary {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        let mut summary = Self::default();
        for status in statuses {
            match status {
                HealthStatus::Healthy => summary.healthy += 1,
                HealthStatus::Warning => summary.warning += 1,
                HealthStatus::Critical => summary.critical += 1,
                HealthStatus::Silent => summary.silent += 1,
            }
        }
        summary
    }
}
