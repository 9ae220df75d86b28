use crate::aggregator::{group_by, GroupMetrics, TimeWindow};
use crate::classification::{ClassificationPolicy, HealthStatus};
use crate::events::LogEntry;
use serde::Serialize;

/// Service state inferred from the logs an application emitted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub application_name: String,
    pub total_logs: usize,
    pub error_count: usize,
    pub warn_count: usize,
    /// Timestamp text of the newest entry in the group
    pub last_log_time: String,
    pub error_rate: f64,
    pub status: HealthStatus,
    /// Messages of the group's ERROR entries, in buffer order
    pub recent_errors: Vec<String>,
}

/// Per-service status, most problematic first
///
/// Services of equal status keep the order they were first seen in.
pub fn service_status<'a, I>(
    entries: I,
    window: &TimeWindow,
    policy: &dyn ClassificationPolicy,
) -> Vec<ServiceStatus>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let selected = window.select(entries);

    let mut services: Vec<ServiceStatus> = group_by(&selected, |e| e.application_name.clone())
        .into_iter()
        .map(|(application_name, group)| {
            let metrics = GroupMetrics::compute(&group, window.minutes);
            let last_log_time = group
                .iter()
                .max_by_key(|w| w.timestamp)
                .map(|w| w.entry.timestamp.clone())
                .unwrap_or_default();
            let recent_errors = group
                .iter()
                .filter(|w| w.entry.is_error())
                .map(|w| w.entry.message.clone())
                .collect();

            ServiceStatus {
                application_name,
                total_logs: metrics.total_logs,
                error_count: metrics.error_count,
                warn_count: metrics.warn_count,
                last_log_time,
                error_rate: metrics.error_rate,
                status: policy.classify(&metrics),
                recent_errors,
            }
        })
        .collect();

    services.sort_by_key(|s| s.status.severity_rank());
    services
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::ServiceUptimePolicy;
    use crate::events::LogLevel;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_service_status_orders_problems_first() {
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let at = |minutes: i64, level, app: &str, message: &str| {
            LogEntry::new(reference - Duration::minutes(minutes), level, app, message)
        };
        let entries = vec![
            at(1, LogLevel::Info, "healthy-svc", "ok"),
            at(2, LogLevel::Info, "healthy-svc", "ok"),
            at(1, LogLevel::Error, "broken-svc", "db down"),
            at(3, LogLevel::Warn, "broken-svc", "retrying"),
            at(4, LogLevel::Error, "broken-svc", "db still down"),
        ];

        let window = TimeWindow::new(reference, 15);
        let services = service_status(&entries, &window, &ServiceUptimePolicy::with_defaults());

        assert_eq!(services.len(), 2);
        let broken = &services[0];
        assert_eq!(broken.application_name, "broken-svc");
        assert_eq!(broken.status, HealthStatus::Critical);
        assert_eq!(broken.warn_count, 1);
        assert_eq!(broken.recent_errors, vec!["db down", "db still down"]);
        assert_eq!(broken.last_log_time, entries[2].timestamp);

        assert_eq!(services[1].application_name, "healthy-svc");
        assert_eq!(services[1].status, HealthStatus::Healthy);
        assert!(services[1].recent_errors.is_empty());
    }

    #[test]
    fn test_service_status_sort_is_stable() {
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let entries: Vec<LogEntry> = ["first", "second", "third"]
            .iter()
            .map(|app| LogEntry::new(reference, LogLevel::Info, *app, "ok"))
            .collect();

        let window = TimeWindow::new(reference, 15);
        let services = service_status(&entries, &window, &ServiceUptimePolicy::with_defaults());
        let names: Vec<&str> = services.iter().map(|s| s.application_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}
