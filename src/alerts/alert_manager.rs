use crate::alerts::RateLimiter;
use crate::classification::HealthStatus;
use crate::error::AlertError;
use crate::events::Timestamp;
use crate::views::ServiceStatus;
use log::{error, info, warn};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// Alert raised when a service enters the critical state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAlert {
    pub service: String,
    pub error_rate: f64,
    pub error_count: usize,
    pub total_logs: usize,
    /// Most recent error message of the service, if any
    pub latest_error: Option<String>,
    pub raised_at: Timestamp,
}

impl ServiceAlert {
    pub fn from_status(status: &ServiceStatus, raised_at: Timestamp) -> Self {
        Self {
            service: status.application_name.clone(),
            error_rate: status.error_rate,
            error_count: status.error_count,
            total_logs: status.total_logs,
            latest_error: status.recent_errors.first().cloned(),
            raised_at,
        }
    }

    /// One-line operator summary
    pub fn summary(&self) -> String {
        format!(
            "{} is critical: {:.1}% errors ({} of {} logs)",
            self.service, self.error_rate, self.error_count, self.total_logs
        )
    }
}

/// Destination for delivered alerts
#[cfg_attr(test, mockall::automock)]
pub trait AlertSink: Send {
    fn deliver(&mut self, alert: &ServiceAlert) -> Result<(), AlertError>;
}

/// Sink that writes each alert as a warning log record
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn deliver(&mut self, alert: &ServiceAlert) -> Result<(), AlertError> {
        match &alert.latest_error {
            Some(message) => warn!("ALERT {} (latest: {})", alert.summary(), message),
            None => warn!("ALERT {}", alert.summary()),
        }
        Ok(())
    }
}

/// Raises rate-limited alerts for services that turn critical
///
/// A service alerts once when it enters the critical state and again only after
/// it has left that state. Alerts over the rate limit are queued (oldest
/// dropped when full) and delivered on later evaluations as capacity returns.
pub struct AlertManager {
    rate_limiter: RateLimiter,
    /// Alerts waiting for rate limit capacity
    alert_queue: VecDeque<ServiceAlert>,
    max_queue_size: usize,
    /// Critical services already alerted or queued
    critical_services: HashSet<String>,
    sink: Box<dyn AlertSink>,
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(3)
    }
}

impl AlertManager {
    /// Create an alert manager delivering to the log, with the default queue size
    pub fn new(max_per_minute: usize) -> Self {
        Self::with_sink(max_per_minute, 100, Box::new(LogAlertSink))
    }

    pub fn with_sink(max_per_minute: usize, max_queue_size: usize, sink: Box<dyn AlertSink>) -> Self {
        Self {
            rate_limiter: RateLimiter::new(max_per_minute),
            alert_queue: VecDeque::new(),
            max_queue_size,
            critical_services: HashSet::new(),
            sink,
        }
    }

    /// Compare service states with the previous evaluation and alert on new
    /// critical services
    ///
    /// Returns the number of alerts delivered, including previously queued ones.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::DeliveryFailed` if the sink rejects an alert.
    pub fn evaluate(&mut self, services: &[ServiceStatus], now: Timestamp) -> Result<usize, AlertError> {
        let mut delivered = self.process_queued_alerts(now)?;

        let current: HashSet<&str> = services
            .iter()
            .filter(|s| s.status == HealthStatus::Critical)
            .map(|s| s.application_name.as_str())
            .collect();

        // Services that left the critical state may alert again
        self.critical_services.retain(|name| current.contains(name.as_str()));

        let newly_critical: Vec<ServiceAlert> = services
            .iter()
            .filter(|s| s.status == HealthStatus::Critical)
            .filter(|s| !self.critical_services.contains(&s.application_name))
            .map(|s| ServiceAlert::from_status(s, now))
            .collect();

        for alert in newly_critical {
            if self.critical_services.contains(&alert.service) {
                continue;
            }
            if self.rate_limiter.can_send_at(now) {
                self.send_now(&alert, now)?;
                delivered += 1;
            } else {
                info!("Queued alert due to rate limit: {}", alert.summary());
                self.queue_alert(alert.clone());
            }
            // Marked only once delivered or queued, so a failed delivery retries
            self.critical_services.insert(alert.service);
        }

        Ok(delivered)
    }

    /// Deliver queued alerts while the rate limit allows
    pub fn tick(&mut self, now: Timestamp) -> Result<usize, AlertError> {
        self.process_queued_alerts(now)
    }

    pub fn queued_count(&self) -> usize {
        self.alert_queue.len()
    }

    fn process_queued_alerts(&mut self, now: Timestamp) -> Result<usize, AlertError> {
        let mut delivered = 0;
        while self.rate_limiter.can_send_at(now) {
            let Some(alert) = self.alert_queue.front().cloned() else {
                break;
            };
            // Stays at the front of the queue if delivery fails
            self.send_now(&alert, now)?;
            self.alert_queue.pop_front();
            delivered += 1;
        }
        Ok(delivered)
    }

    fn queue_alert(&mut self, alert: ServiceAlert) {
        if self.alert_queue.len() >= self.max_queue_size {
            if let Some(dropped) = self.alert_queue.pop_front() {
                warn!("Alert queue full, dropping oldest alert: {}", dropped.summary());
            }
        }
        self.alert_queue.push_back(alert);
    }

    fn send_now(&mut self, alert: &ServiceAlert, now: Timestamp) -> Result<(), AlertError> {
        match self.sink.deliver(alert) {
            Ok(()) => {
                self.rate_limiter.record_at(now);
                info!("Sent alert: {}", alert.summary());
                Ok(())
            }
            Err(e) => {
                error!("Failed to send alert: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn service(name: &str, status: HealthStatus) -> ServiceStatus {
        ServiceStatus {
            application_name: name.to_string(),
            total_logs: 10,
            error_count: 5,
            warn_count: 0,
            last_log_time: "2024-06-01T12:00:00.000Z".to_string(),
            error_rate: 50.0,
            status,
            recent_errors: vec!["db down".to_string()],
        }
    }

    #[test]
    fn test_alerts_once_per_critical_transition() {
        let mut sink = MockAlertSink::new();
        sink.expect_deliver()
            .withf(|alert| alert.service == "orders" && alert.latest_error.as_deref() == Some("db down"))
            .times(2)
            .returning(|_| Ok(()));
        let mut manager = AlertManager::with_sink(3, 100, Box::new(sink));

        let critical = vec![service("orders", HealthStatus::Critical)];
        assert_eq!(manager.evaluate(&critical, now()).unwrap(), 1);
        // Still critical: no new alert
        assert_eq!(manager.evaluate(&critical, now() + Duration::seconds(1)).unwrap(), 0);

        // Recovers, then turns critical again
        let healthy = vec![service("orders", HealthStatus::Healthy)];
        assert_eq!(manager.evaluate(&healthy, now() + Duration::seconds(2)).unwrap(), 0);
        assert_eq!(manager.evaluate(&critical, now() + Duration::seconds(3)).unwrap(), 1);
    }

    #[test]
    fn test_non_critical_services_never_alert() {
        let mut sink = MockAlertSink::new();
        sink.expect_deliver().never();
        let mut manager = AlertManager::with_sink(3, 100, Box::new(sink));

        let services = vec![
            service("a", HealthStatus::Warning),
            service("b", HealthStatus::Silent),
            service("c", HealthStatus::Healthy),
        ];
        assert_eq!(manager.evaluate(&services, now()).unwrap(), 0);
    }

    #[test]
    fn test_rate_limited_alerts_are_queued_then_drained() {
        let mut sink = MockAlertSink::new();
        sink.expect_deliver().times(4).returning(|_| Ok(()));
        let mut manager = AlertManager::with_sink(3, 100, Box::new(sink));

        let services: Vec<ServiceStatus> = ["a", "b", "c", "d"]
            .iter()
            .map(|name| service(name, HealthStatus::Critical))
            .collect();

        assert_eq!(manager.evaluate(&services, now()).unwrap(), 3);
        assert_eq!(manager.queued_count(), 1);

        // Capacity is still used up within the same minute
        assert_eq!(manager.tick(now() + Duration::seconds(30)).unwrap(), 0);
        assert_eq!(manager.tick(now() + Duration::seconds(61)).unwrap(), 1);
        assert_eq!(manager.queued_count(), 0);
    }

    #[test]
    fn test_queue_drops_oldest_when_full() {
        let mut sink = MockAlertSink::new();
        sink.expect_deliver()
            .withf(|alert| alert.service != "b")
            .times(2)
            .returning(|_| Ok(()));
        let mut manager = AlertManager::with_sink(1, 1, Box::new(sink));

        let services: Vec<ServiceStatus> = ["a", "b", "c"]
            .iter()
            .map(|name| service(name, HealthStatus::Critical))
            .collect();

        assert_eq!(manager.evaluate(&services, now()).unwrap(), 1);
        assert_eq!(manager.queued_count(), 1);
        // "b" was dropped to make room for "c"
        assert_eq!(manager.tick(now() + Duration::minutes(2)).unwrap(), 1);
    }

    #[test]
    fn test_delivery_failure_is_reported() {
        let mut sink = MockAlertSink::new();
        sink.expect_deliver()
            .returning(|_| Err(AlertError::DeliveryFailed("sink offline".to_string())));
        let mut manager = AlertManager::with_sink(3, 100, Box::new(sink));

        let result = manager.evaluate(&[service("orders", HealthStatus::Critical)], now());
        assert!(matches!(result, Err(AlertError::DeliveryFailed(_))));
    }

    /// Records delivered services and rejects the first alert for `fail_once`
    struct FlakySink {
        fail_once: Option<String>,
        delivered: Arc<Mutex<Vec<String>>>,
    }

    impl AlertSink for FlakySink {
        fn deliver(&mut self, alert: &ServiceAlert) -> Result<(), AlertError> {
            if self.fail_once.as_deref() == Some(alert.service.as_str()) {
                self.fail_once = None;
                return Err(AlertError::DeliveryFailed("sink offline".to_string()));
            }
            self.delivered.lock().unwrap().push(alert.service.clone());
            Ok(())
        }
    }

    fn flaky_manager(max_per_minute: usize, fail_once: &str) -> (AlertManager, Arc<Mutex<Vec<String>>>) {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = FlakySink {
            fail_once: Some(fail_once.to_string()),
            delivered: Arc::clone(&delivered),
        };
        (AlertManager::with_sink(max_per_minute, 100, Box::new(sink)), delivered)
    }

    #[test]
    fn test_failed_delivery_does_not_repeat_earlier_alerts() {
        let (mut manager, delivered) = flaky_manager(3, "b");
        let services = vec![
            service("a", HealthStatus::Critical),
            service("b", HealthStatus::Critical),
        ];

        assert!(manager.evaluate(&services, now()).is_err());
        // Only the failed service is retried
        assert_eq!(manager.evaluate(&services, now() + Duration::seconds(1)).unwrap(), 1);
        assert_eq!(manager.evaluate(&services, now() + Duration::seconds(2)).unwrap(), 0);

        assert_eq!(*delivered.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_failed_queued_alert_stays_queued() {
        let (mut manager, delivered) = flaky_manager(1, "b");
        let services = vec![
            service("a", HealthStatus::Critical),
            service("b", HealthStatus::Critical),
        ];

        assert_eq!(manager.evaluate(&services, now()).unwrap(), 1);
        assert_eq!(manager.queued_count(), 1);

        assert!(manager.tick(now() + Duration::seconds(61)).is_err());
        assert_eq!(manager.queued_count(), 1);

        assert_eq!(manager.tick(now() + Duration::seconds(62)).unwrap(), 1);
        assert_eq!(manager.queued_count(), 0);
        assert_eq!(*delivered.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_log_sink_accepts_alerts() {
        let mut sink = LogAlertSink;
        let alert = ServiceAlert::from_status(&service("orders", HealthStatus::Critical), now());
        assert!(sink.deliver(&alert).is_ok());
        assert_eq!(alert.summary(), "orders is critical: 50.0% errors (5 of 10 logs)");
    }
}
