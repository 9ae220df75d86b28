//! Built-in classification policies
//!
//! Each policy is an ordered list of threshold rules; the first rule that
//! matches decides the status. Thresholds default to the dashboard's values and
//! can be overridden from configuration.

use crate::aggregator::GroupMetrics;
use crate::classification::{ClassificationPolicy, HealthStatus, TrendStatus};
use serde::{Deserialize, Serialize};

/// Application activity health, used by the application performance view
///
/// ```text
/// recent_activity == 0 && total_logs < silent_below_logs     -> silent
/// error_rate > critical_error_rate                            -> critical
/// error_rate > warning_error_rate || frequency < min_freq     -> warning
/// otherwise                                                   -> healthy
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationActivityPolicy {
    /// Groups with no recent activity and fewer logs than this are silent
    pub silent_below_logs: usize,
    /// Error rate (%) above which the application is critical
    pub critical_error_rate: f64,
    /// Error rate (%) above which the application is in warning
    pub warning_error_rate: f64,
    /// Log frequency (logs/minute) below which the application is in warning
    pub min_log_frequency: f64,
}

impl ApplicationActivityPolicy {
    pub fn new(
        silent_below_logs: usize,
        critical_error_rate: f64,
        warning_error_rate: f64,
        min_log_frequency: f64,
    ) -> Self {
        Self {
            silent_below_logs,
            critical_error_rate,
            warning_error_rate,
            min_log_frequency,
        }
    }

    /// Dashboard defaults: silent under 5 logs, critical over 15%, warning over 5% or under 0.5/min
    pub fn with_defaults() -> Self {
        Self::new(5, 15.0, 5.0, 0.5)
    }
}

impl Default for ApplicationActivityPolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ClassificationPolicy for ApplicationActivityPolicy {
    fn classify(&self, metrics: &GroupMetrics) -> HealthStatus {
        if metrics.recent_activity == 0 && metrics.total_logs < self.silent_below_logs {
            HealthStatus::Silent
        } else if metrics.error_rate > self.critical_error_rate {
            HealthStatus::Critical
        } else if metrics.error_rate > self.warning_error_rate
            || metrics.log_frequency < self.min_log_frequency
        {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }

    fn name(&self) -> &str {
        "ApplicationActivityPolicy"
    }
}

/// Service status inferred from logs, used by the service status view
///
/// ```text
/// total_logs == 0                                             -> silent
/// error_rate > critical_error_rate                            -> critical
/// error_rate > warning_error_rate || errors > warning_errors  -> warning
/// otherwise                                                   -> healthy
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceUptimePolicy {
    /// Error rate (%) above which the service is critical
    pub critical_error_rate: f64,
    /// Error rate (%) above which the service is in warning
    pub warning_error_rate: f64,
    /// Error count above which the service is in warning
    pub warning_error_count: usize,
}

impl ServiceUptimePolicy {
    pub fn new(critical_error_rate: f64, warning_error_rate: f64, warning_error_count: usize) -> Self {
        Self {
            critical_error_rate,
            warning_error_rate,
            warning_error_count,
        }
    }

    /// Dashboard defaults: critical over 20%, warning over 5% or more than 10 errors
    pub fn with_defaults() -> Self {
        Self::new(20.0, 5.0, 10)
    }
}

impl Default for ServiceUptimePolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ClassificationPolicy for ServiceUptimePolicy {
    fn classify(&self, metrics: &GroupMetrics) -> HealthStatus {
        if metrics.total_logs == 0 {
            HealthStatus::Silent
        } else if metrics.error_rate > self.critical_error_rate {
            HealthStatus::Critical
        } else if metrics.error_rate > self.warning_error_rate
            || metrics.error_count > self.warning_error_count
        {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }

    fn name(&self) -> &str {
        "ServiceUptimePolicy"
    }
}

/// Error-rate thresholds for trend buckets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendThresholds {
    /// Error rate (%) above which a bucket is critical
    pub critical_error_rate: f64,
    /// Error rate (%) above which a bucket is in warning
    pub warning_error_rate: f64,
}

impl TrendThresholds {
    pub fn new(critical_error_rate: f64, warning_error_rate: f64) -> Self {
        Self {
            critical_error_rate,
            warning_error_rate,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(5.0, 2.0)
    }

    pub fn classify(&self, error_rate: f64) -> TrendStatus {
        if error_rate > self.critical_error_rate {
            TrendStatus::Critical
        } else if error_rate > self.warning_error_rate {
            TrendStatus::Warning
        } else {
            TrendStatus::Normal
        }
    }
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self::with_defaults()
    }
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn arbitrary_metrics(total: u16, errors: u16, recent: u8, frequency: u16) -> GroupMetrics {
        let total = usize::from(total);
        let errors = usize::from(errors).min(total);
        GroupMetrics {
            total_logs: total,
            error_count: errors,
            warn_count: 0,
            error_rate: crate::aggregator::percentage(errors, total),
            log_frequency: f64::from(frequency) / 100.0,
            recent_activity: usize::from(recent),
        }
    }

    // Both policies are total: every input gets one of the four states, and
    // classifying twice gives the same answer
    #[quickcheck]
    fn prop_policies_are_total_and_deterministic(total: u16, errors: u16, recent: u8, frequency: u16) -> bool {
        let m = arbitrary_metrics(total, errors, recent, frequency);
        let policies: [&dyn ClassificationPolicy; 2] = [
            &ApplicationActivityPolicy::with_defaults(),
            &ServiceUptimePolicy::with_defaults(),
        ];

        policies.iter().all(|policy| {
            let first = policy.classify(&m);
            matches!(
                first,
                HealthStatus::Healthy | HealthStatus::Warning | HealthStatus::Critical | HealthStatus::Silent
            ) && first == policy.classify(&m)
        })
    }

    // Only an empty service is silent under the uptime policy
    #[quickcheck]
    fn prop_uptime_silent_iff_empty(total: u16, errors: u16) -> bool {
        let m = arbitrary_metrics(total, errors, 0, 0);
        (ServiceUptimePolicy::with_defaults().classify(&m) == HealthStatus::Silent) == (m.total_logs == 0)
    }
}
