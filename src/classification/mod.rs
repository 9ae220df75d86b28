//! Classification of aggregated metrics into discrete states
//!
//! Two policies answer "is this application okay" from different angles and
//! are deliberately kept apart: [`ApplicationActivityPolicy`] looks at activity
//! and error share, [`ServiceUptimePolicy`] treats logs as a proxy for uptime.

pub mod policies;

pub use policies::{ApplicationActivityPolicy, ServiceUptimePolicy, TrendThresholds};

use crate::aggregator::GroupMetrics;
use serde::{Deserialize, Serialize};

/// Trait for policies that turn group metrics into a health status
pub trait ClassificationPolicy: Send + Sync {
    /// Classify one group; rules are tried in order and the first match wins
    fn classify(&self, metrics: &GroupMetrics) -> HealthStatus;

    /// Get a human-readable name for this policy
    fn name(&self) -> &str;
}

/// Health of an application or service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Silent,
}

impl HealthStatus {
    /// Sort rank putting the most problematic states first
    pub fn severity_rank(&self) -> u8 {
        match self {
            HealthStatus::Critical => 0,
            HealthStatus::Warning => 1,
            HealthStatus::Silent => 2,
            HealthStatus::Healthy => 3,
        }
    }
}

/// Status of one error-rate trend bucket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrendStatus {
    Normal,
    Warning,
    Critical,
}

/// Direction of change between two readings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    /// Compare a current reading against the previous one
    pub fn between(previous: f64, current: f64) -> Self {
        if current > previous {
            TrendDirection::Up
        } else if current < previous {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        }
    }
}
