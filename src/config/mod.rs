//! TOML configuration
//!
//! Every section is optional; missing keys take the built-in defaults.

use crate::aggregator::ReferencePolicy;
use crate::classification::{ApplicationActivityPolicy, ServiceUptimePolicy, TrendThresholds};
use crate::dashboard::{DashboardSettings, ViewSettings};
use crate::error::ConfigError;
use crate::feed::FeedSettings;
use crate::patterns::{builtin_detectors, Detector, PatternCategory, PatternSeverity};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub views: ViewsConfig,
    pub thresholds: ThresholdsConfig,
    pub alerts: AlertsConfig,
    /// Detectors appended after the built-in catalog
    pub patterns: Vec<PatternConfig>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// `host:port` of the log feed
    pub address: String,
    pub ping_interval_seconds: u64,
    pub max_reconnect_delay_seconds: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:9400".to_string(),
            ping_interval_seconds: 30,
            max_reconnect_delay_seconds: 60,
        }
    }
}

impl FeedConfig {
    pub fn settings(&self) -> FeedSettings {
        FeedSettings {
            ping_interval: Duration::from_secs(self.ping_interval_seconds),
            max_reconnect_delay: Duration::from_secs(self.max_reconnect_delay_seconds),
            ..FeedSettings::default()
        }
    }
}

/// Partial override of one view's window; unset keys keep the view's default
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOverride {
    pub window_minutes: Option<u32>,
    pub reference: Option<ReferencePolicy>,
}

impl ViewOverride {
    fn apply(&self, view: &mut ViewSettings) {
        if let Some(minutes) = self.window_minutes {
            view.window_minutes = minutes;
        }
        if let Some(reference) = self.reference {
            view.reference = reference;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    pub application_performance: ViewOverride,
    pub service_status: ViewOverride,
    pub error_trend: ViewOverride,
    pub patterns: ViewOverride,
    pub top_errors: ViewOverride,
    pub volume_timeline: ViewOverride,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub application: ApplicationActivityPolicy,
    pub service: ServiceUptimePolicy,
    pub trend: TrendThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub enabled: bool,
    pub rate_limit_per_minute: usize,
    pub max_queue_size: usize,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_limit_per_minute: 3,
            max_queue_size: 100,
        }
    }
}

/// An extra detector declared in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub name: String,
    pub regex: String,
    pub severity: PatternSeverity,
    pub category: PatternCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Seconds between dashboard snapshots
    pub render_interval_seconds: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            render_interval_seconds: 5,
        }
    }
}

impl Config {
    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file is missing or unreadable,
    /// `ConfigError::TomlError` if it does not parse, and
    /// `ConfigError::ValidationError` or `ConfigError::Pattern` if a value is
    /// out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.address.trim().is_empty() {
            return Err(ConfigError::ValidationError("feed.address must not be empty".to_string()));
        }
        if self.feed.ping_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "feed.ping_interval_seconds must be greater than 0".to_string(),
            ));
        }
        if self.feed.max_reconnect_delay_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "feed.max_reconnect_delay_seconds must be greater than 0".to_string(),
            ));
        }
        if self.output.render_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "output.render_interval_seconds must be greater than 0".to_string(),
            ));
        }

        let views = [
            ("application_performance", &self.views.application_performance),
            ("service_status", &self.views.service_status),
            ("error_trend", &self.views.error_trend),
            ("patterns", &self.views.patterns),
            ("top_errors", &self.views.top_errors),
            ("volume_timeline", &self.views.volume_timeline),
        ];
        for (name, view) in views {
            if view.window_minutes == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "views.{}.window_minutes must be greater than 0",
                    name
                )));
            }
        }

        if self.alerts.enabled && self.alerts.rate_limit_per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "alerts.rate_limit_per_minute must be greater than 0".to_string(),
            ));
        }

        self.detectors().map(|_| ())
    }

    /// Built-in detectors followed by the configured ones
    pub fn detectors(&self) -> Result<Vec<Detector>, ConfigError> {
        let mut detectors = builtin_detectors().to_vec();
        for pattern in &self.patterns {
            detectors.push(Detector::new(
                pattern.name.as_str(),
                &pattern.regex,
                pattern.severity,
                pattern.category,
            )?);
        }
        Ok(detectors)
    }

    pub fn dashboard_settings(&self) -> DashboardSettings {
        let mut settings = DashboardSettings {
            application_policy: self.thresholds.application,
            service_policy: self.thresholds.service,
            trend_thresholds: self.thresholds.trend,
            ..DashboardSettings::default()
        };

        self.views
            .application_performance
            .apply(&mut settings.application_performance);
        self.views.service_status.apply(&mut settings.service_status);
        self.views.error_trend.apply(&mut settings.error_trend);
        self.views.patterns.apply(&mut settings.patterns);
        self.views.top_errors.apply(&mut settings.top_errors);
        self.views.volume_timeline.apply(&mut settings.volume_timeline);
        settings
    }
}
