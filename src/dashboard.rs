//! Dashboard state and derived views
//!
//! The [`Dashboard`] owns the log buffer, the feed's stats snapshot and the
//! connection state. Feed events mutate it; [`Dashboard::snapshot`] recomputes
//! every view from the current buffer contents.

use crate::aggregator::{LogBuffer, ReferencePolicy, SharedLogBuffer, TimeWindow};
use crate::classification::{ApplicationActivityPolicy, ServiceUptimePolicy, TrendThresholds};
use crate::events::{ConnectionStatus, LogEntry, LogStats, Timestamp};
use crate::feed::{FeedEvent, FeedMessage};
use crate::patterns::{builtin_detectors, detect_patterns, Detector, Pattern, PatternSummary};
use crate::trend::{build_trend, build_volume_timeline, ErrorTrend, VolumeBucket, TREND_BUCKET_COUNT};
use crate::views::{
    application_performance, service_status, top_errors, AppStats, ErrorMessageRank, LevelDistribution,
    ServiceStatus, StatusSummary,
};
use log::{debug, error, info};
use serde::Serialize;

/// Window length and reference instant of one view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSettings {
    pub window_minutes: u32,
    pub reference: ReferencePolicy,
}

impl ViewSettings {
    pub fn new(window_minutes: u32, reference: ReferencePolicy) -> Self {
        Self {
            window_minutes,
            reference,
        }
    }
}

/// Per-view windows plus classification thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub application_performance: ViewSettings,
    pub service_status: ViewSettings,
    pub error_trend: ViewSettings,
    pub patterns: ViewSettings,
    pub top_errors: ViewSettings,
    pub volume_timeline: ViewSettings,
    pub application_policy: ApplicationActivityPolicy,
    pub service_policy: ServiceUptimePolicy,
    pub trend_thresholds: TrendThresholds,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        use ReferencePolicy::{LatestLog, WallClock};

        Self {
            application_performance: ViewSettings::new(30, LatestLog),
            service_status: ViewSettings::new(15, LatestLog),
            error_trend: ViewSettings::new(120, WallClock),
            patterns: ViewSettings::new(60, WallClock),
            top_errors: ViewSettings::new(60, WallClock),
            volume_timeline: ViewSettings::new(60, WallClock),
            application_policy: ApplicationActivityPolicy::with_defaults(),
            service_policy: ServiceUptimePolicy::with_defaults(),
            trend_thresholds: TrendThresholds::with_defaults(),
        }
    }
}

/// Every derived view at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub generated_at: Timestamp,
    pub connection_status: ConnectionStatus,
    pub buffered_logs: usize,
    pub stats: Option<LogStats>,
    /// From the feed's stats when present, otherwise from the buffer
    pub level_distribution: Option<LevelDistribution>,
    pub application_performance: Vec<AppStats>,
    pub status_summary: StatusSummary,
    pub service_status: Vec<ServiceStatus>,
    pub error_trend: ErrorTrend,
    pub volume_timeline: Vec<VolumeBucket>,
    pub patterns: Vec<Pattern>,
    pub pattern_summary: PatternSummary,
    pub top_errors: Vec<ErrorMessageRank>,
}

pub struct Dashboard {
    buffer: SharedLogBuffer,
    stats: Option<LogStats>,
    connection_status: ConnectionStatus,
    settings: DashboardSettings,
    detectors: Vec<Detector>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(DashboardSettings::default(), builtin_detectors().to_vec())
    }
}

impl Dashboard {
    pub fn new(settings: DashboardSettings, detectors: Vec<Detector>) -> Self {
        Self {
            buffer: SharedLogBuffer::new(LogBuffer::new()),
            stats: None,
            connection_status: ConnectionStatus::default(),
            settings,
            detectors,
        }
    }

    /// Apply one event from the feed client
    pub fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Status(status) => {
                if status != self.connection_status {
                    info!("Feed connection: {} -> {}", self.connection_status, status);
                }
                self.connection_status = status;
            }
            FeedEvent::Message(message) => self.apply_message(message),
            FeedEvent::Pong => debug!("pong received"),
        }
    }

    /// Apply one decoded feed message
    pub fn apply_message(&mut self, message: FeedMessage) {
        match message {
            FeedMessage::Connected(greeting) => {
                info!("Feed confirmed connection: {}", greeting.as_deref().unwrap_or(""));
            }
            FeedMessage::InitialLogs(entries) => {
                info!("Received {} initial log entries", entries.len());
                self.buffer.replace(entries);
            }
            FeedMessage::RealTimeLogs(entries) => {
                if !entries.is_empty() {
                    self.buffer.append(entries);
                    debug!("Buffer now holds {} entries", self.buffer.len());
                }
            }
            FeedMessage::LogStats(stats) => self.stats = Some(stats),
            FeedMessage::Error(message) => {
                error!("Feed reported an error: {}", message.as_deref().unwrap_or("unknown"));
            }
            FeedMessage::Unknown(kind) => debug!("Ignoring unknown feed message type: {}", kind),
        }
    }

    /// Drop every buffered entry
    pub fn clear_logs(&self) {
        self.buffer.clear();
        info!("Log buffer cleared");
    }

    /// Buffered entries, newest first
    pub fn logs(&self) -> Vec<LogEntry> {
        self.buffer.snapshot().to_vec()
    }

    pub fn stats(&self) -> Option<&LogStats> {
        self.stats.as_ref()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    /// Shared handle to the buffer for readers on other threads
    pub fn buffer_handle(&self) -> SharedLogBuffer {
        self.buffer.clone()
    }

    /// Compute every view against the current buffer at `now`
    pub fn snapshot(&self, now: Timestamp) -> DashboardSnapshot {
        let entries = self.logs();
        let settings = &self.settings;

        let application_performance = window_for(&settings.application_performance, &entries, now)
            .map(|window| application_performance(&entries, &window, &settings.application_policy))
            .unwrap_or_default();

        let service_status = window_for(&settings.service_status, &entries, now)
            .map(|window| service_status(&entries, &window, &settings.service_policy))
            .unwrap_or_default();

        let trend_buckets = window_for(&settings.error_trend, &entries, now)
            .map(|window| {
                build_trend(
                    &entries,
                    window.reference,
                    window.minutes,
                    TREND_BUCKET_COUNT,
                    &settings.trend_thresholds,
                )
            })
            .unwrap_or_default();

        let volume_timeline = window_for(&settings.volume_timeline, &entries, now)
            .map(|window| build_volume_timeline(&entries, window.reference, window.minutes, TREND_BUCKET_COUNT))
            .unwrap_or_default();

        let patterns = window_for(&settings.patterns, &entries, now)
            .map(|window| {
                let selected: Vec<&LogEntry> = window.select(&entries).into_iter().map(|w| w.entry).collect();
                detect_patterns(selected, &self.detectors)
            })
            .unwrap_or_default();

        let top_errors = window_for(&settings.top_errors, &entries, now)
            .map(|window| top_errors(&entries, &window))
            .unwrap_or_default();

        let level_distribution = match &self.stats {
            Some(stats) => Some(LevelDistribution::from_stats(stats)),
            None => window_for(&settings.volume_timeline, &entries, now)
                .map(|window| LevelDistribution::from_entries(&entries, &window)),
        };

        DashboardSnapshot {
            generated_at: now,
            connection_status: self.connection_status,
            buffered_logs: entries.len(),
            stats: self.stats.clone(),
            level_distribution,
            status_summary: StatusSummary::from_statuses(application_performance.iter().map(|a| a.status)),
            application_performance,
            service_status,
            error_trend: ErrorTrend::from_buckets(trend_buckets),
            volume_timeline,
            pattern_summary: PatternSummary::from_patterns(&patterns),
            patterns,
            top_errors,
        }
    }

    /// Serialize the buffer as pretty JSON using wire field names
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.logs())
    }
}

// An empty buffer, or a latest-log view with no parseable timestamp, has no window
fn window_for(view: &ViewSettings, entries: &[LogEntry], now: Timestamp) -> Option<TimeWindow> {
    if entries.is_empty() {
        return None;
    }
    TimeWindow::resolve(view.reference, entries, now, view.window_minutes)
}
