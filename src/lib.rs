/// Error types for the feed, windowing, patterns, alerts and configuration
pub mod error;

/// Log entries, levels and feed-side statistics
pub mod events;

/// Bounded log buffer, time windows and per-group metrics
pub mod aggregator;

/// Health classification policies
pub mod classification;

/// Bucketed error-rate trend and volume timeline
pub mod trend;

/// Regex pattern detectors
pub mod patterns;

/// Derived dashboard views
pub mod views;

/// Log feed client and wire protocol
pub mod feed;

/// Dashboard state driven by feed events
pub mod dashboard;

/// Alert manager and rate limiting
pub mod alerts;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use dashboard::{Dashboard, DashboardSettings, DashboardSnapshot};
pub use error::{AlertError, ConfigError, FeedError, PatternError, TimestampError};
pub use events::{LogEntry, LogLevel, LogStats};
