//! Core event types for the log feed
//!
//! This module defines the log entries and stats snapshots delivered by the feed,
//! along with the connection state reported by the transport.

use crate::error::TimestampError;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Application name used when an entry does not carry one
pub const UNKNOWN_APPLICATION: &str = "Unknown";

/// Naive timestamp layouts accepted in addition to RFC 3339, read as UTC
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A single structured log entry as delivered by the feed
///
/// The timestamp is kept as received and parsed on demand, so an entry with a
/// bad timestamp can still be buffered, displayed and exported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// ISO-8601 timestamp text
    pub timestamp: String,
    /// Severity level of the entry
    #[serde(rename = "logLevelString")]
    pub level: LogLevel,
    /// The log message content
    #[serde(default)]
    pub message: String,
    /// Emitting application, normalized to `Unknown` when absent or empty
    #[serde(
        default = "unknown_application",
        deserialize_with = "deserialize_application_name"
    )]
    pub application_name: String,
    /// Logger that produced the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger_name: Option<String>,
    /// Thread that produced the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
}

/// Log level carried by each entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    #[serde(alias = "WARNING")]
    Warn,
    Info,
    Debug,
}

/// Totals snapshot periodically pushed by the feed
///
/// Independent of the client-side aggregation; the two are never reconciled.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LogStats {
    pub total_logs: u64,
    pub error_count: u64,
    pub warn_count: u64,
    pub info_count: u64,
    pub debug_count: u64,
    pub recent_logs_count: u64,
    pub last_updated: String,
}

/// State of the feed connection as seen by the transport
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl LogEntry {
    /// Build an entry stamped with the given instant
    pub fn new(
        timestamp: Timestamp,
        level: LogLevel,
        application_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let application_name = application_name.into();
        Self {
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            message: message.into(),
            application_name: if application_name.is_empty() {
                UNKNOWN_APPLICATION.to_string()
            } else {
                application_name
            },
            logger_name: None,
            thread_name: None,
        }
    }

    /// Parse the entry's timestamp
    pub fn parsed_timestamp(&self) -> Result<Timestamp, TimestampError> {
        parse_timestamp(&self.timestamp)
    }

    /// Whether the entry is at ERROR level
    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }

    /// The message cut to `max_chars` characters, with `...` appended when cut
    pub fn message_preview(&self, max_chars: usize) -> String {
        truncate_with_ellipsis(&self.message, max_chars)
    }
}

/// Cut `text` to `max_chars` characters, appending `...` when anything was dropped
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

impl LogLevel {
    /// All levels in display order
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Error => "Error",
        };
        f.write_str(label)
    }
}

/// Parse an ISO-8601 timestamp
///
/// Accepts RFC 3339 with an offset, or a naive date-time which is read as UTC.
pub fn parse_timestamp(value: &str) -> Result<Timestamp, TimestampError> {
    let value = value.trim();
    match DateTime::parse_from_rfc3339(value) {
        Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
        Err(rfc_error) => NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| TimestampError {
                value: value.to_string(),
                source: rfc_error,
            }),
    }
}

fn unknown_application() -> String {
    UNKNOWN_APPLICATION.to_string()
}

fn deserialize_application_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(unknown_application))
}
