//! Line-oriented feed protocol
//!
//! Every line on the wire is either a bare liveness token (`ping` / `pong`) or a
//! JSON envelope:
//!
//! ```text
//! {"type": "real_time_logs", "message": "...", "data": [...], "timestamp": "..."}
//! ```

use crate::error::FeedError;
use crate::events::{ConnectionStatus, LogEntry, LogStats};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Liveness token sent by the client
pub const PING: &str = "ping";

/// Liveness token answered by the server
pub const PONG: &str = "pong";

/// A typed message carried in a JSON envelope
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Server greeting
    Connected(Option<String>),
    /// Full buffer contents, newest first; replaces the buffer
    InitialLogs(Vec<LogEntry>),
    /// New entries, newest first; prepended to the buffer
    RealTimeLogs(Vec<LogEntry>),
    /// Server-side totals snapshot
    LogStats(LogStats),
    /// Server-reported error
    Error(Option<String>),
    /// Envelope with a type this client does not know
    Unknown(String),
}

/// One decoded line of the feed
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    Ping,
    Pong,
    Message(FeedMessage),
}

/// What the feed client reports to its consumer
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Status(ConnectionStatus),
    Message(FeedMessage),
    Pong,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default)]
    data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

impl FeedFrame {
    /// Decode one line of the feed
    pub fn parse(line: &str) -> Result<Self, FeedError> {
        match line.trim() {
            PING => return Ok(FeedFrame::Ping),
            PONG => return Ok(FeedFrame::Pong),
            _ => {}
        }

        let envelope: Envelope = serde_json::from_str(line)
            .map_err(|e| FeedError::MalformedPayload(format!("invalid envelope: {}", e)))?;

        let message = match envelope.kind.as_str() {
            "connected" => FeedMessage::Connected(envelope.message),
            "initial_logs" => FeedMessage::InitialLogs(decode_entries(envelope.data)?),
            "real_time_logs" => FeedMessage::RealTimeLogs(decode_entries(envelope.data)?),
            "log_stats" => FeedMessage::LogStats(
                serde_json::from_value(envelope.data)
                    .map_err(|e| FeedError::MalformedPayload(format!("invalid log_stats: {}", e)))?,
            ),
            "error" => FeedMessage::Error(envelope.message),
            _ => FeedMessage::Unknown(envelope.kind),
        };

        Ok(FeedFrame::Message(message))
    }
}

impl FeedMessage {
    /// Wire type tag of the message
    pub fn kind(&self) -> &str {
        match self {
            FeedMessage::Connected(_) => "connected",
            FeedMessage::InitialLogs(_) => "initial_logs",
            FeedMessage::RealTimeLogs(_) => "real_time_logs",
            FeedMessage::LogStats(_) => "log_stats",
            FeedMessage::Error(_) => "error",
            FeedMessage::Unknown(kind) => kind,
        }
    }

    /// Encode the message as one envelope line, without the trailing newline
    pub fn to_line(&self) -> Result<String, FeedError> {
        let to_value = |value: Result<Value, serde_json::Error>| {
            value.map_err(|e| FeedError::MalformedPayload(e.to_string()))
        };

        let (message, data) = match self {
            FeedMessage::Connected(message) | FeedMessage::Error(message) => (message.clone(), Value::Null),
            FeedMessage::InitialLogs(entries) | FeedMessage::RealTimeLogs(entries) => {
                (None, to_value(serde_json::to_value(entries))?)
            }
            FeedMessage::LogStats(stats) => (None, to_value(serde_json::to_value(stats))?),
            FeedMessage::Unknown(_) => (None, Value::Null),
        };

        let envelope = Envelope {
            kind: self.kind().to_string(),
            message,
            data,
            timestamp: None,
        };
        serde_json::to_string(&envelope).map_err(|e| FeedError::MalformedPayload(e.to_string()))
    }
}

// `null` or a missing payload is an empty batch
fn decode_entries(data: Value) -> Result<Vec<LogEntry>, FeedError> {
    serde_json::from_value::<Option<Vec<LogEntry>>>(data)
        .map(Option::unwrap_or_default)
        .map_err(|e| FeedError::MalformedPayload(format!("invalid log entries: {}", e)))
}
