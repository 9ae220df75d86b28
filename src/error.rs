use thiserror::Error;

/// Errors raised by the feed client
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to connect to feed at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Feed connection closed by peer")]
    Disconnected,

    #[error("Malformed feed payload: {0}")]
    MalformedPayload(String),

    #[error("Not connected to feed")]
    NotConnected,

    #[error("Feed thread panicked")]
    ThreadPanicked,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A log entry carried a timestamp that could not be parsed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid timestamp '{value}': {source}")]
pub struct TimestampError {
    pub value: String,
    #[source]
    pub source: chrono::ParseError,
}

/// Errors building pattern detectors
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Invalid pattern '{name}': {source}")]
    InvalidRegex {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors that can occur when sending alerts
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Failed to deliver alert: {0}")]
    DeliveryFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}
