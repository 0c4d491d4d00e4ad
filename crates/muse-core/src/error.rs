//! Error types for the Muse chat relay

use thiserror::Error;

/// Result type alias for relay operations
pub type MuseResult<T> = Result<T, MuseError>;

/// Main error type for the relay and its clients
#[derive(Error, Debug, Clone)]
pub enum MuseError {
    /// Malformed or incomplete request; the caller can fix it (4xx class)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Server-side misconfiguration such as a missing secret or an unknown
    /// persona id (5xx class, operator-fixable)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The completion API rejected the request or failed outright. Detail is
    /// logged server-side; this variant is rendered generically to callers.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Connection dropped mid-transfer; terminal for that request
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    /// The user aborted the stream; not a failure
    #[error("Cancelled by user")]
    Cancelled,

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Local persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),
}

impl MuseError {
    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new upstream error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Create a new stream interruption error
    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::StreamInterrupted(message.into())
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

impl From<std::io::Error> for MuseError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for MuseError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

impl From<reqwest::Error> for MuseError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error.to_string())
    }
}
