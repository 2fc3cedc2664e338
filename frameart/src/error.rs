//! Error types for the Frame Art client

use serde_json::Value;
use std::sync::Arc;

/// Result type alias for Frame Art operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when driving the Frame Art backend
///
/// The type is `Clone` so that one settlement can be handed to every caller
/// of a collapsed request; foreign error sources are kept behind an `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The backend could not be reached (no HTTP status)
    #[error("Transport error: {0}")]
    Transport(Arc<reqwest::Error>),

    /// The backend answered with a non-success status
    #[error("Server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(Arc<serde_json::Error>),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A client-side argument was missing or malformed; nothing was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend relayed a failed device command inside a success response
    #[error("Device command failed: {0}")]
    Command(String),

    /// No debug command is registered under this identifier
    #[error("Unknown debug command: {0}")]
    UnknownCommand(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}

#[cfg(feature = "frameconfig")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a server error from a status code and a raw response body
    ///
    /// The body is expected as `{"detail": ...}`. A string detail is used as
    /// is, any other detail is rendered as compact JSON. Without a parseable
    /// detail the HTTP reason phrase is used.
    pub fn from_response_body(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::parse_detail(body)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "Server error".to_string());

        Self::Server {
            status: status.as_u16(),
            detail,
        }
    }

    fn parse_detail(body: &str) -> Option<String> {
        let json: Value = serde_json::from_str(body).ok()?;
        match json.get("detail")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::String(_) | Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// HTTP status of a server error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if the error was raised before any network call
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnknownCommand(_))
    }

    /// Check if the backend could not be reached at all
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
