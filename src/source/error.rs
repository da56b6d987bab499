//! Error types for source adapters.

use thiserror::Error;

/// Errors that can occur while fetching a source.
///
/// Adapters never retry; the poller converts any of these into an
/// `Unknown` status for the round.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The source answered with a non-success status code.
    #[error("API returned status {0}")]
    Status(u16),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The adapter cannot serve this request.
    #[error("Not supported: {0}")]
    Unsupported(String),
}

impl AdapterError {
    /// Short tag for the failure, used in `Fetch error: <kind>` messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::Http(_) => "HTTPError",
            AdapterError::Status(_) => "HTTPStatusError",
            AdapterError::Parse(_) => "ParseError",
            AdapterError::Connection(_) => "ConnectError",
            AdapterError::Timeout => "Timeout",
            AdapterError::Unsupported(_) => "Unsupported",
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else if err.is_decode() {
            AdapterError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            AdapterError::Status(status.as_u16())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Parse(err.to_string())
    }
}
