//! Error types for vehicle data client operations

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur during client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Server returned an error response
    #[error("Server error {status}")]
    ServerError {
        status: u16,
        body: Option<serde_json::Value>,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Bearer token cannot be sent as a header
    #[error("Invalid auth token: {0}")]
    InvalidToken(String),
}

impl ClientError {
    /// Create a server error from status code and optional body
    pub fn server_error(status: u16, body: Option<serde_json::Value>) -> Self {
        Self::ServerError { status, body }
    }

    /// Whether the request hit the client's timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::HttpError(e) if e.is_timeout())
    }
}
