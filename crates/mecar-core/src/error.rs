//! Common error types for vehicle backends and host accessories

use std::fmt;

use thiserror::Error;

use crate::accessory::CharacteristicType;

/// Result type for vehicle backend operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for accessory operations
pub type AccessoryResult<T> = Result<T, AccessoryError>;

/// Errors that can occur while fetching vehicle telemetry
#[derive(Debug, Error)]
pub enum ApiError {
    /// Vendor API answered with a non-success status
    #[error("Server error {status}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body, if the server sent one
        body: Option<serde_json::Value>,
    },

    /// Error carrying a structured payload but no HTTP status
    #[error("Error payload: {0}")]
    Payload(serde_json::Value),

    /// Transport/communication error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response could not be decoded into a snapshot
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Timeout waiting for response
    #[error("Request timed out")]
    Timeout,
}

impl ApiError {
    /// Create an HTTP error from status code and optional body
    pub fn http(status: u16, body: Option<serde_json::Value>) -> Self {
        Self::Http { status, body }
    }

    /// Returns the HTTP status code carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify this error for reporting.
    ///
    /// Well-known statuses map to fixed categories. Otherwise the response
    /// body or payload is surfaced, falling back to the error message.
    pub fn classify(&self) -> ErrorClass {
        match self {
            ApiError::Http { status, body } => match status {
                401 | 403 => ErrorClass::Unauthorized,
                404 => ErrorClass::Unsupported,
                429 | 500 => ErrorClass::TooManyRequests,
                503 | 504 => ErrorClass::Unavailable,
                _ => match body {
                    Some(body) if !body.is_null() => ErrorClass::Detail(value_text(body)),
                    _ => ErrorClass::Other(self.to_string()),
                },
            },
            ApiError::Payload(payload) => ErrorClass::Detail(value_text(payload)),
            _ => ErrorClass::Other(self.to_string()),
        }
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reporting category of a failed poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// 401/403: the stored token no longer grants access
    Unauthorized,
    /// 404: the vehicle does not support the requested container
    Unsupported,
    /// 429/500: rate limited or overloaded
    TooManyRequests,
    /// 503/504: vendor backend not reachable
    Unavailable,
    /// Error body or payload sent by the vendor
    Detail(String),
    /// Anything else
    Other(String),
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Unauthorized => {
                write!(f, "The stored token no longer grants access to the vehicle API")
            }
            ErrorClass::Unsupported => write!(f, "This vehicle does not support the request"),
            ErrorClass::TooManyRequests => write!(f, "Received too many requests"),
            ErrorClass::Unavailable => write!(f, "Vehicle API currently not available"),
            ErrorClass::Detail(detail) => write!(f, "{}", detail),
            ErrorClass::Other(message) => write!(f, "{}", message),
        }
    }
}

/// Errors raised by the host accessory model
#[derive(Debug, Error)]
pub enum AccessoryError {
    /// Characteristic does not accept external writes
    #[error("Characteristic is read-only: {0}")]
    ReadOnly(CharacteristicType),

    /// Value has the wrong kind or is out of range
    #[error("Invalid value for {characteristic}: {reason}")]
    InvalidValue {
        characteristic: CharacteristicType,
        reason: String,
    },

    /// Service does not carry the requested characteristic
    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(CharacteristicType),

    /// Service not found on the accessory
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// Set handler refused the write
    #[error("Write rejected: {0}")]
    Rejected(String),
}
