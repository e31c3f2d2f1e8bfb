use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Main error type for the Pulse membership service
#[derive(Debug)]
pub enum PulseError {
    /// Configuration or CLI argument errors
    Config(String),

    /// Malformed heartbeat: rejected at the handler boundary
    InvalidRequest(String),

    /// Follower-side dial or delivery failures
    Transport(String),

    /// A table record broke its invariants; the table can no longer be trusted
    StateInvariantViolation(String),

    /// System I/O errors
    Io(std::io::Error),

    /// JSON serialization/deserialization errors
    Serialization(serde_json::Error),

    /// Background task join failures
    Concurrency(String),
}

impl fmt::Display for PulseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PulseError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PulseError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            PulseError::Transport(msg) => write!(f, "Transport error: {}", msg),
            PulseError::StateInvariantViolation(msg) => {
                write!(f, "State invariant violation: {}", msg)
            }
            PulseError::Io(err) => write!(f, "I/O error: {}", err),
            PulseError::Serialization(err) => write!(f, "Serialization error: {}", err),
            PulseError::Concurrency(msg) => write!(f, "Concurrency error: {}", msg),
        }
    }
}

impl std::error::Error for PulseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PulseError::Io(err) => Some(err),
            PulseError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, PulseError>;

// Axum IntoResponse implementation for HTTP error responses
impl IntoResponse for PulseError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.user_message(),
                "type": self.error_type(),
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl PulseError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PulseError::Config(_) => StatusCode::BAD_REQUEST,
            PulseError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PulseError::Transport(_) => StatusCode::BAD_GATEWAY,
            PulseError::StateInvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PulseError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PulseError::Serialization(_) => StatusCode::BAD_REQUEST,
            PulseError::Concurrency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PulseError::Config(msg) => format!("Configuration error: {}", msg),
            PulseError::InvalidRequest(msg) => format!("Invalid request: {}", msg),
            PulseError::Transport(_) => "Upstream unreachable. Please try again later.".to_string(),
            PulseError::StateInvariantViolation(_) => {
                "Internal server error. Membership state is corrupt.".to_string()
            }
            PulseError::Io(_) => "Internal server error. Please try again later.".to_string(),
            PulseError::Serialization(_) => {
                "Data processing error. Please check your request format.".to_string()
            }
            PulseError::Concurrency(_) => {
                "Internal server error. Please try again later.".to_string()
            }
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            PulseError::Config(_) => "configuration_error",
            PulseError::InvalidRequest(_) => "invalid_request",
            PulseError::Transport(_) => "transport_error",
            PulseError::StateInvariantViolation(_) => "state_invariant_violation",
            PulseError::Io(_) => "io_error",
            PulseError::Serialization(_) => "serialization_error",
            PulseError::Concurrency(_) => "concurrency_error",
        }
    }

    /// Errors after which the coordinator must not keep running
    pub fn is_fatal(&self) -> bool {
        matches!(self, PulseError::StateInvariantViolation(_))
    }
}

// Conversions from common error types
impl From<std::io::Error> for PulseError {
    fn from(err: std::io::Error) -> Self {
        PulseError::Io(err)
    }
}

impl From<serde_json::Error> for PulseError {
    fn from(err: serde_json::Error) -> Self {
        PulseError::Serialization(err)
    }
}

impl From<reqwest::Error> for PulseError {
    fn from(err: reqwest::Error) -> Self {
        PulseError::Transport(err.to_string())
    }
}

impl From<url::ParseError> for PulseError {
    fn from(err: url::ParseError) -> Self {
        PulseError::Config(format!("Invalid URL: {}", err))
    }
}

impl From<tokio::task::JoinError> for PulseError {
    fn from(err: tokio::task::JoinError) -> Self {
        PulseError::Concurrency(format!("Background task failed: {}", err))
    }
}

// Helper macros for common error construction patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::PulseError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::PulseError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! invalid_request {
    ($msg:expr) => {
        $crate::error::PulseError::InvalidRequest($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::PulseError::InvalidRequest(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! transport_error {
    ($msg:expr) => {
        $crate::error::PulseError::Transport($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::PulseError::Transport(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! invariant_error {
    ($msg:expr) => {
        $crate::error::PulseError::StateInvariantViolation($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::PulseError::StateInvariantViolation(format!($fmt, $($arg)*))
    };
}
