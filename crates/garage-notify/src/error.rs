//! Error handling for the notification pipeline.

use thiserror::Error;

/// The main result type used throughout the crate.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors produced by the stream connection, the REST collaborator and the
/// store mutations.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// HTTP request errors (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the notification backend
    #[error("API error: status={status}, body={body}")]
    Api {
        status: http::StatusCode,
        body: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication errors (missing or rejected credentials)
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Timeout errors
    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The stream endpoint answered with a non-success status
    #[error("Stream rejected with status {status}")]
    InvalidStatus { status: http::StatusCode },

    /// The peer closed the notification stream
    #[error("Notification stream ended")]
    StreamEnded,

    /// The background connection task is gone
    #[error("Connection closed: {reason:?}")]
    ConnectionClosed { reason: Option<String> },

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl NotifyError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create an API error.
    pub fn api(status: http::StatusCode, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Create an error for a rejected stream request.
    pub fn invalid_status(status: http::StatusCode) -> Self {
        Self::InvalidStatus { status }
    }

    /// Create a connection-closed error.
    pub fn connection_closed(reason: Option<String>) -> Self {
        Self::ConnectionClosed { reason }
    }

    /// Returns `true` for failures the backend reported with a 401/403.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Api { status, .. } | Self::InvalidStatus { status } => {
                *status == http::StatusCode::UNAUTHORIZED || *status == http::StatusCode::FORBIDDEN
            }
            Self::Auth { .. } => true,
            _ => false,
        }
    }
}
