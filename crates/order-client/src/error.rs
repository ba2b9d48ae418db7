//! Error types for order-client.

use kitchen_core::ServiceError;
use thiserror::Error;

/// Errors that can occur when talking to the order service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) if e.is_timeout() => ServiceError::Timeout,
            ClientError::Http(e) => ServiceError::Transport(e.to_string()),
            ClientError::Status { status, body } => ServiceError::Http { status, body },
            ClientError::Json(e) => ServiceError::InvalidResponse(kitchen_core::ValidationError::Malformed(e.to_string())),
            ClientError::Config(msg) => ServiceError::Unavailable(msg),
        }
    }
}
