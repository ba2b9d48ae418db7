//! Error types for the real-time bridge.

use thiserror::Error;

/// Errors that can occur while publishing or consuming change events.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The realtime gateway rejected the publish.
    #[error("publish rejected: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SSE stream error.
    #[error("SSE error: {0}")]
    Sse(String),

    /// The refresh triggered by an inbound event failed.
    #[error("refresh failed: {0}")]
    Refresh(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
