//! Error types for the voice pipeline.

use thiserror::Error;

/// Errors raised by voice engines and the command interpreter.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// The speech recognizer failed to start or reported an error.
    #[error("recognizer error: {0}")]
    Recognizer(String),

    /// Speech synthesis failed.
    #[error("synthesizer error: {0}")]
    Synthesizer(String),

    /// HTTP request to the interpreter failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The interpreter answered with a non-success status.
    #[error("interpreter returned {status}: {body}")]
    Interpreter { status: u16, body: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Why a dispatched voice command did not change the order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The state machine does not allow the change.
    #[error("{0}")]
    Rejected(String),

    /// The order service did not answer in time; the change was reverted.
    #[error("timed out")]
    TimedOut,

    /// The order service failed; the change was reverted.
    #[error("{0}")]
    Failed(String),
}
