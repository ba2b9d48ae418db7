//! Error types for kitchen screen operations.

use kitchen_core::{HistoryError, OrderId, ServiceError, TransitionError};
use order_client::ClientError;
use realtime_bridge::BridgeError;
use thiserror::Error;
use voice_pipeline::{DispatchError, VoiceError};

/// Errors that can occur on the kitchen screen.
#[derive(Debug, Error)]
pub enum KitchenError {
    /// The state machine rejected the change. Nothing was applied.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The order is not on the board.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// The order service did not answer in time. The change was reverted.
    #[error("{action} timed out")]
    Timeout { action: String },

    /// The order service failed. The change was reverted.
    #[error("order service error: {0}")]
    Service(#[from] ServiceError),

    /// Undo or redo could not be replayed.
    #[error("history error: {0}")]
    History(#[from] HistoryError),

    /// Order client setup failed.
    #[error("order client error: {0}")]
    Client(#[from] ClientError),

    /// Realtime bridge error.
    #[error("realtime error: {0}")]
    Bridge(#[from] BridgeError),

    /// Voice pipeline error.
    #[error("voice error: {0}")]
    Voice(#[from] VoiceError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl KitchenError {
    /// Whether the error is an elapsed time bound.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<KitchenError> for DispatchError {
    fn from(err: KitchenError) -> Self {
        match err {
            KitchenError::Transition(e) => DispatchError::Rejected(e.user_message().to_lowercase()),
            KitchenError::NotFound(_) => DispatchError::Rejected("that order is no longer on the board".to_string()),
            KitchenError::Timeout { .. } => DispatchError::TimedOut,
            other => DispatchError::Failed(other.to_string()),
        }
    }
}
