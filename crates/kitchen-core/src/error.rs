//! Error types for kitchen core operations.

use thiserror::Error;

use crate::history::ActionKind;
use crate::order::{OrderId, OrderStatus};
use crate::validation::ValidationError;

/// Errors returned by external collaborators (order service, notifier).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request exceeded its time bound.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never reached the service or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response did not match the expected schema.
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] ValidationError),

    /// The service is not configured or unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    /// Whether this error represents an elapsed time bound.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// A mutation that the status state machine does not allow.
///
/// Rejections are detected locally, before anything is applied or sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The order status does not allow the requested transition.
    #[error("status cannot be changed at this stage (order {order_id} is {from}, requested {to})")]
    IllegalStatus {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Items can only change while the order is being prepared.
    #[error("items can only be updated while preparing (order {order_id} is {status})")]
    ItemsLocked { order_id: OrderId, status: OrderStatus },

    /// The item index does not exist on the order.
    #[error("order {order_id} has no item at index {index}")]
    ItemOutOfRange { order_id: OrderId, index: usize },
}

impl TransitionError {
    /// Short message suitable for an info toast.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::IllegalStatus { .. } => "Status cannot be changed at this stage",
            Self::ItemsLocked { .. } => "Items can only be updated while the order is being prepared",
            Self::ItemOutOfRange { .. } => "That item is no longer on the order",
        }
    }

    /// The order the rejection refers to.
    pub fn order_id(&self) -> &OrderId {
        match self {
            Self::IllegalStatus { order_id, .. }
            | Self::ItemsLocked { order_id, .. }
            | Self::ItemOutOfRange { order_id, .. } => order_id,
        }
    }
}

/// Errors from replaying the action history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// The cursor is already at the head.
    #[error("nothing to undo")]
    NothingToUndo,

    /// The cursor is already at the tail.
    #[error("nothing to redo")]
    NothingToRedo,

    /// The entry lacks the snapshot needed to replay it.
    #[error("{kind:?} entry for order {order_id} has no snapshot to restore")]
    MissingSnapshot { kind: ActionKind, order_id: OrderId },
}
