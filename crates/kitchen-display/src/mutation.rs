//! Optimistic mutation protocol.
//!
//! 1. Snapshot the order.
//! 2. Apply the change to the store.
//! 3. Call the order service under a time bound.
//! 4. On failure or timeout, roll the store back and tell the user.
//! 5. On success, the caller records history and broadcasts.
//!
//! Every optimistic write goes through [`settle`], which pairs it with
//! exactly one service call and exactly one outcome.

use std::future::Future;
use std::time::Duration;

use kitchen_core::{Notice, NoticeSink, Order, OrderId, ServiceError};
use tracing::{info, warn};

use crate::error::KitchenError;
use crate::store::{OrderStore, Revision};

/// An optimistic write waiting for the service to confirm it.
#[derive(Debug, Clone)]
pub(crate) struct Staged {
    pub order_id: OrderId,
    /// Revision the optimistic write produced.
    pub revision: Revision,
    /// State to restore on failure. `None` restores absence.
    pub previous: Option<Order>,
    /// Verb phrase for notices, e.g. "mark order #12 ready".
    pub action: String,
}

/// Await the service call and keep or revert the optimistic write.
pub(crate) async fn settle<T, F>(
    store: &OrderStore,
    notices: &dyn NoticeSink,
    staged: Staged,
    limit: Duration,
    call: F,
) -> Result<T, KitchenError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    let error = match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => e,
        Err(_) => ServiceError::Timeout,
    };

    let restored = store
        .rollback(&staged.order_id, staged.revision, staged.previous)
        .await;
    if restored {
        warn!(order_id = %staged.order_id, action = %staged.action, error = %error, "MUTATION_ROLLBACK");
    } else {
        info!(
            order_id = %staged.order_id,
            action = %staged.action,
            error = %error,
            "MUTATION_ROLLBACK_SKIPPED"
        );
    }

    if error.is_timeout() {
        notices.show(
            Notice::error(format!("Request to {} timed out, please retry", staged.action))
                .for_order(&staged.order_id),
        );
        Err(KitchenError::Timeout {
            action: staged.action,
        })
    } else {
        notices.show(
            Notice::error(format!("Failed to {}, please try again", staged.action)).for_order(&staged.order_id),
        );
        Err(KitchenError::Service(error))
    }
}
