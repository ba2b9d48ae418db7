//! Order and item status state machine.
//!
//! Orders move strictly forward: `pending → preparing → ready → completed`.
//! Items toggle between `pending` and `fulfilled`, but only while their order
//! is `preparing`. `completed` is terminal.
//!
//! `check_*` functions validate a transition without touching the order.
//! `apply_*` functions perform it and assume the matching check passed.
//! Going backwards is never a transition; it is an undo from the action
//! history.

use chrono::{DateTime, Utc};

use crate::error::TransitionError;
use crate::order::{ItemStatus, Order, OrderStatus};

/// A forward status transition requested by a user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// `pending → preparing`.
    Accept,
    /// `preparing → ready`.
    MarkReady,
    /// `ready → completed`, or `preparing → completed` via the explicit complete action.
    Complete,
}

impl StatusTransition {
    /// The status the order will have after the transition.
    pub fn target(&self) -> OrderStatus {
        match self {
            Self::Accept => OrderStatus::Preparing,
            Self::MarkReady => OrderStatus::Ready,
            Self::Complete => OrderStatus::Completed,
        }
    }

    /// Map a requested target status to the transition that reaches it.
    ///
    /// `pending` is never a target.
    pub fn for_target(target: OrderStatus) -> Option<Self> {
        match target {
            OrderStatus::Pending => None,
            OrderStatus::Preparing => Some(Self::Accept),
            OrderStatus::Ready => Some(Self::MarkReady),
            OrderStatus::Completed => Some(Self::Complete),
        }
    }

    /// Whether the transition is legal from `from`.
    pub fn allowed_from(&self, from: OrderStatus) -> bool {
        match self {
            Self::Accept => from == OrderStatus::Pending,
            Self::MarkReady => from == OrderStatus::Preparing,
            Self::Complete => matches!(from, OrderStatus::Preparing | OrderStatus::Ready),
        }
    }
}

/// Validate a transition against the order's current status.
pub fn check(order: &Order, transition: StatusTransition) -> Result<(), TransitionError> {
    if transition.allowed_from(order.status) {
        Ok(())
    } else {
        Err(TransitionError::IllegalStatus {
            order_id: order.id.clone(),
            from: order.status,
            to: transition.target(),
        })
    }
}

/// Validate an accept (`pending → preparing`).
pub fn check_accept(order: &Order) -> Result<(), TransitionError> {
    check(order, StatusTransition::Accept)
}

/// Validate a mark-ready (`preparing → ready`).
pub fn check_mark_ready(order: &Order) -> Result<(), TransitionError> {
    check(order, StatusTransition::MarkReady)
}

/// Validate a completion.
pub fn check_complete(order: &Order) -> Result<(), TransitionError> {
    check(order, StatusTransition::Complete)
}

/// Validate an item status change.
///
/// Returns `Ok(false)` when the item already has the requested status; the
/// change is then a no-op.
pub fn check_item_status(order: &Order, index: usize, status: ItemStatus) -> Result<bool, TransitionError> {
    if order.status != OrderStatus::Preparing {
        return Err(TransitionError::ItemsLocked {
            order_id: order.id.clone(),
            status: order.status,
        });
    }

    let item = order.items.get(index).ok_or_else(|| TransitionError::ItemOutOfRange {
        order_id: order.id.clone(),
        index,
    })?;

    Ok(item.status != status)
}

/// Move the order to `preparing`.
///
/// `started_at` comes from the order service. An order that already carries a
/// start time (accepted before, then undone) keeps its original one.
pub fn apply_accept(order: &mut Order, started_at: DateTime<Utc>, now: DateTime<Utc>) {
    order.status = OrderStatus::Preparing;
    if order.started_at.is_none() {
        order.started_at = Some(started_at);
    }
    order.updated_at = now;
}

/// Move the order to `ready`.
pub fn apply_mark_ready(order: &mut Order, now: DateTime<Utc>) {
    order.status = OrderStatus::Ready;
    order.updated_at = now;
}

/// Move the order to `completed`.
pub fn apply_complete(order: &mut Order, now: DateTime<Utc>) {
    order.status = OrderStatus::Completed;
    order.completed_at = Some(now);
    order.updated_at = now;
}

/// Apply any transition. Accept uses `now` as a provisional start time
/// until the service returns the authoritative one.
pub fn apply(order: &mut Order, transition: StatusTransition, now: DateTime<Utc>) {
    match transition {
        StatusTransition::Accept => apply_accept(order, now, now),
        StatusTransition::MarkReady => apply_mark_ready(order, now),
        StatusTransition::Complete => apply_complete(order, now),
    }
}

/// Set an item's status. The index must have passed [`check_item_status`].
pub fn apply_item_status(order: &mut Order, index: usize, status: ItemStatus, now: DateTime<Utc>) {
    if let Some(item) = order.items.get_mut(index) {
        item.status = status;
        order.updated_at = now;
    }
}

/// Restore a snapshot over the current order without losing `started_at`.
///
/// Used by undo/redo: a start time, once recorded, is never cleared.
pub fn restore(snapshot: &Order, current: Option<&Order>) -> Order {
    let mut restored = snapshot.clone();
    if let Some(current) = current {
        restored.started_at = current.started_at.or(snapshot.started_at);
    }
    if restored.status != OrderStatus::Completed {
        restored.completed_at = None;
    }
    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderItem;
    use chrono::Duration;

    fn order(status: OrderStatus) -> Order {
        Order::new("o1", "7", Utc::now())
            .with_item(OrderItem::new("Burger", 1, 9.0))
            .with_status(status)
    }

    #[test]
    fn test_accept_only_from_pending() {
        assert!(check_accept(&order(OrderStatus::Pending)).is_ok());
        for status in [OrderStatus::Preparing, OrderStatus::Ready, OrderStatus::Completed] {
            let err = check_accept(&order(status)).unwrap_err();
            assert!(matches!(err, TransitionError::IllegalStatus { .. }));
        }
    }

    #[test]
    fn test_mark_ready_only_from_preparing() {
        assert!(check_mark_ready(&order(OrderStatus::Preparing)).is_ok());
        for status in [OrderStatus::Pending, OrderStatus::Ready, OrderStatus::Completed] {
            assert_eq!(
                check_mark_ready(&order(status)).unwrap_err().user_message(),
                "Status cannot be changed at this stage"
            );
        }
    }

    #[test]
    fn test_complete_never_from_pending_or_completed() {
        assert!(check_complete(&order(OrderStatus::Ready)).is_ok());
        assert!(check_complete(&order(OrderStatus::Preparing)).is_ok());
        assert!(check_complete(&order(OrderStatus::Pending)).is_err());
        assert!(check_complete(&order(OrderStatus::Completed)).is_err());
    }

    #[test]
    fn test_accept_sets_started_at_once() {
        let mut o = order(OrderStatus::Pending);
        let server_time = Utc::now() - Duration::minutes(3);
        apply_accept(&mut o, server_time, Utc::now());
        assert_eq!(o.status, OrderStatus::Preparing);
        assert_eq!(o.started_at, Some(server_time));

        o.status = OrderStatus::Pending;
        apply_accept(&mut o, Utc::now(), Utc::now());
        assert_eq!(o.started_at, Some(server_time));
    }

    #[test]
    fn test_item_status_requires_preparing() {
        let ready = order(OrderStatus::Ready);
        assert!(matches!(
            check_item_status(&ready, 0, ItemStatus::Fulfilled),
            Err(TransitionError::ItemsLocked { .. })
        ));

        let preparing = order(OrderStatus::Preparing);
        assert_eq!(check_item_status(&preparing, 0, ItemStatus::Fulfilled), Ok(true));
        assert_eq!(check_item_status(&preparing, 0, ItemStatus::Pending), Ok(false));
        assert!(matches!(
            check_item_status(&preparing, 3, ItemStatus::Fulfilled),
            Err(TransitionError::ItemOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn test_complete_sets_completed_at() {
        let mut o = order(OrderStatus::Ready);
        let now = Utc::now();
        apply_complete(&mut o, now);
        assert_eq!(o.completed_at, Some(now));
    }

    #[test]
    fn test_restore_keeps_started_at() {
        let pending = order(OrderStatus::Pending);
        let mut preparing = pending.clone();
        apply_accept(&mut preparing, Utc::now(), Utc::now());

        let restored = restore(&pending, Some(&preparing));
        assert_eq!(restored.status, OrderStatus::Pending);
        assert_eq!(restored.started_at, preparing.started_at);
    }

    #[test]
    fn test_for_target() {
        assert_eq!(StatusTransition::for_target(OrderStatus::Pending), None);
        assert_eq!(
            StatusTransition::for_target(OrderStatus::Ready),
            Some(StatusTransition::MarkReady)
        );
    }
}
