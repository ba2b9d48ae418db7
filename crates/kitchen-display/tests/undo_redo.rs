//! Undo and redo under both policies.

mod common;

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use common::{harness, shape, t0, Harness, Shape};
use kitchen_core::{ActionKind, ItemStatus, NoticeLevel, Order, OrderId, OrderStatus};
use kitchen_display::{KitchenError, UndoPolicy};
use mock_services::{Failure, ServiceCall};
use realtime_bridge::ChangeKind;

fn id(s: &str) -> OrderId {
    OrderId::new(s)
}

/// One action of each recorded kind.
#[derive(Debug, Clone, Copy)]
enum Action {
    Accept,
    MarkReady,
    Complete,
    Item,
    Add,
    Dismiss,
}

const ACTIONS: [Action; 6] = [
    Action::Accept,
    Action::MarkReady,
    Action::Complete,
    Action::Item,
    Action::Add,
    Action::Dismiss,
];

impl Action {
    fn target(&self) -> OrderId {
        match self {
            Self::Accept => id("p-1"),
            Self::MarkReady | Self::Item => id("c-1"),
            Self::Complete | Self::Dismiss => id("r-1"),
            Self::Add => id("walk-in"),
        }
    }

    async fn perform(&self, h: &Harness) {
        let target = self.target();
        match self {
            Self::Accept => drop(h.screen.accept_order(&target).await.unwrap()),
            Self::MarkReady => drop(h.screen.mark_ready(&target).await.unwrap()),
            Self::Complete => drop(h.screen.complete_order(&target).await.unwrap()),
            Self::Item => drop(
                h.screen
                    .set_item_status(&target, 0, ItemStatus::Fulfilled)
                    .await
                    .unwrap(),
            ),
            Self::Add => drop(h.screen.add_order(Order::new("walk-in", "200", t0())).await.unwrap()),
            Self::Dismiss => drop(h.screen.dismiss_order(&target).await.unwrap()),
        }
    }
}

async fn state(h: &Harness, order_id: &OrderId) -> Option<Shape> {
    h.screen.order(order_id).await.as_ref().map(shape)
}

async fn round_trip(policy: UndoPolicy) {
    for action in ACTIONS {
        let h = harness(policy).await;
        let target = action.target();
        let before = state(&h, &target).await;

        action.perform(&h).await;
        let after = state(&h, &target).await;
        assert_ne!(before, after, "{:?} changed nothing", action);

        assert!(h.screen.undo().await.unwrap(), "{:?} could not be undone", action);
        let undone = state(&h, &target).await;
        match action {
            // The start time survives undoing an accept.
            Action::Accept => {
                let (status, items, started_at) = undone.clone().unwrap();
                let (_, before_items, _) = before.clone().unwrap();
                assert_eq!(status, OrderStatus::Pending);
                assert_eq!(items, before_items);
                assert!(started_at.is_some());
            }
            _ => assert_eq!(undone, before, "{:?} undo under {:?}", action, policy),
        }

        assert!(h.screen.redo().await.unwrap(), "{:?} could not be redone", action);
        assert_eq!(state(&h, &target).await, after, "{:?} redo under {:?}", action, policy);
    }
}

#[tokio::test]
async fn test_local_undo_redo_restores_every_action() {
    round_trip(UndoPolicy::Local).await;
}

#[tokio::test]
async fn test_compensating_undo_redo_restores_every_action() {
    round_trip(UndoPolicy::Compensating).await;
}

#[tokio::test]
async fn test_local_undo_makes_no_service_calls() {
    let h = harness(UndoPolicy::Local).await;
    h.screen.mark_ready(&id("c-1")).await.unwrap();
    h.service.clear_calls();

    h.screen.undo().await.unwrap();
    h.screen.redo().await.unwrap();
    assert!(h.service.calls().is_empty());
}

#[tokio::test]
async fn test_compensating_undo_sends_reverse_updates() {
    let h = harness(UndoPolicy::Compensating).await;
    h.screen.mark_ready(&id("c-1")).await.unwrap();
    h.screen.complete_order(&id("r-1")).await.unwrap();
    h.service.clear_calls();

    h.screen.undo().await.unwrap();
    h.screen.undo().await.unwrap();
    h.screen.redo().await.unwrap();

    assert_eq!(
        h.service.mutations(),
        vec![
            ServiceCall::UpdateStatus(id("r-1"), OrderStatus::Ready),
            ServiceCall::UpdateStatus(id("c-1"), OrderStatus::Preparing),
            ServiceCall::UpdateStatus(id("c-1"), OrderStatus::Ready),
        ]
    );
}

#[tokio::test]
async fn test_compensating_item_undo() {
    let h = harness(UndoPolicy::Compensating).await;
    h.screen.toggle_item(&id("c-1"), 1).await.unwrap();
    h.service.clear_calls();

    h.screen.undo().await.unwrap();
    assert_eq!(
        h.service.mutations(),
        vec![ServiceCall::UpdateItemStatus(id("c-1"), 1, ItemStatus::Fulfilled)]
    );
    assert_eq!(
        h.screen.order(&id("c-1")).await.unwrap().items[1].status,
        ItemStatus::Fulfilled
    );
}

#[tokio::test]
async fn test_failed_compensation_reverts_and_keeps_cursor() {
    let h = harness(UndoPolicy::Compensating).await;
    h.screen.mark_ready(&id("c-1")).await.unwrap();
    h.service.set_failure(Some(Failure::Status(500)));

    let err = h.screen.undo().await.unwrap_err();
    assert!(matches!(err, KitchenError::Service(_)));
    assert_eq!(h.screen.order(&id("c-1")).await.unwrap().status, OrderStatus::Ready);
    assert!(h.screen.can_undo().await);
    assert!(!h.screen.can_redo().await);

    h.service.set_failure(None);
    assert!(h.screen.undo().await.unwrap());
    assert_eq!(h.screen.order(&id("c-1")).await.unwrap().status, OrderStatus::Preparing);
}

#[tokio::test(start_paused = true)]
async fn test_slow_compensation_does_not_hold_up_other_orders() {
    let h = harness(UndoPolicy::Compensating).await;
    h.screen.mark_ready(&id("c-1")).await.unwrap();
    h.service.set_order_failure(&id("c-1"), Some(Failure::Hang));

    let screen = h.screen.clone();
    let undo = tokio::spawn(async move { screen.undo().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!undo.is_finished());

    let started = tokio::time::Instant::now();
    h.screen.accept_order(&id("p-1")).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!undo.is_finished());
    assert_eq!(
        h.notices.messages(NoticeLevel::Success).last().map(String::as_str),
        Some("Order #101 accepted")
    );

    let err = undo.await.unwrap().unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(h.screen.order(&id("c-1")).await.unwrap().status, OrderStatus::Ready);
    assert_eq!(h.screen.history().await.len(), 2);
    assert!(h.screen.can_undo().await);
    assert!(!h.screen.can_redo().await);
}

#[tokio::test]
async fn test_undo_keeps_start_time_after_reaccept() {
    let h = harness(UndoPolicy::Local).await;
    let first = t0() - ChronoDuration::seconds(30);
    h.service.set_started_at(first);
    h.screen.accept_order(&id("p-1")).await.unwrap();
    h.screen.undo().await.unwrap();

    h.service.set_started_at(t0());
    let order = h.screen.accept_order(&id("p-1")).await.unwrap();
    assert_eq!(order.started_at, Some(first));
}

#[tokio::test]
async fn test_new_action_discards_redo_branch() {
    let h = harness(UndoPolicy::Local).await;
    h.screen.mark_ready(&id("c-1")).await.unwrap();
    h.screen.undo().await.unwrap();
    assert!(h.screen.can_redo().await);

    h.screen.accept_order(&id("p-1")).await.unwrap();
    assert!(!h.screen.can_redo().await);
    assert!(!h.screen.redo().await.unwrap());

    let kinds: Vec<_> = h.screen.history().await.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![ActionKind::StatusChange]);
    assert_eq!(h.screen.history().await[0].order_id, id("p-1"));
}

#[tokio::test]
async fn test_nothing_to_undo() {
    let h = harness(UndoPolicy::Compensating).await;
    assert!(!h.screen.undo().await.unwrap());
    assert!(!h.screen.redo().await.unwrap());
    assert!(h.service.calls().is_empty());
}

#[tokio::test]
async fn test_undo_and_redo_are_broadcast() {
    let h = harness(UndoPolicy::Local).await;
    h.screen.dismiss_order(&id("r-1")).await.unwrap();
    h.screen.undo().await.unwrap();
    h.screen.redo().await.unwrap();

    let kinds: Vec<_> = h.channel.events().into_iter().map(|(_, e)| e.kind).collect();
    assert_eq!(
        kinds,
        vec![ChangeKind::OrderRemoved, ChangeKind::OrderAdded, ChangeKind::OrderRemoved]
    );
}
