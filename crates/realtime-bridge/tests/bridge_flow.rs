//! Publishing and inbound refresh through recording collaborators.

use std::sync::Arc;

use chrono::Utc;
use futures::stream;
use kitchen_core::{Order, OrderStatus};
use mock_services::{CountingRefresher, RecordingChannel};
use realtime_bridge::{
    BridgeConfig, BridgeError, ChangeEvent, ChangeKind, InboundEvent, RealtimeBridge, RefreshReason,
};

fn bridge(channel: Arc<RecordingChannel>) -> RealtimeBridge {
    RealtimeBridge::new(BridgeConfig::new("http://rt.local", "r7", "kds-1"), channel)
}

fn remote_change(origin: &str) -> InboundEvent {
    let order = Order::new("o1", "14", Utc::now()).with_status(OrderStatus::Ready);
    InboundEvent::OrderChanged(ChangeEvent::for_order(
        ChangeKind::StatusChanged,
        "r7",
        origin,
        &order,
        Utc::now(),
    ))
}

#[tokio::test]
async fn test_publish_is_scoped_to_restaurant_room() {
    let channel = Arc::new(RecordingChannel::new());
    let order = Order::new("o1", "14", Utc::now()).with_status(OrderStatus::Preparing);

    bridge(channel.clone())
        .publish_change(ChangeKind::ItemStatusChanged, &order, Some(1), Utc::now())
        .await
        .unwrap();

    let events = channel.events();
    assert_eq!(events.len(), 1);
    let (room, event) = &events[0];
    assert_eq!(room, "restaurant:r7");
    assert_eq!(event.restaurant_id, "r7");
    assert_eq!(event.origin, "kds-1");
    assert_eq!(event.item_index, Some(1));
    assert_eq!(event.status, Some(OrderStatus::Preparing));
}

#[tokio::test]
async fn test_publish_failure_is_returned() {
    let channel = Arc::new(RecordingChannel::new());
    channel.set_failing(true);
    let order = Order::new("o1", "14", Utc::now());

    let result = bridge(channel.clone())
        .publish_change(ChangeKind::OrderAdded, &order, None, Utc::now())
        .await;

    assert!(matches!(result, Err(BridgeError::Rejected { status: 502, .. })));
    assert_eq!(channel.len(), 1);
}

#[tokio::test]
async fn test_inbound_events_trigger_full_refresh() {
    let refresher = Arc::new(CountingRefresher::new());
    let events = stream::iter(vec![
        Ok(InboundEvent::AdminNotification {
            message: Some("New order".to_string()),
            order_id: None,
        }),
        Ok(remote_change("kds-1")),
        Err(BridgeError::Sse("connection reset".to_string())),
        Ok(remote_change("kds-2")),
    ]);

    let refreshes = bridge(Arc::new(RecordingChannel::new()))
        .run_inbound(events, refresher.clone())
        .await;

    assert_eq!(refreshes, 2);
    let reasons = refresher.reasons();
    assert_eq!(reasons[0], RefreshReason::AdminNotification);
    assert!(matches!(&reasons[1], RefreshReason::RemoteChange(e) if e.origin == "kds-2"));
}

#[tokio::test]
async fn test_refresh_failures_do_not_stop_the_loop() {
    let refresher = Arc::new(CountingRefresher::new());
    refresher.set_failing(true);
    let events = stream::iter(vec![Ok(remote_change("kds-2")), Ok(remote_change("kds-3"))]);

    let refreshes = bridge(Arc::new(RecordingChannel::new()))
        .run_inbound(events, refresher.clone())
        .await;

    assert_eq!(refreshes, 0);
    assert_eq!(refresher.count(), 2);
}
