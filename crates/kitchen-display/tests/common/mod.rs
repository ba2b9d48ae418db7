//! Shared fixtures for kitchen screen tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use chrono::{DateTime, Duration, TimeZone, Utc};
use kitchen_core::{Clock, ItemStatus, Order, OrderItem, OrderStatus};
use kitchen_display::{KitchenConfig, KitchenScreen, UndoPolicy};
use mock_services::{InMemoryOrderService, ManualClock, RecordingChannel, RecordingNotices, RecordingRoleNotifier};
use realtime_bridge::{BridgeConfig, RealtimeBridge};

pub struct Harness {
    pub screen: Arc<KitchenScreen>,
    pub service: Arc<InMemoryOrderService>,
    pub notices: Arc<RecordingNotices>,
    pub channel: Arc<RecordingChannel>,
    pub roles: Arc<RecordingRoleNotifier>,
    pub clock: Arc<ManualClock>,
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

/// The board every test starts from, before numbering:
///
/// - `p-1` (#101) pending, two items
/// - `c-1` (#102) preparing, started ten minutes ago, one item fulfilled
/// - `r-1` (#103) ready
pub fn board() -> Vec<Order> {
    let base = t0() - Duration::minutes(30);
    let mut fulfilled = OrderItem::new("Fries", 1, 3.5);
    fulfilled.status = ItemStatus::Fulfilled;
    vec![
        Order::new("p-1", "101", base)
            .with_item(OrderItem::new("Burger", 2, 9.0).with_prep_time(8))
            .with_item(OrderItem::new("Shake", 1, 4.5)),
        Order::new("c-1", "102", base + Duration::minutes(1))
            .with_status(OrderStatus::Preparing)
            .with_started_at(t0() - Duration::minutes(10))
            .with_item(OrderItem::new("Ramen", 1, 13.0).with_prep_time(15))
            .with_item(fulfilled),
        Order::new("r-1", "103", base + Duration::minutes(2))
            .with_status(OrderStatus::Ready)
            .with_started_at(t0() - Duration::minutes(20))
            .with_item(OrderItem::new("Salad", 1, 7.0)),
    ]
}

pub async fn harness_with(config: KitchenConfig) -> Harness {
    let service = Arc::new(InMemoryOrderService::with_orders(board()));
    let notices = Arc::new(RecordingNotices::new());
    let channel = Arc::new(RecordingChannel::new());
    let roles = Arc::new(RecordingRoleNotifier::new());
    let clock = Arc::new(ManualClock::new(t0()));

    let bridge = RealtimeBridge::new(BridgeConfig::new("http://rt.test", "r1", "kds-1"), channel.clone());
    let screen = KitchenScreen::builder(config, service.clone(), bridge)
        .notifier(roles.clone())
        .notices(notices.clone())
        .clock(clock.clone())
        .build();

    screen.refresh().await.unwrap();
    service.clear_calls();

    Harness {
        screen,
        service,
        notices,
        channel,
        roles,
        clock,
    }
}

pub async fn harness(policy: UndoPolicy) -> Harness {
    harness_with(KitchenConfig::new("r1").with_undo_policy(policy)).await
}

/// A second screen over the harness service and channel, reading `clock`.
pub async fn screen_with_clock(h: &Harness, clock: Arc<dyn Clock>) -> Arc<KitchenScreen> {
    let bridge = RealtimeBridge::new(BridgeConfig::new("http://rt.test", "r1", "kds-1"), h.channel.clone());
    let screen = KitchenScreen::builder(KitchenConfig::new("r1"), h.service.clone(), bridge)
        .notices(h.notices.clone())
        .clock(clock)
        .build();
    screen.refresh().await.unwrap();
    h.service.clear_calls();
    screen
}

/// Pinned at [`t0`]. Once armed, the first `parties` readers block until
/// all of them have arrived, lining concurrent actions up on one instant.
#[derive(Debug)]
pub struct RendezvousClock {
    parties: usize,
    barrier: Barrier,
    armed: AtomicBool,
    arrived: AtomicUsize,
}

impl RendezvousClock {
    pub fn new(parties: usize) -> Self {
        Self {
            parties,
            barrier: Barrier::new(parties),
            armed: AtomicBool::new(false),
            arrived: AtomicUsize::new(0),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl Clock for RendezvousClock {
    fn now(&self) -> DateTime<Utc> {
        if self.armed.load(Ordering::SeqCst) && self.arrived.fetch_add(1, Ordering::SeqCst) < self.parties {
            self.barrier.wait();
        }
        t0()
    }
}

/// Status, item states and start time.
pub type Shape = (OrderStatus, Vec<ItemStatus>, Option<DateTime<Utc>>);

/// What undo/redo must restore.
pub fn shape(order: &Order) -> Shape {
    (
        order.status,
        order.items.iter().map(|i| i.status).collect(),
        order.started_at,
    )
}
