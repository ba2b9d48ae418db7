//! Derived board views.
//!
//! Pure functions over a store snapshot. None of them mutate an order.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use kitchen_core::readiness::{self, Readiness};
use kitchen_core::{ItemStatus, Order, OrderId, OrderStatus};
use serde::Serialize;

/// One line of the all-day view: how many of an item are still to make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllDayLine {
    pub name: String,
    /// Quantity on lines not yet fulfilled.
    pub remaining: u32,
    /// Quantity across every open line.
    pub total: u32,
}

/// Remaining prep time of one order, refreshed by the ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReadiness {
    pub order_id: OrderId,
    pub order_number: String,
    pub readiness: Readiness,
}

/// Orders still in the kitchen, oldest first.
pub fn active_orders(orders: &[Order]) -> Vec<Order> {
    let mut active: Vec<Order> = orders.iter().filter(|o| o.status.is_active()).cloned().collect();
    active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    active
}

/// Item totals across pending and preparing orders, in first-seen order.
pub fn all_day(orders: &[Order]) -> Vec<AllDayLine> {
    let active = active_orders(orders);
    let mut lines: IndexMap<&str, AllDayLine> = IndexMap::new();
    for order in active
        .iter()
        .filter(|o| matches!(o.status, OrderStatus::Pending | OrderStatus::Preparing))
    {
        for item in &order.items {
            let line = lines.entry(item.name.as_str()).or_insert_with(|| AllDayLine {
                name: item.name.clone(),
                remaining: 0,
                total: 0,
            });
            line.total = line.total.saturating_add(item.quantity);
            if item.status != ItemStatus::Fulfilled {
                line.remaining = line.remaining.saturating_add(item.quantity);
            }
        }
    }
    lines.into_values().collect()
}

/// Orders completed at or after `since`, newest first.
pub fn recently_completed(orders: &[Order], since: DateTime<Utc>) -> Vec<Order> {
    let mut done: Vec<Order> = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Completed && o.completed_at.is_some_and(|at| at >= since))
        .cloned()
        .collect();
    done.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    done
}

/// Readiness of every order still being worked on.
pub fn readiness_board(orders: &[Order], now: DateTime<Utc>) -> Vec<OrderReadiness> {
    active_orders(orders)
        .into_iter()
        .filter(|o| matches!(o.status, OrderStatus::Pending | OrderStatus::Preparing))
        .map(|o| OrderReadiness {
            readiness: readiness::readiness(&o, now),
            order_id: o.id,
            order_number: o.order_number,
        })
        .collect()
}
