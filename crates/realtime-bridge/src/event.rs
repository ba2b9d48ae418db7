//! Event payloads exchanged over the restaurant room.

use chrono::{DateTime, Utc};
use kitchen_core::{Order, OrderId, OrderStatus};
use serde::{Deserialize, Serialize};

/// What happened to the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    StatusChanged,
    ItemStatusChanged,
    OrderAdded,
    OrderRemoved,
}

/// "An order changed" notification published after a confirmed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub restaurant_id: String,
    pub order_id: OrderId,
    pub order_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
    /// Terminal that produced the change.
    pub origin: String,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Build an event describing `order` as it is now.
    pub fn for_order(
        kind: ChangeKind,
        restaurant_id: impl Into<String>,
        origin: impl Into<String>,
        order: &Order,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            restaurant_id: restaurant_id.into(),
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            status: Some(order.status),
            item_index: None,
            origin: origin.into(),
            at,
        }
    }

    /// Attach the item line that changed.
    pub fn with_item_index(mut self, index: usize) -> Self {
        self.item_index = Some(index);
        self
    }
}

/// Events received from the restaurant room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Notification originated by an admin (new order, edit, cancellation).
    AdminNotification {
        #[serde(default)]
        message: Option<String>,
        #[serde(default, rename = "orderId")]
        order_id: Option<OrderId>,
    },

    /// Another screen changed an order.
    OrderChanged(ChangeEvent),
}

impl InboundEvent {
    /// Terminal that produced the event, when known.
    pub fn origin(&self) -> Option<&str> {
        match self {
            Self::AdminNotification { .. } => None,
            Self::OrderChanged(event) => Some(event.origin.as_str()),
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AdminNotification { .. } => "admin_notification",
            Self::OrderChanged(_) => "order_changed",
        }
    }
}
