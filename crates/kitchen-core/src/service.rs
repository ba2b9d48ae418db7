//! External order service boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ServiceError;
use crate::order::{ItemStatus, OrderId, Order, OrderStatus};

/// The external order API that owns persistence.
///
/// Implementations return validated domain types; malformed payloads are
/// reported as [`ServiceError::InvalidResponse`]. Time bounds are applied by
/// the caller, so implementations may block for as long as the transport
/// allows.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Fetch all active kitchen orders.
    async fn fetch_active_orders(&self) -> Result<Vec<Order>, ServiceError>;

    /// Accept an order and return the authoritative start time.
    async fn accept_order(&self, order_id: &OrderId) -> Result<DateTime<Utc>, ServiceError>;

    /// Set an order's status.
    async fn update_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<(), ServiceError>;

    /// Set one item's status.
    async fn update_item_status(
        &self,
        order_id: &OrderId,
        item_index: usize,
        status: ItemStatus,
    ) -> Result<(), ServiceError>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// A status update addressed to other restaurant roles (e.g. front of house).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleNotification {
    pub restaurant_id: String,
    pub order_id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub message: String,
    pub roles: Vec<String>,
}

impl RoleNotification {
    /// Build the standard "order is now <status>" notification.
    pub fn status_changed(restaurant_id: impl Into<String>, order: &Order, roles: &[String]) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            status: order.status,
            message: format!("Order #{} is now {}", order.order_number, order.status),
            roles: roles.to_vec(),
        }
    }
}

/// Fire-and-forget side channel informing other roles of status changes.
#[async_trait]
pub trait RoleNotifier: Send + Sync {
    async fn notify(&self, notification: RoleNotification) -> Result<(), ServiceError>;
}

/// A notifier that drops every notification.
#[derive(Debug, Clone, Default)]
pub struct NoOpRoleNotifier;

#[async_trait]
impl RoleNotifier for NoOpRoleNotifier {
    async fn notify(&self, _notification: RoleNotification) -> Result<(), ServiceError> {
        Ok(())
    }
}
