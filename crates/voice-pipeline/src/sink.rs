//! Where dispatched voice commands land.

use std::sync::Arc;

use async_trait::async_trait;
use kitchen_core::{Order, OrderId, OrderStatus, ScreenView};
use tokio::sync::watch;

use crate::error::DispatchError;

/// The kitchen screen as seen by the voice pipeline.
///
/// Status changes must go through the same path as the screen's buttons so
/// the state machine, optimistic protocol and history apply unchanged.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Live snapshots of the orders on the board.
    fn subscribe_orders(&self) -> watch::Receiver<Arc<Vec<Order>>>;

    /// Move an order to `status`.
    async fn change_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<(), DispatchError>;

    /// Switch the screen view.
    fn show_view(&self, view: ScreenView);
}
