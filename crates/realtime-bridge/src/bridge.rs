//! Outbound publishing and inbound refresh handling.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use kitchen_core::Order;
use tracing::{debug, info, warn};

use crate::channel::ChangeChannel;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::event::{ChangeEvent, ChangeKind, InboundEvent};

/// Why a refresh was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshReason {
    /// An admin-originated notification arrived.
    AdminNotification,
    /// Another screen changed an order.
    RemoteChange(ChangeEvent),
}

/// Hook that reloads the full order list from the order service.
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh(&self, reason: RefreshReason) -> Result<(), BridgeError>;
}

/// Publishes change events to the restaurant room and consumes inbound ones.
#[derive(Clone)]
pub struct RealtimeBridge {
    config: BridgeConfig,
    channel: Arc<dyn ChangeChannel>,
}

impl RealtimeBridge {
    /// Create a bridge publishing through `channel`.
    pub fn new(config: BridgeConfig, channel: Arc<dyn ChangeChannel>) -> Self {
        Self { config, channel }
    }

    /// The restaurant room name.
    pub fn room(&self) -> String {
        self.config.room()
    }

    /// Get the configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Publish a change to `order`.
    ///
    /// Publishing happens after the mutation is confirmed, so a failure here
    /// is logged and returned but never rolls anything back.
    pub async fn publish_change(
        &self,
        kind: ChangeKind,
        order: &Order,
        item_index: Option<usize>,
        at: DateTime<Utc>,
    ) -> Result<(), BridgeError> {
        let mut event = ChangeEvent::for_order(
            kind,
            &self.config.restaurant_id,
            &self.config.terminal_id,
            order,
            at,
        );
        event.item_index = item_index;

        let room = self.room();
        debug!(room = %room, order_id = %order.id, kind = ?kind, "Publishing change");
        if let Err(e) = self.channel.publish(&room, &event).await {
            warn!(room = %room, order_id = %order.id, error = %e, "CHANGE_PUBLISH_FAILED");
            return Err(e);
        }
        Ok(())
    }

    /// Decide whether an inbound event should trigger a refresh.
    ///
    /// Our own echoes are ignored.
    pub fn refresh_reason(&self, event: InboundEvent) -> Option<RefreshReason> {
        match event {
            InboundEvent::AdminNotification { .. } => Some(RefreshReason::AdminNotification),
            InboundEvent::OrderChanged(change) => {
                if change.origin == self.config.terminal_id {
                    None
                } else {
                    Some(RefreshReason::RemoteChange(change))
                }
            }
        }
    }

    /// Consume inbound events until the stream ends, refreshing on each
    /// relevant one. Returns the number of refreshes performed.
    ///
    /// Stream and refresh errors are logged and do not stop the loop.
    pub async fn run_inbound<S, R>(&self, mut events: S, refresher: Arc<R>) -> usize
    where
        S: Stream<Item = Result<InboundEvent, BridgeError>> + Unpin + Send,
        R: Refresher + ?Sized,
    {
        let mut refreshes = 0;
        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "INBOUND_EVENT_ERROR");
                    continue;
                }
            };

            let label = event.label();
            let Some(reason) = self.refresh_reason(event) else {
                debug!("Ignoring own {} echo", label);
                continue;
            };

            info!(event = label, "Inbound event, refreshing orders");
            match refresher.refresh(reason).await {
                Ok(()) => refreshes += 1,
                Err(e) => warn!(error = %e, "INBOUND_REFRESH_FAILED"),
            }
        }
        info!("Inbound event stream ended");
        refreshes
    }
}

impl std::fmt::Debug for RealtimeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeBridge")
            .field("room", &self.room())
            .field("terminal_id", &self.config.terminal_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::NoOpChannel;
    use kitchen_core::OrderStatus;

    fn bridge() -> RealtimeBridge {
        RealtimeBridge::new(BridgeConfig::new("http://rt", "r1", "kds-1"), Arc::new(NoOpChannel))
    }

    fn change(origin: &str) -> InboundEvent {
        let order = Order::new("o1", "3", Utc::now()).with_status(OrderStatus::Ready);
        InboundEvent::OrderChanged(ChangeEvent::for_order(
            ChangeKind::StatusChanged,
            "r1",
            origin,
            &order,
            Utc::now(),
        ))
    }

    #[test]
    fn test_own_echo_is_ignored() {
        assert_eq!(bridge().refresh_reason(change("kds-1")), None);
        assert!(matches!(
            bridge().refresh_reason(change("kds-2")),
            Some(RefreshReason::RemoteChange(_))
        ));
    }

    #[test]
    fn test_admin_notification_refreshes() {
        let event = InboundEvent::AdminNotification {
            message: None,
            order_id: None,
        };
        assert_eq!(bridge().refresh_reason(event), Some(RefreshReason::AdminNotification));
    }

    #[tokio::test]
    async fn test_publish_through_noop() {
        let order = Order::new("o1", "3", Utc::now());
        bridge()
            .publish_change(ChangeKind::OrderAdded, &order, None, Utc::now())
            .await
            .unwrap();
    }
}
