//! The screen as seen by the realtime bridge and the voice pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use kitchen_core::{Order, OrderId, OrderStatus, ScreenView, TimerHandle};
use realtime_bridge::{BridgeError, InboundEvent, RefreshReason, Refresher};
use tokio::sync::watch;
use tracing::{debug, info};
use voice_pipeline::{CommandSink, DispatchError};

use crate::screen::KitchenScreen;

#[async_trait]
impl Refresher for KitchenScreen {
    async fn refresh(&self, reason: RefreshReason) -> Result<(), BridgeError> {
        debug!(reason = ?reason, "Refresh requested by inbound event");
        KitchenScreen::refresh(self)
            .await
            .map(|_| ())
            .map_err(|e| BridgeError::Refresh(e.to_string()))
    }
}

#[async_trait]
impl CommandSink for KitchenScreen {
    fn subscribe_orders(&self) -> watch::Receiver<Arc<Vec<Order>>> {
        self.store.subscribe()
    }

    async fn change_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<(), DispatchError> {
        KitchenScreen::change_status(self, order_id, status)
            .await
            .map(|_| ())
            .map_err(DispatchError::from)
    }

    fn show_view(&self, view: ScreenView) {
        KitchenScreen::show_view(self, view)
    }
}

impl KitchenScreen {
    /// Consume inbound room events in the background, refreshing on each
    /// relevant one.
    pub fn spawn_inbound<S>(self: &Arc<Self>, events: S) -> TimerHandle
    where
        S: Stream<Item = Result<InboundEvent, BridgeError>> + Unpin + Send + 'static,
    {
        let bridge = self.bridge.clone();
        let screen = Arc::clone(self);
        info!(room = %bridge.room(), "Listening for room events");
        self.scheduler.spawn(async move {
            let refreshes = bridge.run_inbound(events, screen).await;
            info!(refreshes, "Room listener finished");
        })
    }
}
