//! Once-a-second readiness tick.
//!
//! The tick only recomputes remaining prep times from the current snapshot
//! and publishes them. It never changes an order.

use std::sync::Arc;
use std::time::Duration;

use kitchen_core::TimerHandle;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::screen::KitchenScreen;
use crate::views::{self, OrderReadiness};

/// How often remaining prep times are recomputed.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

impl KitchenScreen {
    /// Start recomputing readiness every [`TICK_INTERVAL`].
    ///
    /// The ticker holds a weak reference, so it stops on its own once the
    /// screen is dropped.
    pub fn start_ticker(self: &Arc<Self>) -> TimerHandle {
        let weak = Arc::downgrade(self);
        let handle = self.scheduler.every(TICK_INTERVAL, move || {
            let weak = weak.clone();
            async move {
                if let Some(screen) = weak.upgrade() {
                    screen.tick();
                }
            }
        });
        info!("Readiness ticker started");
        handle
    }

    /// Recompute readiness now.
    pub fn tick(&self) -> Arc<Vec<OrderReadiness>> {
        let board = Arc::new(views::readiness_board(&self.store.snapshot(), self.clock.now()));
        self.readiness.send_replace(board.clone());
        debug!(orders = board.len(), "Readiness tick");
        board
    }

    /// The last computed readiness board.
    pub fn readiness(&self) -> Arc<Vec<OrderReadiness>> {
        self.readiness.borrow().clone()
    }

    pub fn subscribe_readiness(&self) -> watch::Receiver<Arc<Vec<OrderReadiness>>> {
        self.readiness.subscribe()
    }

    /// Number of background tasks the screen owns.
    pub fn active_timers(&self) -> usize {
        self.scheduler.active_count()
    }

    /// Cancel every background task the screen owns.
    pub fn shutdown(&self) -> usize {
        let cancelled = self.scheduler.cancel_all();
        info!(cancelled, "Kitchen screen stopped");
        cancelled
    }
}
