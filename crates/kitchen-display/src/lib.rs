//! Kitchen screen core.
//!
//! Ties the order model, the order service, the realtime bridge and the
//! voice pipeline into one board:
//!
//! - [`KitchenScreen`] - Status and item actions, undo/redo, views
//! - [`OrderStore`] - Revisioned in-memory store with snapshot publishing
//! - [`KitchenConfig`] - Restaurant scope, time bounds and undo policy
//!
//! Every mutation is optimistic: it is applied locally, confirmed with the
//! order service under a time bound and reverted if the service fails.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kitchen_display::{KitchenConfig, KitchenScreen};
//! use order_client::OrderClient;
//! use realtime_bridge::{BridgeConfig, LoggingChannel, RealtimeBridge};
//!
//! # async fn example() -> Result<(), kitchen_display::KitchenError> {
//! let client = Arc::new(OrderClient::from_env()?);
//! let bridge = RealtimeBridge::new(BridgeConfig::from_env()?, Arc::new(LoggingChannel));
//! let screen = KitchenScreen::builder(KitchenConfig::from_env()?, client, bridge).build();
//!
//! screen.refresh().await?;
//! for order in screen.active_orders() {
//!     println!("#{} {}", order.order_number, order.status);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod hooks;
mod mutation;
mod screen;
mod store;
mod ticker;
mod views;

pub use config::{KitchenConfig, MutationTimeouts, UndoPolicy};
pub use error::KitchenError;
pub use screen::{KitchenScreen, KitchenScreenBuilder};
pub use store::{Applied, OrderStore, Revision};
pub use ticker::TICK_INTERVAL;
pub use views::{active_orders, all_day, readiness_board, recently_completed, AllDayLine, OrderReadiness};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
