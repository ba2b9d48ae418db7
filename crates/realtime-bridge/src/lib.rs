//! Real-time change notifications for the kitchen screen.
//!
//! This crate fans order changes out to every screen of a restaurant and
//! turns inbound notifications into full refreshes:
//!
//! - [`RealtimeBridge`] - Publishes [`ChangeEvent`]s to the restaurant room
//! - [`ChangeChannel`] - Transport abstraction for outbound events
//! - [`Refresher`] - Hook called when an inbound event requires a refetch
//! - [`HttpChannel`] / [`subscribe`] - HTTP publish and SSE subscribe transports
//!
//! Inbound events never patch state incrementally; they always trigger a
//! full refetch from the order service.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use realtime_bridge::{BridgeConfig, HttpChannel, RealtimeBridge};
//!
//! # async fn example() -> Result<(), realtime_bridge::BridgeError> {
//! let config = BridgeConfig::from_env()?;
//! let channel = Arc::new(HttpChannel::new(config.clone())?);
//! let bridge = RealtimeBridge::new(config, channel);
//! println!("Publishing to {}", bridge.room());
//! # Ok(())
//! # }
//! ```

mod bridge;
mod channel;
mod config;
mod error;
mod event;
mod transport;

pub use bridge::{RealtimeBridge, RefreshReason, Refresher};
pub use channel::{ChangeChannel, LoggingChannel, NoOpChannel};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use event::{ChangeEvent, ChangeKind, InboundEvent};
pub use transport::{subscribe, EventStream, HttpChannel};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
