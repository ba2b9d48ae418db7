//! HTTP client for the restaurant order service.
//!
//! This crate implements the kitchen-core collaborator traits over the
//! order service's JSON API:
//!
//! - [`OrderClient`] - [`OrderService`](kitchen_core::OrderService) and
//!   [`RoleNotifier`](kitchen_core::RoleNotifier) over reqwest
//! - [`OrderClientConfig`] - Base URL, token and restaurant scope
//!
//! # Example
//!
//! ```no_run
//! use kitchen_core::OrderService;
//! use order_client::{OrderClient, OrderClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OrderClient::new(OrderClientConfig::from_env()?)?;
//! let orders = client.fetch_active_orders().await?;
//! println!("{} active orders", orders.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;

pub use client::OrderClient;
pub use config::OrderClientConfig;
pub use error::ClientError;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
