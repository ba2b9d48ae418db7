//! Core types and rules for the kitchen order orchestration core.
//!
//! This crate provides the shared vocabulary used by every other crate in
//! the workspace:
//!
//! - [`Order`] / [`OrderItem`] - The kitchen ticket model
//! - [`machine`] - Legal order and item status transitions
//! - [`ActionHistory`] - Undo/redo log of applied mutations
//! - [`readiness`] - Remaining prep time and urgency bands
//! - [`OrderService`] / [`RoleNotifier`] - External order API boundary
//! - [`NoticeSink`] - User-facing toast notices
//! - [`Scheduler`] - Owned, cancellable timers
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use kitchen_core::{machine, Order, OrderItem, OrderStatus};
//!
//! let now = Utc::now();
//! let mut order = Order::new("o-1", "42", now).with_item(OrderItem::new("Burger", 2, 8.5));
//!
//! machine::check_accept(&order).unwrap();
//! machine::apply_accept(&mut order, now, now);
//! assert_eq!(order.status, OrderStatus::Preparing);
//! assert_eq!(order.started_at, Some(now));
//! ```

mod clock;
mod error;
mod history;
pub mod machine;
mod notice;
mod order;
pub mod readiness;
mod scheduler;
mod service;
pub mod validation;
mod view;

pub use clock::{Clock, SystemClock};
pub use error::{HistoryError, ServiceError, TransitionError};
pub use history::{ActionHistory, ActionHistoryItem, ActionKind, StoreEffect, DEFAULT_HISTORY_CAPACITY};
pub use notice::{LoggingNotices, Notice, NoticeLevel, NoticeSink, NoOpNotices};
pub use order::{AddOn, ItemStatus, Order, OrderId, OrderItem, OrderStatus, OrderType};
pub use readiness::{Readiness, ReadinessSource, Urgency};
pub use scheduler::{Scheduler, TimerHandle};
pub use service::{NoOpRoleNotifier, OrderService, RoleNotification, RoleNotifier};
pub use validation::ValidationError;
pub use view::ScreenView;

// Re-export async_trait for convenience
pub use async_trait::async_trait;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
