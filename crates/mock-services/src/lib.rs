//! Mock collaborators for the kitchen order orchestration core.
//!
//! This crate provides in-memory and scripted implementations of every
//! collaborator trait for tests and demos:
//! - `InMemoryOrderService` - Order service with call log, delay and failure injection
//! - `RecordingNotices` / `RecordingRoleNotifier` / `RecordingChannel` - Capture side effects
//! - `CountingRefresher` - Counts inbound refreshes
//! - `ScriptedRecognizer` / `RecordingSynthesizer` / `ScriptedInterpreter` - Voice engines
//! - `RecordingSink` - Voice command sink without a kitchen screen
//! - `ManualClock` - Clock that only moves when told to
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use kitchen_core::{Order, OrderService};
//! use mock_services::InMemoryOrderService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kitchen_core::ServiceError> {
//!     let service = InMemoryOrderService::with_orders(vec![Order::new("o1", "12", Utc::now())]);
//!     let started_at = service.accept_order(&"o1".into()).await?;
//!     println!("Accepted at {}", started_at);
//!     Ok(())
//! }
//! ```

mod clock;
mod order_service;
mod recording;
mod voice;

pub use clock::ManualClock;
pub use order_service::{Failure, InMemoryOrderService, ServiceCall};
pub use recording::{CountingRefresher, RecordingChannel, RecordingNotices, RecordingRoleNotifier};
pub use voice::{RecordingSink, RecordingSynthesizer, ScriptedInterpreter, ScriptedRecognizer};
