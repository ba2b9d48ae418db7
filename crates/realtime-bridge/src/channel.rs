//! Outbound transport abstraction.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::event::ChangeEvent;

/// Trait for publishing change events to a room.
///
/// Abstracted to support different transports (HTTP gateway, tests, etc.)
#[async_trait]
pub trait ChangeChannel: Send + Sync {
    /// Publish an event to every subscriber of `room`.
    async fn publish(&self, room: &str, event: &ChangeEvent) -> Result<(), BridgeError>;
}

/// A channel that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoOpChannel;

#[async_trait]
impl ChangeChannel for NoOpChannel {
    async fn publish(&self, _room: &str, _event: &ChangeEvent) -> Result<(), BridgeError> {
        Ok(())
    }
}

/// A channel that logs all events.
#[derive(Debug, Clone, Default)]
pub struct LoggingChannel;

#[async_trait]
impl ChangeChannel for LoggingChannel {
    async fn publish(&self, room: &str, event: &ChangeEvent) -> Result<(), BridgeError> {
        tracing::info!(
            "[{}] {:?} order {} ({:?})",
            room,
            event.kind,
            event.order_id,
            event.status
        );
        Ok(())
    }
}
