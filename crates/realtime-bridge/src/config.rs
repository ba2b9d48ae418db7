//! Configuration for the real-time bridge.

use std::env;

use crate::error::BridgeError;

/// Configuration for the restaurant room on the realtime gateway.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the realtime gateway (e.g., "http://localhost:4001").
    pub base_url: String,
    /// Restaurant whose room this screen joins.
    pub restaurant_id: String,
    /// Identifier of this screen, used to ignore our own echoes.
    pub terminal_id: String,
}

impl BridgeConfig {
    /// Create a configuration for a restaurant room.
    pub fn new(
        base_url: impl Into<String>,
        restaurant_id: impl Into<String>,
        terminal_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            restaurant_id: restaurant_id.into(),
            terminal_id: terminal_id.into(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `KITCHEN_RESTAURANT_ID` - Restaurant scope
    ///
    /// Optional environment variables:
    /// - `KITCHEN_REALTIME_URL` - Gateway URL (default: http://localhost:4001)
    /// - `KITCHEN_TERMINAL_ID` - Screen identifier (default: kitchen-1)
    pub fn from_env() -> Result<Self, BridgeError> {
        let restaurant_id = env::var("KITCHEN_RESTAURANT_ID")
            .map_err(|_| BridgeError::Config("KITCHEN_RESTAURANT_ID not set".to_string()))?;
        let base_url = env::var("KITCHEN_REALTIME_URL")
            .unwrap_or_else(|_| "http://localhost:4001".to_string());
        let terminal_id =
            env::var("KITCHEN_TERMINAL_ID").unwrap_or_else(|_| "kitchen-1".to_string());

        Ok(Self::new(base_url, restaurant_id, terminal_id))
    }

    /// Room name shared by every screen of the restaurant.
    pub fn room(&self) -> String {
        format!("restaurant:{}", self.restaurant_id)
    }

    /// Publish endpoint.
    pub fn publish_url(&self) -> String {
        format!("{}/publish", self.base_url)
    }

    /// SSE subscription endpoint for the room.
    pub fn events_url(&self) -> String {
        format!("{}/events?room={}", self.base_url, urlencoding::encode(&self.room()))
    }
}
