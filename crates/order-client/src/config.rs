//! Configuration for the order service client.

use std::env;
use std::time::Duration;

use crate::error::ClientError;

/// Default transport timeout. Mutation time bounds are applied by the caller
/// and are always shorter; this only guards against hung connections.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for connecting to the order service.
#[derive(Debug, Clone)]
pub struct OrderClientConfig {
    /// Base URL of the order service (e.g., "http://localhost:4000").
    pub base_url: String,
    /// Bearer token for authentication, if the service requires one.
    pub api_token: Option<String>,
    /// Restaurant whose kitchen this screen serves.
    pub restaurant_id: String,
    /// Transport-level timeout for every request.
    pub http_timeout: Duration,
}

impl Default for OrderClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:4000", "default")
    }
}

impl OrderClientConfig {
    /// Create a configuration for a restaurant.
    pub fn new(base_url: impl Into<String>, restaurant_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
            restaurant_id: restaurant_id.into(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Set the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `KITCHEN_RESTAURANT_ID` - Restaurant scope for all requests
    ///
    /// Optional environment variables:
    /// - `KITCHEN_API_URL` - Base URL (default: http://localhost:4000)
    /// - `KITCHEN_API_TOKEN` - Bearer token
    /// - `KITCHEN_HTTP_TIMEOUT_SECS` - Transport timeout (default: 30)
    pub fn from_env() -> Result<Self, ClientError> {
        let restaurant_id = env::var("KITCHEN_RESTAURANT_ID")
            .map_err(|_| ClientError::Config("KITCHEN_RESTAURANT_ID not set".to_string()))?;

        let base_url =
            env::var("KITCHEN_API_URL").unwrap_or_else(|_| "http://localhost:4000".to_string());

        let mut config = Self::new(base_url, restaurant_id);
        config.api_token = env::var("KITCHEN_API_TOKEN").ok().filter(|t| !t.is_empty());
        config.http_timeout = env::var("KITCHEN_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT);

        Ok(config)
    }

    /// Bulk read of active kitchen orders.
    pub fn orders_url(&self) -> String {
        format!(
            "{}/api/kitchen/orders?restaurantId={}",
            self.base_url,
            urlencoding::encode(&self.restaurant_id)
        )
    }

    /// Accept endpoint for an order.
    pub fn accept_url(&self, order_id: &str) -> String {
        format!("{}/api/orders/{}/accept", self.base_url, urlencoding::encode(order_id))
    }

    /// Status endpoint for an order.
    pub fn status_url(&self, order_id: &str) -> String {
        format!("{}/api/orders/{}/status", self.base_url, urlencoding::encode(order_id))
    }

    /// Item status endpoint for one line of an order.
    pub fn item_status_url(&self, order_id: &str, item_index: usize) -> String {
        format!(
            "{}/api/orders/{}/items/{}/status",
            self.base_url,
            urlencoding::encode(order_id),
            item_index
        )
    }

    /// Notification side channel.
    pub fn notifications_url(&self) -> String {
        format!("{}/api/notifications", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let config = OrderClientConfig::new("http://kitchen.local:4000/", "r 1");
        assert_eq!(config.base_url, "http://kitchen.local:4000");
        assert_eq!(
            config.orders_url(),
            "http://kitchen.local:4000/api/kitchen/orders?restaurantId=r%201"
        );
        assert_eq!(config.accept_url("o1"), "http://kitchen.local:4000/api/orders/o1/accept");
        assert_eq!(config.status_url("o/1"), "http://kitchen.local:4000/api/orders/o%2F1/status");
        assert_eq!(
            config.item_status_url("o1", 2),
            "http://kitchen.local:4000/api/orders/o1/items/2/status"
        );
        assert_eq!(config.notifications_url(), "http://kitchen.local:4000/api/notifications");
    }

    #[test]
    fn test_default() {
        let config = OrderClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:4000");
        assert!(config.api_token.is_none());
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }
}
