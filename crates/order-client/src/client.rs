//! Order service HTTP client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kitchen_core::validation::parse_order;
use kitchen_core::{
    ItemStatus, Order, OrderId, OrderService, OrderStatus, RoleNotification, RoleNotifier, ServiceError,
    ValidationError,
};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::OrderClientConfig;
use crate::error::ClientError;

/// Bulk read response. Some deployments wrap the array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OrdersResponse {
    List(Vec<Value>),
    Wrapped { orders: Vec<Value> },
}

/// Accept response. Either the timestamp at top level or inside the order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AcceptResponse {
    Flat {
        #[serde(rename = "startedAt")]
        started_at: DateTime<Utc>,
    },
    Nested {
        order: AcceptedOrder,
    },
}

#[derive(Debug, Deserialize)]
struct AcceptedOrder {
    #[serde(rename = "startedAt")]
    started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct StatusBody<'a> {
    status: &'a str,
}

/// Client for the restaurant order service.
#[derive(Clone)]
pub struct OrderClient {
    http: Client,
    config: OrderClientConfig,
}

impl OrderClient {
    /// Create a client with the given configuration.
    pub fn new(config: OrderClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(ClientError::Http)?;
        info!(base_url = %config.base_url, restaurant_id = %config.restaurant_id, "Order client ready");
        Ok(Self { http, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(OrderClientConfig::from_env()?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &OrderClientConfig {
        &self.config
    }

    /// Fetch active orders, keeping invalid entries out of the result.
    ///
    /// Returns the valid orders and the number of entries that were skipped.
    pub async fn fetch_orders_lenient(&self) -> Result<(Vec<Order>, usize), ClientError> {
        let url = self.config.orders_url();
        debug!("Fetching active orders: {}", url);

        let response = self.send(self.authorized(self.http.get(&url))).await?;
        let body: OrdersResponse = response.json().await.map_err(ClientError::Http)?;
        let raw = match body {
            OrdersResponse::List(list) | OrdersResponse::Wrapped { orders: list } => list,
        };

        let mut skipped = 0;
        let mut orders = Vec::with_capacity(raw.len());
        for value in raw {
            match parse_order(value) {
                Ok(order) => orders.push(order),
                Err(e) => {
                    skipped += 1;
                    warn!(error = %e, "ORDER_REJECTED_AT_BOUNDARY");
                }
            }
        }

        Ok((orders, skipped))
    }

    async fn accept(&self, order_id: &OrderId) -> Result<DateTime<Utc>, ClientError> {
        let url = self.config.accept_url(order_id.as_str());
        debug!(order_id = %order_id, "Accepting order");
        let response = self.send(self.authorized(self.http.post(&url))).await?;
        let value: Value = response.json().await.map_err(ClientError::Http)?;
        let parsed: AcceptResponse = serde_json::from_value(value)?;
        Ok(match parsed {
            AcceptResponse::Flat { started_at } => started_at,
            AcceptResponse::Nested { order } => order.started_at,
        })
    }

    async fn patch_status(&self, url: &str, status: &str) -> Result<(), ClientError> {
        let request = self.authorized(self.http.patch(url)).json(&StatusBody { status });
        self.send(request).await?;
        Ok(())
    }

    async fn post_notification(&self, notification: &RoleNotification) -> Result<(), ClientError> {
        let url = self.config.notifications_url();
        let request = self.authorized(self.http.post(&url)).json(notification);
        self.send(request).await?;
        Ok(())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = request.send().await.map_err(ClientError::Http)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl OrderService for OrderClient {
    async fn fetch_active_orders(&self) -> Result<Vec<Order>, ServiceError> {
        let (orders, skipped) = self.fetch_orders_lenient().await?;
        if skipped > 0 {
            warn!(skipped, kept = orders.len(), "Some orders failed validation");
        }
        Ok(orders)
    }

    async fn accept_order(&self, order_id: &OrderId) -> Result<DateTime<Utc>, ServiceError> {
        self.accept(order_id).await.map_err(|e| match e {
            ClientError::Json(err) => ServiceError::InvalidResponse(ValidationError::Missing(format!(
                "startedAt ({})",
                err
            ))),
            other => other.into(),
        })
    }

    async fn update_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<(), ServiceError> {
        let url = self.config.status_url(order_id.as_str());
        debug!(order_id = %order_id, status = %status, "Updating order status");
        Ok(self.patch_status(&url, status.as_str()).await?)
    }

    async fn update_item_status(
        &self,
        order_id: &OrderId,
        item_index: usize,
        status: ItemStatus,
    ) -> Result<(), ServiceError> {
        let url = self.config.item_status_url(order_id.as_str(), item_index);
        debug!(order_id = %order_id, item_index, status = %status, "Updating item status");
        Ok(self.patch_status(&url, status.as_str()).await?)
    }

    fn name(&self) -> &str {
        "OrderClient"
    }
}

#[async_trait]
impl RoleNotifier for OrderClient {
    async fn notify(&self, notification: RoleNotification) -> Result<(), ServiceError> {
        Ok(self.post_notification(&notification).await?)
    }
}

impl std::fmt::Debug for OrderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderClient")
            .field("base_url", &self.config.base_url)
            .field("restaurant_id", &self.config.restaurant_id)
            .finish()
    }
}
