//! In-memory order service.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kitchen_core::{ItemStatus, Order, OrderId, OrderService, OrderStatus, ServiceError};

/// A call received by [`InMemoryOrderService`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    FetchActive,
    Accept(OrderId),
    UpdateStatus(OrderId, OrderStatus),
    UpdateItemStatus(OrderId, usize, ItemStatus),
}

impl ServiceCall {
    /// Whether the call mutates an order.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::FetchActive)
    }

    /// The order a mutation targets.
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::FetchActive => None,
            Self::Accept(id) | Self::UpdateStatus(id, _) | Self::UpdateItemStatus(id, _, _) => Some(id),
        }
    }
}

/// Injected failure for mutation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Answer with this HTTP status.
    Status(u16),
    /// Fail before reaching the service.
    Transport,
    /// Never answer.
    Hang,
}

#[derive(Debug, Default)]
struct Inner {
    orders: Vec<Order>,
    calls: Vec<ServiceCall>,
    failure: Option<Failure>,
    order_failures: HashMap<OrderId, Failure>,
    fetch_failure: Option<Failure>,
    delay: Option<Duration>,
    started_at: Option<DateTime<Utc>>,
}

/// An order service that keeps its orders in memory.
///
/// Every call is logged. Mutations can be delayed or made to fail, which is
/// how timeout and rollback paths are exercised.
#[derive(Debug, Default)]
pub struct InMemoryOrderService {
    inner: Mutex<Inner>,
}

impl InMemoryOrderService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service holding `orders`.
    pub fn with_orders(orders: Vec<Order>) -> Self {
        let service = Self::new();
        service.lock().orders = orders;
        service
    }

    /// Add or replace an order on the service side.
    pub fn upsert(&self, order: Order) {
        let mut inner = self.lock();
        match inner.orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order,
            None => inner.orders.push(order),
        }
    }

    /// Remove an order on the service side.
    pub fn remove(&self, order_id: &OrderId) {
        self.lock().orders.retain(|o| &o.id != order_id);
    }

    /// The service-side copy of an order.
    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.lock().orders.iter().find(|o| &o.id == order_id).cloned()
    }

    /// Make every mutation fail with `failure` (or succeed again with `None`).
    pub fn set_failure(&self, failure: Option<Failure>) {
        self.lock().failure = failure;
    }

    /// Make mutations of one order fail with `failure`, overriding
    /// [`set_failure`](Self::set_failure). `None` clears it.
    pub fn set_order_failure(&self, order_id: &OrderId, failure: Option<Failure>) {
        let mut inner = self.lock();
        match failure {
            Some(failure) => inner.order_failures.insert(order_id.clone(), failure),
            None => inner.order_failures.remove(order_id),
        };
    }

    /// Make fetches fail with `failure` (or succeed again with `None`).
    pub fn set_fetch_failure(&self, failure: Option<Failure>) {
        self.lock().fetch_failure = failure;
    }

    /// Delay every mutation by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    /// Start time returned by accept. Defaults to the current time.
    pub fn set_started_at(&self, started_at: DateTime<Utc>) {
        self.lock().started_at = Some(started_at);
    }

    /// Every call received, oldest first.
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.lock().calls.clone()
    }

    /// Mutation calls received, oldest first.
    pub fn mutations(&self) -> Vec<ServiceCall> {
        self.lock().calls.iter().filter(|c| c.is_mutation()).cloned().collect()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_mutation()).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    async fn mutate(&self, call: ServiceCall) -> Result<(), ServiceError> {
        let (failure, delay) = {
            let mut inner = self.lock();
            let failure = call
                .order_id()
                .and_then(|id| inner.order_failures.get(id).copied())
                .or(inner.failure);
            inner.calls.push(call);
            (failure, inner.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        fail(failure).await
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_order<F>(&self, order_id: &OrderId, f: F) -> Result<(), ServiceError>
    where
        F: FnOnce(&mut Order),
    {
        let mut inner = self.lock();
        match inner.orders.iter_mut().find(|o| &o.id == order_id) {
            Some(order) => {
                f(order);
                Ok(())
            }
            None => Err(ServiceError::Http {
                status: 404,
                body: format!("order {} not found", order_id),
            }),
        }
    }
}

async fn fail(failure: Option<Failure>) -> Result<(), ServiceError> {
    match failure {
        None => Ok(()),
        Some(Failure::Status(status)) => Err(ServiceError::Http {
            status,
            body: "injected failure".to_string(),
        }),
        Some(Failure::Transport) => Err(ServiceError::Transport("connection refused".to_string())),
        Some(Failure::Hang) => std::future::pending().await,
    }
}

#[async_trait]
impl OrderService for InMemoryOrderService {
    async fn fetch_active_orders(&self) -> Result<Vec<Order>, ServiceError> {
        let failure = {
            let mut inner = self.lock();
            inner.calls.push(ServiceCall::FetchActive);
            inner.fetch_failure
        };
        fail(failure).await?;
        Ok(self
            .lock()
            .orders
            .iter()
            .filter(|o| o.status.is_active())
            .cloned()
            .collect())
    }

    async fn accept_order(&self, order_id: &OrderId) -> Result<DateTime<Utc>, ServiceError> {
        self.mutate(ServiceCall::Accept(order_id.clone())).await?;
        let started_at = self.lock().started_at.unwrap_or_else(Utc::now);
        self.with_order(order_id, |order| {
            order.status = OrderStatus::Preparing;
            order.started_at.get_or_insert(started_at);
        })?;
        Ok(started_at)
    }

    async fn update_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<(), ServiceError> {
        self.mutate(ServiceCall::UpdateStatus(order_id.clone(), status)).await?;
        self.with_order(order_id, |order| {
            order.status = status;
            order.completed_at = (status == OrderStatus::Completed).then(Utc::now);
        })
    }

    async fn update_item_status(
        &self,
        order_id: &OrderId,
        item_index: usize,
        status: ItemStatus,
    ) -> Result<(), ServiceError> {
        self.mutate(ServiceCall::UpdateItemStatus(order_id.clone(), item_index, status))
            .await?;
        self.with_order(order_id, |order| {
            if let Some(item) = order.items.get_mut(item_index) {
                item.status = status;
            }
        })
    }

    fn name(&self) -> &str {
        "InMemoryOrderService"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> InMemoryOrderService {
        InMemoryOrderService::with_orders(vec![
            Order::new("o1", "1", Utc::now()),
            Order::new("o2", "2", Utc::now()).with_status(OrderStatus::Completed),
        ])
    }

    #[tokio::test]
    async fn test_fetch_returns_active_only() {
        let orders = service().fetch_active_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id.as_str(), "o1");
    }

    #[tokio::test]
    async fn test_accept_uses_configured_start() {
        let service = service();
        let at = Utc::now() - chrono::Duration::minutes(3);
        service.set_started_at(at);

        assert_eq!(service.accept_order(&"o1".into()).await.unwrap(), at);
        assert_eq!(service.order(&"o1".into()).unwrap().started_at, Some(at));
        assert_eq!(service.calls(), vec![ServiceCall::Accept("o1".into())]);
    }

    #[tokio::test]
    async fn test_order_failure_only_hits_that_order() {
        let service = service();
        service.upsert(Order::new("o3", "3", Utc::now()));
        service.set_order_failure(&"o1".into(), Some(Failure::Transport));

        assert!(service.update_status(&"o1".into(), OrderStatus::Ready).await.is_err());
        assert!(service.update_status(&"o3".into(), OrderStatus::Ready).await.is_ok());

        service.set_order_failure(&"o1".into(), None);
        assert!(service.update_status(&"o1".into(), OrderStatus::Ready).await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_failure_is_logged() {
        let service = service();
        service.set_failure(Some(Failure::Status(503)));
        let err = service.update_status(&"o1".into(), OrderStatus::Ready).await.unwrap_err();
        assert!(matches!(err, ServiceError::Http { status: 503, .. }));
        assert_eq!(service.mutation_count(), 1);
        assert_eq!(service.order(&"o1".into()).unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hang_never_answers() {
        let service = service();
        service.set_failure(Some(Failure::Hang));
        let result = tokio::time::timeout(
            Duration::from_secs(30),
            service.update_status(&"o1".into(), OrderStatus::Ready),
        )
        .await;
        assert!(result.is_err());
    }
}
