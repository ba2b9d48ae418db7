//! In-memory order store.
//!
//! The store is the single source of truth for the screen. Every write bumps
//! a store-wide revision counter and stamps the written order with it; a
//! rollback only lands while the order still carries the revision its
//! mutation produced. Each write also publishes a fresh snapshot on a
//! `watch` channel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use kitchen_core::{Order, OrderId, OrderStatus};
use tokio::sync::{watch, RwLock};
use tracing::debug;

/// Local revision of a stored order.
pub type Revision = u64;

#[derive(Debug, Clone)]
struct Entry {
    order: Order,
    revision: Revision,
}

#[derive(Debug, Default)]
struct Inner {
    orders: IndexMap<OrderId, Entry>,
    last_revision: Revision,
}

impl Inner {
    fn bump(&mut self) -> Revision {
        self.last_revision += 1;
        self.last_revision
    }

    fn snapshot(&self) -> Arc<Vec<Order>> {
        Arc::new(self.orders.values().map(|e| e.order.clone()).collect())
    }
}

/// Outcome of [`OrderStore::try_apply`].
#[derive(Debug)]
pub enum Applied<E> {
    /// No order with that id is stored.
    Missing,
    /// The update refused the order. Nothing was written.
    Rejected(E),
    /// The update left the order as it was. No revision was spent.
    Unchanged(Order),
    /// The order was written under a new revision.
    Changed {
        previous: Order,
        next: Order,
        revision: Revision,
    },
}

/// Orders on the board, keyed by id in arrival order.
#[derive(Debug)]
pub struct OrderStore {
    inner: RwLock<Inner>,
    snapshots: watch::Sender<Arc<Vec<Order>>>,
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderStore {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: RwLock::new(Inner::default()),
            snapshots,
        }
    }

    /// Subscribe to snapshots published after every write.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Order>>> {
        self.snapshots.subscribe()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Vec<Order>> {
        self.snapshots.borrow().clone()
    }

    pub async fn get(&self, order_id: &OrderId) -> Option<Order> {
        self.inner.read().await.orders.get(order_id).map(|e| e.order.clone())
    }

    /// The order together with its current revision.
    pub async fn get_with_revision(&self, order_id: &OrderId) -> Option<(Order, Revision)> {
        self.inner
            .read()
            .await
            .orders
            .get(order_id)
            .map(|e| (e.order.clone(), e.revision))
    }

    pub async fn revision(&self, order_id: &OrderId) -> Option<Revision> {
        self.inner.read().await.orders.get(order_id).map(|e| e.revision)
    }

    /// Every stored order, in arrival order.
    pub async fn all(&self) -> Vec<Order> {
        self.inner.read().await.orders.values().map(|e| e.order.clone()).collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.orders.is_empty()
    }

    /// Insert or replace an order. Returns its new revision.
    pub async fn put(&self, order: Order) -> Revision {
        let mut inner = self.inner.write().await;
        let revision = inner.bump();
        inner.orders.insert(order.id.clone(), Entry { order, revision });
        self.publish(&inner);
        revision
    }

    /// Check and change an order under a single write lock.
    ///
    /// `update` runs on a copy of the stored order; the copy is written
    /// back only if `update` succeeds and actually changed it. Concurrent
    /// callers therefore always validate against the latest write.
    pub async fn try_apply<F, E>(&self, order_id: &OrderId, update: F) -> Applied<E>
    where
        F: FnOnce(&mut Order) -> Result<(), E>,
    {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.orders.get(order_id) else {
            return Applied::Missing;
        };
        let previous = entry.order.clone();
        let mut next = previous.clone();
        if let Err(e) = update(&mut next) {
            return Applied::Rejected(e);
        }
        if next == previous {
            return Applied::Unchanged(next);
        }

        let revision = inner.bump();
        inner.orders.insert(
            order_id.clone(),
            Entry {
                order: next.clone(),
                revision,
            },
        );
        self.publish(&inner);
        Applied::Changed {
            previous,
            next,
            revision,
        }
    }

    /// Remove an order. Returns it if it was stored.
    pub async fn remove(&self, order_id: &OrderId) -> Option<Order> {
        let mut inner = self.inner.write().await;
        let removed = inner.orders.shift_remove(order_id).map(|e| e.order);
        if removed.is_some() {
            inner.bump();
            self.publish(&inner);
        }
        removed
    }

    /// Update an order in place without changing its revision.
    ///
    /// Used to fold confirmed server data (such as the accepted start time)
    /// into an order without invalidating rollbacks of other in-flight
    /// mutations.
    pub async fn confirm<F>(&self, order_id: &OrderId, update: F) -> Option<Order>
    where
        F: FnOnce(&mut Order),
    {
        let mut inner = self.inner.write().await;
        let entry = inner.orders.get_mut(order_id)?;
        update(&mut entry.order);
        let order = entry.order.clone();
        self.publish(&inner);
        Some(order)
    }

    /// Revert an order to `previous` if it still carries `revision`.
    ///
    /// `None` as `previous` means the order did not exist and is removed.
    /// A start time already recorded is never replaced by an older one.
    /// Returns whether the rollback was applied.
    pub async fn rollback(&self, order_id: &OrderId, revision: Revision, previous: Option<Order>) -> bool {
        let mut inner = self.inner.write().await;
        let current = match inner.orders.get(order_id) {
            Some(entry) if entry.revision == revision => entry.order.clone(),
            Some(entry) => {
                debug!(order_id = %order_id, expected = revision, found = entry.revision, "Stale rollback");
                return false;
            }
            None => return false,
        };

        match previous {
            Some(mut order) => {
                if order.started_at.is_some() {
                    order.started_at = current.started_at.or(order.started_at);
                }
                let new_revision = inner.bump();
                inner.orders.insert(
                    order_id.clone(),
                    Entry {
                        order,
                        revision: new_revision,
                    },
                );
            }
            None => {
                inner.orders.shift_remove(order_id);
                inner.bump();
            }
        }
        self.publish(&inner);
        true
    }

    /// Replace the board with `orders` from a full refresh.
    ///
    /// Locally completed orders the service no longer lists are kept while
    /// they completed at or after `keep_completed_since`.
    pub async fn replace_all(&self, orders: Vec<Order>, keep_completed_since: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        let kept: Vec<Order> = inner
            .orders
            .values()
            .map(|e| &e.order)
            .filter(|o| {
                o.status == OrderStatus::Completed
                    && o.completed_at.is_some_and(|at| at >= keep_completed_since)
                    && !orders.iter().any(|fresh| fresh.id == o.id)
            })
            .cloned()
            .collect();

        inner.orders.clear();
        for order in orders.into_iter().chain(kept) {
            let revision = inner.bump();
            inner.orders.insert(order.id.clone(), Entry { order, revision });
        }
        self.publish(&inner);
    }

    fn publish(&self, inner: &Inner) {
        self.snapshots.send_replace(inner.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use kitchen_core::OrderStatus;

    fn order(id: &str) -> Order {
        Order::new(id, id, Utc::now())
    }

    #[tokio::test]
    async fn test_put_bumps_revision_and_publishes() {
        let store = OrderStore::new();
        let mut rx = store.subscribe();

        let r1 = store.put(order("a")).await;
        let r2 = store.put(order("a")).await;
        assert!(r2 > r1);
        assert_eq!(store.revision(&"a".into()).await, Some(r2));

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    fn advance(order: &mut Order) -> Result<(), &'static str> {
        order.status = match order.status {
            OrderStatus::Pending => OrderStatus::Preparing,
            OrderStatus::Preparing => OrderStatus::Ready,
            _ => return Err("no next status"),
        };
        Ok(())
    }

    #[tokio::test]
    async fn test_try_apply_outcomes() {
        let store = OrderStore::new();
        let before = store.put(order("a").with_status(OrderStatus::Ready)).await;

        assert!(matches!(store.try_apply(&"x".into(), advance).await, Applied::Missing));
        assert!(matches!(store.try_apply(&"a".into(), advance).await, Applied::Rejected(_)));
        assert!(matches!(
            store.try_apply(&"a".into(), |_| Ok::<(), ()>(())).await,
            Applied::Unchanged(_)
        ));
        assert_eq!(store.revision(&"a".into()).await, Some(before));

        store.put(order("a")).await;
        match store.try_apply(&"a".into(), advance).await {
            Applied::Changed { previous, next, revision } => {
                assert_eq!(previous.status, OrderStatus::Pending);
                assert_eq!(next.status, OrderStatus::Preparing);
                assert_eq!(store.revision(&"a".into()).await, Some(revision));
            }
            other => panic!("expected a write, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_try_apply_serializes_concurrent_checks() {
        let store = Arc::new(OrderStore::new());
        store.put(order("a").with_status(OrderStatus::Preparing)).await;

        // Each writer only moves a preparing order; exactly one may win.
        let writers: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .try_apply(&"a".into(), |o| {
                            if o.status != OrderStatus::Preparing {
                                return Err(o.status);
                            }
                            o.status = OrderStatus::Ready;
                            Ok(())
                        })
                        .await
                })
            })
            .collect();

        let mut written = 0;
        for writer in writers {
            if let Applied::Changed { .. } = writer.await.unwrap() {
                written += 1;
            }
        }
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn test_rollback_only_with_matching_revision() {
        let store = OrderStore::new();
        let original = order("a");
        store.put(original.clone()).await;

        let r1 = store.put(original.clone().with_status(OrderStatus::Preparing)).await;
        let _r2 = store.put(original.clone().with_status(OrderStatus::Ready)).await;

        assert!(!store.rollback(&"a".into(), r1, Some(original.clone())).await);
        assert_eq!(store.get(&"a".into()).await.unwrap().status, OrderStatus::Ready);

        let r3 = store.put(original.clone().with_status(OrderStatus::Completed)).await;
        assert!(store.rollback(&"a".into(), r3, Some(original)).await);
        assert_eq!(store.get(&"a".into()).await.unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_rollback_keeps_recorded_start_time() {
        let store = OrderStore::new();
        let provisional = Utc::now();
        let authoritative = provisional - Duration::seconds(4);
        let previous = order("a").with_status(OrderStatus::Preparing).with_started_at(provisional);

        let revision = store.put(previous.clone()).await;
        store
            .confirm(&"a".into(), |o| o.started_at = Some(authoritative))
            .await;
        assert!(store.rollback(&"a".into(), revision, Some(previous)).await);
        assert_eq!(store.get(&"a".into()).await.unwrap().started_at, Some(authoritative));
    }

    #[tokio::test]
    async fn test_rollback_of_accept_clears_provisional_start() {
        let store = OrderStore::new();
        let previous = order("a");
        let revision = store
            .put(previous.clone().with_status(OrderStatus::Preparing).with_started_at(Utc::now()))
            .await;
        assert!(store.rollback(&"a".into(), revision, Some(previous)).await);
        assert_eq!(store.get(&"a".into()).await.unwrap().started_at, None);
    }

    #[tokio::test]
    async fn test_rollback_to_absent_removes() {
        let store = OrderStore::new();
        let revision = store.put(order("a")).await;
        assert!(store.rollback(&"a".into(), revision, None).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_replace_all_keeps_recent_local_completions() {
        let store = OrderStore::new();
        let now = Utc::now();
        let mut recent = order("done-recent").with_status(OrderStatus::Completed);
        recent.completed_at = Some(now - Duration::minutes(5));
        let mut old = order("done-old").with_status(OrderStatus::Completed);
        old.completed_at = Some(now - Duration::hours(2));
        store.put(recent).await;
        store.put(old).await;
        store.put(order("stale")).await;

        store
            .replace_all(vec![order("fresh")], now - Duration::minutes(30))
            .await;

        let ids: Vec<_> = store.all().await.into_iter().map(|o| o.id.to_string()).collect();
        assert_eq!(ids, vec!["fresh", "done-recent"]);
    }
}
