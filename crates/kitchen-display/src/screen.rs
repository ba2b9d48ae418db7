//! The kitchen screen: every user action on the board.

use std::sync::Arc;

use kitchen_core::machine::{self, StatusTransition};
use kitchen_core::{
    ActionHistory, ActionHistoryItem, ActionKind, Clock, HistoryError, ItemStatus, LoggingNotices,
    NoOpRoleNotifier, Notice, NoticeSink, Order, OrderId, OrderService, OrderStatus, RoleNotification,
    RoleNotifier, Scheduler, ScreenView, StoreEffect, SystemClock, TransitionError,
};
use realtime_bridge::{ChangeKind, RealtimeBridge};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};
use voice_pipeline::status_phrase;

use crate::config::{KitchenConfig, UndoPolicy};
use crate::error::KitchenError;
use crate::mutation::{settle, Staged};
use crate::store::{Applied, OrderStore, Revision};
use crate::views::{self, AllDayLine, OrderReadiness};

/// Which way a history replay goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    Undo,
    Redo,
}

impl Replay {
    fn verb(&self) -> &'static str {
        match self {
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

/// The service call that mirrors a compensating replay.
enum Compensation {
    Status(OrderStatus),
    Item(usize, ItemStatus),
}

/// Builder for [`KitchenScreen`].
pub struct KitchenScreenBuilder {
    config: KitchenConfig,
    service: Arc<dyn OrderService>,
    bridge: RealtimeBridge,
    notifier: Option<Arc<dyn RoleNotifier>>,
    notices: Option<Arc<dyn NoticeSink>>,
    clock: Option<Arc<dyn Clock>>,
}

impl KitchenScreenBuilder {
    /// Side channel informing other roles of status changes.
    pub fn notifier(mut self, notifier: Arc<dyn RoleNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Where toasts go. Defaults to the log.
    pub fn notices(mut self, notices: Arc<dyn NoticeSink>) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Arc<KitchenScreen> {
        let (view, _) = watch::channel(ScreenView::default());
        let (readiness, _) = watch::channel(Arc::new(Vec::new()));
        info!(
            restaurant_id = %self.config.restaurant_id,
            service = self.service.name(),
            undo_policy = ?self.config.undo_policy,
            "Kitchen screen ready"
        );
        Arc::new(KitchenScreen {
            history: Mutex::new(ActionHistory::with_capacity(self.config.history_capacity)),
            replaying: Mutex::new(()),
            config: self.config,
            store: OrderStore::new(),
            service: self.service,
            bridge: self.bridge,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(NoOpRoleNotifier)),
            notices: self.notices.unwrap_or_else(|| Arc::new(LoggingNotices)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            view,
            scheduler: Scheduler::new(),
            readiness,
        })
    }
}

/// Orders on the board and the operations staff perform on them.
///
/// Every mutation is applied optimistically, confirmed with the order
/// service under a time bound and rolled back on failure. Confirmed
/// mutations are recorded for undo/redo and broadcast to the other screens
/// of the restaurant.
pub struct KitchenScreen {
    pub(crate) config: KitchenConfig,
    pub(crate) store: OrderStore,
    pub(crate) history: Mutex<ActionHistory>,
    /// Held for a whole undo or redo so replays never interleave.
    pub(crate) replaying: Mutex<()>,
    pub(crate) service: Arc<dyn OrderService>,
    pub(crate) bridge: RealtimeBridge,
    pub(crate) notifier: Arc<dyn RoleNotifier>,
    pub(crate) notices: Arc<dyn NoticeSink>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) view: watch::Sender<ScreenView>,
    pub(crate) scheduler: Scheduler,
    pub(crate) readiness: watch::Sender<Arc<Vec<OrderReadiness>>>,
}

impl KitchenScreen {
    pub fn builder(
        config: KitchenConfig,
        service: Arc<dyn OrderService>,
        bridge: RealtimeBridge,
    ) -> KitchenScreenBuilder {
        KitchenScreenBuilder {
            config,
            service,
            bridge,
            notifier: None,
            notices: None,
            clock: None,
        }
    }

    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    /// The order store backing the board.
    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub async fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.store.get(order_id).await
    }

    /// Reload every active order from the service.
    ///
    /// Local completions inside the recent window survive the reload.
    /// Returns the number of orders fetched.
    pub async fn refresh(&self) -> Result<usize, KitchenError> {
        let fetched = tokio::time::timeout(self.config.timeouts.status, self.service.fetch_active_orders()).await;
        let orders = match fetched {
            Ok(Ok(orders)) => orders,
            Ok(Err(e)) => {
                warn!(error = %e, "REFRESH_FAILED");
                self.notices.show(Notice::error("Couldn't load orders, please try again"));
                return Err(e.into());
            }
            Err(_) => {
                warn!("REFRESH_TIMEOUT");
                self.notices.show(Notice::error("Loading orders timed out, please retry"));
                return Err(KitchenError::Timeout {
                    action: "load orders".to_string(),
                });
            }
        };

        let count = orders.len();
        let keep_since = self.clock.now() - self.config.recent_window;
        self.store.replace_all(orders, keep_since).await;
        info!(count, "ORDERS_REFRESHED");
        Ok(count)
    }

    /// `pending → preparing`. The service supplies the start time.
    pub async fn accept_order(&self, order_id: &OrderId) -> Result<Order, KitchenError> {
        self.transition(order_id, StatusTransition::Accept).await
    }

    /// `preparing → ready`.
    pub async fn mark_ready(&self, order_id: &OrderId) -> Result<Order, KitchenError> {
        self.transition(order_id, StatusTransition::MarkReady).await
    }

    /// `ready → completed`, or straight from `preparing`.
    pub async fn complete_order(&self, order_id: &OrderId) -> Result<Order, KitchenError> {
        self.transition(order_id, StatusTransition::Complete).await
    }

    /// Move an order to `target` through the matching transition.
    ///
    /// `pending` is never a target; going back is an undo.
    pub async fn change_status(&self, order_id: &OrderId, target: OrderStatus) -> Result<Order, KitchenError> {
        match StatusTransition::for_target(target) {
            Some(transition) => self.transition(order_id, transition).await,
            None => {
                let current = self.require(order_id).await?;
                self.reject(TransitionError::IllegalStatus {
                    order_id: order_id.clone(),
                    from: current.status,
                    to: target,
                })
            }
        }
    }

    async fn transition(&self, order_id: &OrderId, transition: StatusTransition) -> Result<Order, KitchenError> {
        let now = self.clock.now();
        let applied = self
            .store
            .try_apply(order_id, |order| -> Result<(), TransitionError> {
                machine::check(order, transition)?;
                machine::apply(order, transition, now);
                Ok(())
            })
            .await;
        let (previous, mut next, revision) = match applied {
            Applied::Changed {
                previous,
                next,
                revision,
            } => (previous, next, revision),
            Applied::Unchanged(order) => return Ok(order),
            Applied::Rejected(e) => return self.reject(e),
            Applied::Missing => return Err(self.not_found(order_id)),
        };
        let staged = Staged {
            order_id: order_id.clone(),
            revision,
            previous: Some(previous.clone()),
            action: describe(transition, &previous),
        };

        match transition {
            StatusTransition::Accept => {
                let started_at = settle(
                    &self.store,
                    self.notices.as_ref(),
                    staged,
                    self.config.timeouts.accept,
                    self.service.accept_order(order_id),
                )
                .await?;
                let started_at = previous.started_at.unwrap_or(started_at);
                next.started_at = Some(started_at);
                self.store
                    .confirm(order_id, |o| {
                        if o.status == OrderStatus::Preparing {
                            o.started_at = Some(started_at);
                        }
                    })
                    .await;
            }
            _ => {
                settle(
                    &self.store,
                    self.notices.as_ref(),
                    staged,
                    self.config.timeouts.status,
                    self.service.update_status(order_id, transition.target()),
                )
                .await?;
            }
        }

        info!(
            order_id = %order_id,
            from = %previous.status,
            to = %next.status,
            "ORDER_STATUS_CHANGED"
        );
        self.history
            .lock()
            .await
            .add(ActionHistoryItem::status_change(previous, next.clone(), now));
        self.notices.show(
            Notice::success(format!("Order #{} {}", next.order_number, status_phrase(next.status))).for_order(order_id),
        );
        self.broadcast(ChangeKind::StatusChanged, &next, None).await;
        self.notify_roles(&next);
        Ok(next)
    }

    /// Set one item's status. Only allowed while the order is preparing.
    ///
    /// Setting the status an item already has is a no-op and reaches
    /// neither the service nor the history.
    pub async fn set_item_status(
        &self,
        order_id: &OrderId,
        index: usize,
        status: ItemStatus,
    ) -> Result<Order, KitchenError> {
        let now = self.clock.now();
        let applied = self
            .store
            .try_apply(order_id, |order| -> Result<(), TransitionError> {
                if machine::check_item_status(order, index, status)? {
                    machine::apply_item_status(order, index, status, now);
                }
                Ok(())
            })
            .await;
        let (previous, next, revision) = match applied {
            Applied::Changed {
                previous,
                next,
                revision,
            } => (previous, next, revision),
            Applied::Unchanged(order) => {
                debug!(order_id = %order_id, index, status = %status, "Item already has status");
                return Ok(order);
            }
            Applied::Rejected(e) => return self.reject(e),
            Applied::Missing => return Err(self.not_found(order_id)),
        };

        let previous_status = previous.items[index].status;
        let staged = Staged {
            order_id: order_id.clone(),
            revision,
            previous: Some(previous.clone()),
            action: format!("update an item on order #{}", previous.order_number),
        };

        settle(
            &self.store,
            self.notices.as_ref(),
            staged,
            self.config.timeouts.item,
            self.service.update_item_status(order_id, index, status),
        )
        .await?;

        info!(order_id = %order_id, index, status = %status, "ITEM_STATUS_CHANGED");
        self.history.lock().await.add(ActionHistoryItem::item_status_change(
            previous,
            next.clone(),
            index,
            previous_status,
            status,
            now,
        ));
        self.broadcast(ChangeKind::ItemStatusChanged, &next, Some(index)).await;
        Ok(next)
    }

    /// Flip an item between pending and fulfilled.
    pub async fn toggle_item(&self, order_id: &OrderId, index: usize) -> Result<Order, KitchenError> {
        let current = self.require(order_id).await?;
        let Some(item) = current.items.get(index) else {
            return self.reject(TransitionError::ItemOutOfRange {
                order_id: order_id.clone(),
                index,
            });
        };
        let status = item.status.toggled();
        self.set_item_status(order_id, index, status).await
    }

    /// Put an order on the board. Local only.
    pub async fn add_order(&self, order: Order) -> Result<Order, KitchenError> {
        let now = self.clock.now();
        self.store.put(order.clone()).await;
        info!(order_id = %order.id, order_number = %order.order_number, "ORDER_ADDED");
        self.history
            .lock()
            .await
            .add(ActionHistoryItem::order_add(order.clone(), now));
        self.broadcast(ChangeKind::OrderAdded, &order, None).await;
        Ok(order)
    }

    /// Take an order off the board. Local only.
    pub async fn dismiss_order(&self, order_id: &OrderId) -> Result<Order, KitchenError> {
        let now = self.clock.now();
        let Some(order) = self.store.remove(order_id).await else {
            return Err(KitchenError::NotFound(order_id.clone()));
        };
        info!(order_id = %order_id, "ORDER_DISMISSED");
        self.history
            .lock()
            .await
            .add(ActionHistoryItem::order_delete(order.clone(), now));
        self.broadcast(ChangeKind::OrderRemoved, &order, None).await;
        Ok(order)
    }

    /// Revert the most recent action using the configured policy.
    ///
    /// Returns `false` when there is nothing to undo.
    pub async fn undo(&self) -> Result<bool, KitchenError> {
        match self.config.undo_policy {
            UndoPolicy::Local => self.undo_local().await,
            UndoPolicy::Compensating => self.undo_compensating().await,
        }
    }

    /// Re-apply the most recently undone action using the configured policy.
    pub async fn redo(&self) -> Result<bool, KitchenError> {
        match self.config.undo_policy {
            UndoPolicy::Local => self.redo_local().await,
            UndoPolicy::Compensating => self.redo_compensating().await,
        }
    }

    /// Undo on this screen only. The service keeps its state until the
    /// next refresh.
    pub async fn undo_local(&self) -> Result<bool, KitchenError> {
        self.replay_local(Replay::Undo).await
    }

    pub async fn redo_local(&self) -> Result<bool, KitchenError> {
        self.replay_local(Replay::Redo).await
    }

    /// Undo and send the matching update to the service.
    ///
    /// The cursor only moves once the service confirms; a failed call is
    /// rolled back like any other mutation.
    pub async fn undo_compensating(&self) -> Result<bool, KitchenError> {
        self.replay_compensating(Replay::Undo).await
    }

    pub async fn redo_compensating(&self) -> Result<bool, KitchenError> {
        self.replay_compensating(Replay::Redo).await
    }

    pub async fn can_undo(&self) -> bool {
        self.history.lock().await.can_undo()
    }

    pub async fn can_redo(&self) -> bool {
        self.history.lock().await.can_redo()
    }

    /// Recorded actions, oldest first.
    pub async fn history(&self) -> Vec<ActionHistoryItem> {
        self.history.lock().await.entries().to_vec()
    }

    async fn replay_local(&self, replay: Replay) -> Result<bool, KitchenError> {
        let _replaying = self.replaying.lock().await;
        let mut history = self.history.lock().await;
        let Some(entry) = peek(&history, replay).cloned() else {
            debug!("Nothing to {}", replay.verb());
            return Ok(false);
        };

        let current = self.store.get(&entry.order_id).await;
        let effect = effect_of(&entry, replay, current.as_ref())?;
        self.apply_effect(&effect).await;
        step(&mut history, replay);
        drop(history);

        info!(order_id = %entry.order_id, kind = ?entry.kind, "{}_LOCAL", replay.verb().to_uppercase());
        self.broadcast_effect(&entry, &effect).await;
        Ok(true)
    }

    async fn replay_compensating(&self, replay: Replay) -> Result<bool, KitchenError> {
        let _replaying = self.replaying.lock().await;
        // The history stays unlocked during the service call so confirmed
        // mutations elsewhere are not held up by a slow compensation.
        let entry = peek(&*self.history.lock().await, replay).cloned();
        let Some(entry) = entry else {
            debug!("Nothing to {}", replay.verb());
            return Ok(false);
        };

        let current = self.store.get(&entry.order_id).await;
        let effect = effect_of(&entry, replay, current.as_ref())?;
        let compensation = compensation_for(&entry, replay, &effect)?;
        let revision = self.apply_effect(&effect).await;

        if let (Some(compensation), Some(revision)) = (compensation, revision) {
            let number = current
                .as_ref()
                .or(entry.previous_state.as_ref())
                .map(|o| o.order_number.clone())
                .unwrap_or_else(|| entry.order_id.to_string());
            let staged = Staged {
                order_id: entry.order_id.clone(),
                revision,
                previous: current,
                action: format!("{} the change to order #{}", replay.verb(), number),
            };
            match compensation {
                Compensation::Status(status) => {
                    settle(
                        &self.store,
                        self.notices.as_ref(),
                        staged,
                        self.config.timeouts.status,
                        self.service.update_status(&entry.order_id, status),
                    )
                    .await?
                }
                Compensation::Item(index, status) => {
                    settle(
                        &self.store,
                        self.notices.as_ref(),
                        staged,
                        self.config.timeouts.item,
                        self.service.update_item_status(&entry.order_id, index, status),
                    )
                    .await?
                }
            }
        }
        let mut history = self.history.lock().await;
        if peek(&history, replay) == Some(&entry) {
            step(&mut history, replay);
        } else {
            warn!(order_id = %entry.order_id, "History changed during {}, cursor kept", replay.verb());
        }
        drop(history);

        info!(order_id = %entry.order_id, kind = ?entry.kind, "{}_COMPENSATED", replay.verb().to_uppercase());
        self.broadcast_effect(&entry, &effect).await;
        Ok(true)
    }

    /// Apply a replay effect. Returns the new revision for a put.
    async fn apply_effect(&self, effect: &StoreEffect) -> Option<Revision> {
        match effect {
            StoreEffect::Put(order) => Some(self.store.put(order.clone()).await),
            StoreEffect::Remove(order_id) => {
                self.store.remove(order_id).await;
                None
            }
        }
    }

    async fn broadcast_effect(&self, entry: &ActionHistoryItem, effect: &StoreEffect) {
        match effect {
            StoreEffect::Put(order) => {
                let (kind, index) = match entry.kind {
                    ActionKind::StatusChange => (ChangeKind::StatusChanged, None),
                    ActionKind::ItemStatusChange => (ChangeKind::ItemStatusChanged, entry.item_index),
                    ActionKind::OrderAdd | ActionKind::OrderDelete => (ChangeKind::OrderAdded, None),
                };
                self.broadcast(kind, order, index).await;
            }
            StoreEffect::Remove(_) => {
                if let Some(order) = entry.new_state.as_ref().or(entry.previous_state.as_ref()) {
                    self.broadcast(ChangeKind::OrderRemoved, order, None).await;
                }
            }
        }
    }

    /// Publish a confirmed change. Failures are logged only.
    async fn broadcast(&self, kind: ChangeKind, order: &Order, item_index: Option<usize>) {
        if let Err(e) = self
            .bridge
            .publish_change(kind, order, item_index, self.clock.now())
            .await
        {
            debug!(order_id = %order.id, error = %e, "Change not broadcast");
        }
    }

    /// Tell the configured roles about a status change, without waiting.
    fn notify_roles(&self, order: &Order) {
        if self.config.notify_roles.is_empty() {
            return;
        }
        let notification = RoleNotification::status_changed(&self.config.restaurant_id, order, &self.config.notify_roles);
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            let order_id = notification.order_id.clone();
            if let Err(e) = notifier.notify(notification).await {
                error!(order_id = %order_id, error = %e, "ROLE_NOTIFY_FAILED");
            }
        });
    }

    async fn require(&self, order_id: &OrderId) -> Result<Order, KitchenError> {
        match self.store.get(order_id).await {
            Some(order) => Ok(order),
            None => Err(self.not_found(order_id)),
        }
    }

    fn not_found(&self, order_id: &OrderId) -> KitchenError {
        info!(order_id = %order_id, "Order not on the board");
        self.notices.show(Notice::info("That order is no longer on the board").for_order(order_id));
        KitchenError::NotFound(order_id.clone())
    }

    fn reject<T>(&self, err: TransitionError) -> Result<T, KitchenError> {
        info!(order_id = %err.order_id(), reason = %err, "TRANSITION_REJECTED");
        self.notices.show(Notice::info(err.user_message()).for_order(err.order_id()));
        Err(err.into())
    }

    /// Orders still in the kitchen, oldest first.
    pub fn active_orders(&self) -> Vec<Order> {
        views::active_orders(&self.store.snapshot())
    }

    /// Item totals across pending and preparing orders.
    pub fn all_day(&self) -> Vec<AllDayLine> {
        views::all_day(&self.store.snapshot())
    }

    /// Orders completed inside the recent window, newest first.
    pub fn recently_completed(&self) -> Vec<Order> {
        let since = self.clock.now() - self.config.recent_window;
        views::recently_completed(&self.store.snapshot(), since)
    }

    pub fn view(&self) -> ScreenView {
        *self.view.borrow()
    }

    /// Switch the board view.
    pub fn show_view(&self, view: ScreenView) {
        let previous = self.view.send_replace(view);
        if previous != view {
            info!(view = %view, "VIEW_CHANGED");
        }
    }

    pub fn subscribe_view(&self) -> watch::Receiver<ScreenView> {
        self.view.subscribe()
    }
}

impl std::fmt::Debug for KitchenScreen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KitchenScreen")
            .field("restaurant_id", &self.config.restaurant_id)
            .field("service", &self.service.name())
            .field("bridge", &self.bridge)
            .finish()
    }
}

fn describe(transition: StatusTransition, order: &Order) -> String {
    match transition {
        StatusTransition::Accept => format!("accept order #{}", order.order_number),
        StatusTransition::MarkReady => format!("mark order #{} ready", order.order_number),
        StatusTransition::Complete => format!("complete order #{}", order.order_number),
    }
}

fn peek(history: &ActionHistory, replay: Replay) -> Option<&ActionHistoryItem> {
    match replay {
        Replay::Undo => history.peek_undo(),
        Replay::Redo => history.peek_redo(),
    }
}

fn step(history: &mut ActionHistory, replay: Replay) {
    match replay {
        Replay::Undo => history.step_back(),
        Replay::Redo => history.step_forward(),
    };
}

fn effect_of(entry: &ActionHistoryItem, replay: Replay, current: Option<&Order>) -> Result<StoreEffect, HistoryError> {
    match replay {
        Replay::Undo => entry.undo_effect(current),
        Replay::Redo => entry.redo_effect(current),
    }
}

/// Status and item changes are mirrored to the service. Adding or
/// dismissing an order never is.
fn compensation_for(
    entry: &ActionHistoryItem,
    replay: Replay,
    effect: &StoreEffect,
) -> Result<Option<Compensation>, HistoryError> {
    let StoreEffect::Put(order) = effect else {
        return Ok(None);
    };
    match entry.kind {
        ActionKind::StatusChange => Ok(Some(Compensation::Status(order.status))),
        ActionKind::ItemStatusChange => {
            let status = match replay {
                Replay::Undo => entry.previous_item_status,
                Replay::Redo => entry.new_item_status,
            };
            match (entry.item_index, status) {
                (Some(index), Some(status)) => Ok(Some(Compensation::Item(index, status))),
                _ => Err(HistoryError::MissingSnapshot {
                    kind: entry.kind,
                    order_id: entry.order_id.clone(),
                }),
            }
        }
        ActionKind::OrderAdd | ActionKind::OrderDelete => Ok(None),
    }
}
