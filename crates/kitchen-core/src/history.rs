//! Action history log for undo/redo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;
use crate::machine;
use crate::order::{ItemStatus, Order, OrderId};

/// Default number of entries kept before the oldest are dropped.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Kind of mutation recorded in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ItemStatusChange,
    StatusChange,
    OrderAdd,
    OrderDelete,
}

/// An immutable record of one applied mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionHistoryItem {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub order_id: OrderId,
    pub previous_state: Option<Order>,
    pub new_state: Option<Order>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_item_status: Option<ItemStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_item_status: Option<ItemStatus>,
}

/// What undoing or redoing an entry does to the order store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEffect {
    /// Insert or replace the order.
    Put(Order),
    /// Remove the order.
    Remove(OrderId),
}

impl ActionHistoryItem {
    /// Record an order status change.
    pub fn status_change(previous: Order, new: Order, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: ActionKind::StatusChange,
            order_id: new.id.clone(),
            previous_state: Some(previous),
            new_state: Some(new),
            timestamp,
            item_index: None,
            previous_item_status: None,
            new_item_status: None,
        }
    }

    /// Record an item status change.
    pub fn item_status_change(
        previous: Order,
        new: Order,
        index: usize,
        previous_status: ItemStatus,
        new_status: ItemStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: ActionKind::ItemStatusChange,
            order_id: new.id.clone(),
            previous_state: Some(previous),
            new_state: Some(new),
            timestamp,
            item_index: Some(index),
            previous_item_status: Some(previous_status),
            new_item_status: Some(new_status),
        }
    }

    /// Record an order added to the board.
    pub fn order_add(order: Order, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: ActionKind::OrderAdd,
            order_id: order.id.clone(),
            previous_state: None,
            new_state: Some(order),
            timestamp,
            item_index: None,
            previous_item_status: None,
            new_item_status: None,
        }
    }

    /// Record an order removed from the board.
    pub fn order_delete(order: Order, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: ActionKind::OrderDelete,
            order_id: order.id.clone(),
            previous_state: Some(order),
            new_state: None,
            timestamp,
            item_index: None,
            previous_item_status: None,
            new_item_status: None,
        }
    }

    /// Effect of reverting this entry, given the order as currently stored.
    pub fn undo_effect(&self, current: Option<&Order>) -> Result<StoreEffect, HistoryError> {
        match self.kind {
            ActionKind::StatusChange => {
                let prev = self.snapshot(&self.previous_state)?;
                Ok(StoreEffect::Put(machine::restore(prev, current)))
            }
            ActionKind::ItemStatusChange => {
                self.item_effect(current, self.previous_item_status, &self.previous_state)
            }
            ActionKind::OrderAdd => Ok(StoreEffect::Remove(self.order_id.clone())),
            ActionKind::OrderDelete => Ok(StoreEffect::Put(self.snapshot(&self.previous_state)?.clone())),
        }
    }

    /// Effect of re-applying this entry, given the order as currently stored.
    pub fn redo_effect(&self, current: Option<&Order>) -> Result<StoreEffect, HistoryError> {
        match self.kind {
            ActionKind::StatusChange => {
                let new = self.snapshot(&self.new_state)?;
                Ok(StoreEffect::Put(machine::restore(new, current)))
            }
            ActionKind::ItemStatusChange => self.item_effect(current, self.new_item_status, &self.new_state),
            ActionKind::OrderAdd => Ok(StoreEffect::Put(self.snapshot(&self.new_state)?.clone())),
            ActionKind::OrderDelete => Ok(StoreEffect::Remove(self.order_id.clone())),
        }
    }

    fn snapshot<'a>(&self, state: &'a Option<Order>) -> Result<&'a Order, HistoryError> {
        state.as_ref().ok_or_else(|| HistoryError::MissingSnapshot {
            kind: self.kind,
            order_id: self.order_id.clone(),
        })
    }

    fn item_effect(
        &self,
        current: Option<&Order>,
        status: Option<ItemStatus>,
        fallback: &Option<Order>,
    ) -> Result<StoreEffect, HistoryError> {
        match (current, self.item_index, status) {
            (Some(order), Some(index), Some(status)) if index < order.items.len() => {
                let mut order = order.clone();
                order.items[index].status = status;
                Ok(StoreEffect::Put(order))
            }
            _ => Ok(StoreEffect::Put(self.snapshot(fallback)?.clone())),
        }
    }
}

/// Linear undo/redo log with a cursor.
///
/// Entries before the cursor are applied; entries after it can be redone.
/// Adding an entry while the cursor is not at the tail discards the redo
/// branch.
#[derive(Debug, Clone)]
pub struct ActionHistory {
    entries: Vec<ActionHistoryItem>,
    applied: usize,
    capacity: usize,
}

impl Default for ActionHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionHistory {
    /// Create an empty history with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create an empty history keeping at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            applied: 0,
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, truncating any redo branch first.
    pub fn add(&mut self, item: ActionHistoryItem) {
        self.entries.truncate(self.applied);
        self.entries.push(item);
        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
        self.applied = self.entries.len();
    }

    /// Index of the most recently applied entry, if any.
    pub fn current_index(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    /// The entry an undo would revert.
    pub fn peek_undo(&self) -> Option<&ActionHistoryItem> {
        self.current_index().and_then(|i| self.entries.get(i))
    }

    /// The entry a redo would re-apply.
    pub fn peek_redo(&self) -> Option<&ActionHistoryItem> {
        self.entries.get(self.applied)
    }

    /// Move the cursor back one entry. Returns the entry stepped over.
    pub fn step_back(&mut self) -> Option<ActionHistoryItem> {
        let item = self.peek_undo()?.clone();
        self.applied -= 1;
        Some(item)
    }

    /// Move the cursor forward one entry. Returns the entry stepped over.
    pub fn step_forward(&mut self) -> Option<ActionHistoryItem> {
        let item = self.peek_redo()?.clone();
        self.applied += 1;
        Some(item)
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[ActionHistoryItem] {
        &self.entries
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }
}
