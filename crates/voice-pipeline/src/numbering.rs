//! Temporal order numbering for voice addressing.
//!
//! While voice mode is on, every active order gets a small number that is
//! easy to say. Numbers are assigned in working order: orders being
//! prepared first, then pending ones, then ready ones; oldest first inside
//! each group. The map is rebuilt from scratch on every store change.

use std::collections::{BTreeMap, HashMap};

use kitchen_core::{Order, OrderId, OrderStatus};
use serde::Serialize;

/// Groups in numbering order.
const GROUPS: [OrderStatus; 3] = [OrderStatus::Preparing, OrderStatus::Pending, OrderStatus::Ready];

/// What the interpreter is told about a numbered order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberedOrder {
    pub order_id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
}

/// Order id to spoken number mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderNumberMap {
    by_id: HashMap<OrderId, u32>,
    by_number: BTreeMap<u32, NumberedOrder>,
}

impl OrderNumberMap {
    /// Number the active orders in `orders`. Completed orders are skipped.
    pub fn compute(orders: &[Order]) -> Self {
        let mut map = Self::default();
        let mut next = 1u32;

        for group in GROUPS {
            let mut members: Vec<&Order> = orders.iter().filter(|o| o.status == group).collect();
            members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

            for order in members {
                map.by_id.insert(order.id.clone(), next);
                map.by_number.insert(
                    next,
                    NumberedOrder {
                        order_id: order.id.clone(),
                        order_number: order.order_number.clone(),
                        status: order.status,
                    },
                );
                next += 1;
            }
        }

        map
    }

    /// Spoken number of an order.
    pub fn number_of(&self, order_id: &OrderId) -> Option<u32> {
        self.by_id.get(order_id).copied()
    }

    /// Order addressed by a spoken number.
    pub fn order_for(&self, number: u32) -> Option<&NumberedOrder> {
        self.by_number.get(&number)
    }

    /// Numbered orders in ascending number order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, &NumberedOrder)> {
        self.by_number.iter().map(|(n, o)| (*n, o))
    }

    /// Map keyed by the spoken number, as sent to the interpreter.
    pub fn to_wire(&self) -> BTreeMap<String, NumberedOrder> {
        self.by_number
            .iter()
            .map(|(n, o)| (n.to_string(), o.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_number.clear();
    }
}
