//! Strict schema for orders arriving from the network.
//!
//! Payloads are decoded into loosely typed wire structs first and then
//! checked field by field, so a malformed order is rejected at the boundary
//! instead of reaching the state machine.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::order::{AddOn, ItemStatus, Order, OrderId, OrderItem, OrderStatus, OrderType};

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The payload is not valid JSON for the expected shape.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A required field is missing or empty.
    #[error("{0} is required")]
    Missing(String),

    /// A field holds a value outside its domain.
    #[error("{field} is invalid: {reason}")]
    Invalid { field: String, reason: String },
}

impl ValidationError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// An add-on as sent by the order service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAddOn {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// An item line as sent by the order service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub prep_time: Option<f64>,
    #[serde(default, alias = "selectedAddOns")]
    pub add_ons: Vec<WireAddOn>,
}

/// An order as sent by the order service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrder {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub order_number: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub items: Vec<WireItem>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_ready_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "assigner")]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub order_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Decode and validate a single order from JSON.
pub fn parse_order(value: Value) -> Result<Order, ValidationError> {
    let wire: WireOrder =
        serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    validate_order(wire)
}

/// Validate a wire order into a domain order.
pub fn validate_order(wire: WireOrder) -> Result<Order, ValidationError> {
    let id = non_empty(wire.id, "id")?;

    let order_number = match wire.order_number {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        None | Some(Value::Null) => id.clone(),
        Some(other) => {
            return Err(ValidationError::invalid("orderNumber", format!("unexpected value {}", other)))
        }
    };

    let status: OrderStatus = non_empty(wire.status, "status")?
        .parse()
        .map_err(|e: String| ValidationError::invalid("status", e))?;

    let created_at = wire
        .created_at
        .ok_or_else(|| ValidationError::Missing("createdAt".to_string()))?;
    let updated_at = wire.updated_at.unwrap_or(created_at);

    if status == OrderStatus::Preparing && wire.started_at.is_none() {
        return Err(ValidationError::Missing("startedAt".to_string()));
    }
    if wire.completed_at.is_some() && status != OrderStatus::Completed {
        return Err(ValidationError::invalid("completedAt", "set on an order that is not completed"));
    }

    let items = wire
        .items
        .into_iter()
        .enumerate()
        .map(|(i, item)| validate_item(item, i))
        .collect::<Result<Vec<_>, _>>()?;

    let order_type = match wire.order_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_order_type(raw)?),
    };

    Ok(Order {
        id: OrderId::new(id),
        order_number,
        status,
        items,
        created_at,
        updated_at,
        estimated_ready_time: wire.estimated_ready_time,
        started_at: wire.started_at,
        completed_at: wire.completed_at,
        assigned_to: wire.assigned_to.filter(|s| !s.trim().is_empty()),
        customer_name: wire.customer_name.filter(|s| !s.trim().is_empty()),
        order_type,
        notes: wire.notes.filter(|s| !s.trim().is_empty()),
    })
}

fn validate_item(wire: WireItem, index: usize) -> Result<OrderItem, ValidationError> {
    let field = |name: &str| format!("items[{}].{}", index, name);

    let name = non_empty(wire.name, &field("name"))?;

    let quantity = wire.quantity.ok_or_else(|| ValidationError::Missing(field("quantity")))?;
    let quantity = u32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| ValidationError::invalid(field("quantity"), "must be a positive integer"))?;

    let price = wire.price.unwrap_or(0.0);
    if !price.is_finite() || price < 0.0 {
        return Err(ValidationError::invalid(field("price"), "must be non-negative"));
    }

    let status = match wire.status.as_deref() {
        None => ItemStatus::Pending,
        Some(raw) => raw
            .parse()
            .map_err(|e: String| ValidationError::invalid(field("status"), e))?,
    };

    let prep_time = match wire.prep_time {
        None => None,
        Some(t) if t.is_finite() && t >= 0.0 => Some(t.round() as u32),
        Some(_) => return Err(ValidationError::invalid(field("prepTime"), "must be non-negative")),
    };

    let add_ons = wire
        .add_ons
        .into_iter()
        .enumerate()
        .map(|(j, a)| {
            let prefix = format!("items[{}].addOns[{}]", index, j);
            let price = a.price.unwrap_or(0.0);
            if !price.is_finite() || price < 0.0 {
                return Err(ValidationError::invalid(format!("{}.price", prefix), "must be non-negative"));
            }
            Ok(AddOn {
                id: non_empty(a.id, &format!("{}.id", prefix))?,
                name: non_empty(a.name, &format!("{}.name", prefix))?,
                price,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(OrderItem {
        name,
        quantity,
        price,
        status,
        prep_time,
        add_ons,
    })
}

fn parse_order_type(raw: &str) -> Result<OrderType, ValidationError> {
    match raw.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
        "dine_in" | "dinein" => Ok(OrderType::DineIn),
        "takeout" | "take_out" | "pickup" => Ok(OrderType::Takeout),
        "delivery" => Ok(OrderType::Delivery),
        other => Err(ValidationError::invalid("orderType", format!("unknown order type '{}'", other))),
    }
}

fn non_empty(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ValidationError::Missing(field.to_string())),
    }
}
