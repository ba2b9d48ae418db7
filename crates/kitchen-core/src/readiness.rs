//! Remaining prep time and urgency for a ticket.
//!
//! Purely computational: nothing here mutates an order or triggers a
//! transition. Callers re-evaluate on their own tick.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::order::{Order, OrderItem};

/// Remaining time at or below which an order is urgent.
pub const URGENT_THRESHOLD_MINUTES: i64 = 10;

/// Remaining time at or below which an order shows a warning.
pub const WARNING_THRESHOLD_MINUTES: i64 = 20;

/// Display band for remaining prep time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Normal,
    Warning,
    Urgent,
}

impl Urgency {
    /// Band for a remaining duration.
    pub fn for_remaining(remaining: Duration) -> Self {
        if remaining <= Duration::minutes(URGENT_THRESHOLD_MINUTES) {
            Self::Urgent
        } else if remaining <= Duration::minutes(WARNING_THRESHOLD_MINUTES) {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

/// Where the remaining time came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessSource {
    /// Item prep times counted from `started_at`.
    PrepTime,
    /// The order's `estimated_ready_time`.
    Estimate,
    /// Neither source is available.
    Unknown,
}

/// Remaining time for one order at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Readiness {
    #[serde(skip)]
    pub remaining: Option<Duration>,
    pub urgency: Urgency,
    pub source: ReadinessSource,
}

impl Readiness {
    fn unknown() -> Self {
        Self {
            remaining: None,
            urgency: Urgency::Normal,
            source: ReadinessSource::Unknown,
        }
    }

    fn from_remaining(remaining: Duration, source: ReadinessSource) -> Self {
        let remaining = remaining.max(Duration::zero());
        Self {
            remaining: Some(remaining),
            urgency: Urgency::for_remaining(remaining),
            source,
        }
    }

    /// Remaining time formatted as `mm:ss`, or `--:--` when unknown.
    pub fn display(&self) -> String {
        match self.remaining {
            Some(remaining) => format_remaining(remaining),
            None => "--:--".to_string(),
        }
    }
}

/// Total prep time for a set of lines: the slowest line (per-unit time × quantity).
///
/// Lines are prepared in parallel, so the longest line bounds the ticket.
/// Returns `None` when no line carries a prep time.
pub fn total_prep_time(items: &[OrderItem]) -> Option<Duration> {
    items
        .iter()
        .filter_map(OrderItem::line_prep_minutes)
        .max()
        .map(|minutes| Duration::minutes(i64::from(minutes)))
}

/// Compute readiness for an order at `now`.
pub fn readiness(order: &Order, now: DateTime<Utc>) -> Readiness {
    if let (Some(started_at), Some(total)) = (order.started_at, total_prep_time(&order.items)) {
        let elapsed = now.signed_duration_since(started_at).max(Duration::zero());
        return Readiness::from_remaining(total - elapsed, ReadinessSource::PrepTime);
    }

    match order.estimated_ready_time {
        Some(estimate) => Readiness::from_remaining(estimate.signed_duration_since(now), ReadinessSource::Estimate),
        None => Readiness::unknown(),
    }
}

/// Format a duration as `mm:ss`, clamping negatives to zero.
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;

    fn started(minutes_ago: i64, now: DateTime<Utc>) -> Order {
        Order::new("o1", "1", now - Duration::minutes(60))
            .with_status(OrderStatus::Preparing)
            .with_started_at(now - Duration::minutes(minutes_ago))
            .with_item(OrderItem::new("Steak", 2, 20.0).with_prep_time(12))
            .with_item(OrderItem::new("Salad", 1, 6.0).with_prep_time(5))
    }

    #[test]
    fn test_total_prep_time_uses_slowest_line() {
        let now = Utc::now();
        let order = started(0, now);
        assert_eq!(total_prep_time(&order.items), Some(Duration::minutes(24)));
        assert_eq!(total_prep_time(&[OrderItem::new("Water", 1, 0.0)]), None);
    }

    #[test]
    fn test_remaining_from_started_at() {
        let now = Utc::now();
        let r = readiness(&started(4, now), now);
        assert_eq!(r.source, ReadinessSource::PrepTime);
        assert_eq!(r.remaining, Some(Duration::minutes(20)));
        assert_eq!(r.urgency, Urgency::Warning);
    }

    #[test]
    fn test_remaining_never_negative() {
        let now = Utc::now();
        let r = readiness(&started(90, now), now);
        assert_eq!(r.remaining, Some(Duration::zero()));
        assert_eq!(r.urgency, Urgency::Urgent);
        assert_eq!(r.display(), "00:00");
    }

    #[test]
    fn test_falls_back_to_estimate_without_started_at() {
        let now = Utc::now();
        let order = Order::new("o2", "2", now)
            .with_item(OrderItem::new("Pasta", 1, 12.0).with_prep_time(15))
            .with_estimated_ready_time(now + Duration::minutes(45));
        let r = readiness(&order, now);
        assert_eq!(r.source, ReadinessSource::Estimate);
        assert_eq!(r.remaining, Some(Duration::minutes(45)));
        assert_eq!(r.urgency, Urgency::Normal);
    }

    #[test]
    fn test_unknown_without_any_source() {
        let now = Utc::now();
        let r = readiness(&Order::new("o3", "3", now), now);
        assert_eq!(r.source, ReadinessSource::Unknown);
        assert_eq!(r.display(), "--:--");
    }

    #[test]
    fn test_urgency_bands() {
        assert_eq!(Urgency::for_remaining(Duration::minutes(10)), Urgency::Urgent);
        assert_eq!(Urgency::for_remaining(Duration::minutes(11)), Urgency::Warning);
        assert_eq!(Urgency::for_remaining(Duration::minutes(20)), Urgency::Warning);
        assert_eq!(Urgency::for_remaining(Duration::minutes(21)), Urgency::Normal);
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(Duration::seconds(125)), "02:05");
        assert_eq!(format_remaining(Duration::seconds(-5)), "00:00");
    }
}
