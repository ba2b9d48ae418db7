//! Configuration for the kitchen screen.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use kitchen_core::DEFAULT_HISTORY_CAPACITY;

use crate::error::KitchenError;

/// How undo and redo reach the order service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UndoPolicy {
    /// Only the screen's store changes.
    #[default]
    Local,
    /// A compensating status or item update is sent to the order service.
    Compensating,
}

impl FromStr for UndoPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "compensating" | "remote" => Ok(Self::Compensating),
            other => Err(format!("unknown undo policy '{}'", other)),
        }
    }
}

/// Time bounds for order service calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationTimeouts {
    pub accept: Duration,
    pub status: Duration,
    pub item: Duration,
}

impl Default for MutationTimeouts {
    fn default() -> Self {
        Self {
            accept: Duration::from_secs(15),
            status: Duration::from_secs(10),
            item: Duration::from_secs(8),
        }
    }
}

/// Configuration for a kitchen screen.
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// Restaurant the screen belongs to.
    pub restaurant_id: String,

    /// Undo/redo semantics.
    pub undo_policy: UndoPolicy,

    /// Order service time bounds.
    pub timeouts: MutationTimeouts,

    /// Roles told about status changes. Empty disables role notifications.
    pub notify_roles: Vec<String>,

    /// Maximum number of undoable actions.
    pub history_capacity: usize,

    /// How long completed orders stay in the recently completed view.
    pub recent_window: chrono::Duration,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        Self {
            restaurant_id: String::new(),
            undo_policy: UndoPolicy::default(),
            timeouts: MutationTimeouts::default(),
            notify_roles: Vec::new(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            recent_window: chrono::Duration::minutes(30),
        }
    }
}

impl KitchenConfig {
    /// Create a configuration for `restaurant_id` with defaults.
    pub fn new(restaurant_id: impl Into<String>) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `KITCHEN_RESTAURANT_ID` - Restaurant scope
    ///
    /// Optional environment variables:
    /// - `KITCHEN_UNDO_POLICY` - `local` or `compensating` (default: local)
    /// - `KITCHEN_NOTIFY_ROLES` - Comma-separated roles to notify (default: none)
    /// - `KITCHEN_HISTORY_CAPACITY` - Undo depth (default: 100)
    /// - `KITCHEN_ACCEPT_TIMEOUT_SECS` - Accept time bound (default: 15)
    /// - `KITCHEN_STATUS_TIMEOUT_SECS` - Status update time bound (default: 10)
    /// - `KITCHEN_ITEM_TIMEOUT_SECS` - Item update time bound (default: 8)
    /// - `KITCHEN_RECENT_WINDOW_MINS` - Recently completed window (default: 30)
    pub fn from_env() -> Result<Self, KitchenError> {
        let restaurant_id = env::var("KITCHEN_RESTAURANT_ID")
            .map_err(|_| KitchenError::Config("KITCHEN_RESTAURANT_ID not set".to_string()))?;
        let mut config = Self::new(restaurant_id);

        if let Ok(raw) = env::var("KITCHEN_UNDO_POLICY") {
            config.undo_policy = raw.parse().map_err(KitchenError::Config)?;
        }

        if let Ok(raw) = env::var("KITCHEN_NOTIFY_ROLES") {
            config.notify_roles = parse_roles(&raw);
        }

        if let Some(capacity) = env_number("KITCHEN_HISTORY_CAPACITY")? {
            config.history_capacity = capacity as usize;
        }
        if let Some(secs) = env_number("KITCHEN_ACCEPT_TIMEOUT_SECS")? {
            config.timeouts.accept = Duration::from_secs(secs);
        }
        if let Some(secs) = env_number("KITCHEN_STATUS_TIMEOUT_SECS")? {
            config.timeouts.status = Duration::from_secs(secs);
        }
        if let Some(secs) = env_number("KITCHEN_ITEM_TIMEOUT_SECS")? {
            config.timeouts.item = Duration::from_secs(secs);
        }
        if let Some(mins) = env_number("KITCHEN_RECENT_WINDOW_MINS")? {
            config.recent_window = chrono::Duration::minutes(mins as i64);
        }

        Ok(config)
    }

    /// Set the undo policy.
    pub fn with_undo_policy(mut self, policy: UndoPolicy) -> Self {
        self.undo_policy = policy;
        self
    }

    /// Set the roles notified on status changes.
    pub fn with_notify_roles(mut self, roles: Vec<String>) -> Self {
        self.notify_roles = roles;
        self
    }

    /// Set the service time bounds.
    pub fn with_timeouts(mut self, timeouts: MutationTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

fn parse_roles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_number(name: &str) -> Result<Option<u64>, KitchenError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|v| *v > 0)
            .map(Some)
            .ok_or_else(|| KitchenError::Config(format!("{} must be a positive integer, got '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
