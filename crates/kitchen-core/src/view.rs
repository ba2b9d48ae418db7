//! Screen views of the kitchen board.

use serde::{Deserialize, Serialize};

/// Which set of orders the screen is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenView {
    /// Active tickets (pending, preparing, ready).
    #[default]
    Active,
    /// Item counts aggregated across every active ticket.
    AllDay,
    /// Tickets completed within the recent window.
    RecentlyCompleted,
}

impl ScreenView {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::AllDay => "all_day",
            Self::RecentlyCompleted => "recently_completed",
        }
    }

    /// Spoken name of the view.
    pub fn spoken(&self) -> &'static str {
        match self {
            Self::Active => "active orders",
            Self::AllDay => "all day",
            Self::RecentlyCompleted => "recently completed orders",
        }
    }
}

impl std::fmt::Display for ScreenView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
