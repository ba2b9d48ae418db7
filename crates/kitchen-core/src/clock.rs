//! Wall-clock abstraction.

use std::fmt::Debug;

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Injected so tests can pin the clock; never used for `started_at`, which
/// always comes from the order service.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
