//! Collaborators that record what they are given.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use kitchen_core::{Notice, NoticeLevel, NoticeSink, RoleNotification, RoleNotifier, ServiceError};
use realtime_bridge::{BridgeError, ChangeChannel, ChangeEvent, RefreshReason, Refresher};

fn snapshot<T: Clone>(items: &Mutex<Vec<T>>) -> Vec<T> {
    items.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn record<T>(items: &Mutex<Vec<T>>, item: T) {
    items.lock().unwrap_or_else(PoisonError::into_inner).push(item);
}

/// A notice sink that keeps every notice.
#[derive(Debug, Default)]
pub struct RecordingNotices {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        snapshot(&self.notices)
    }

    /// Messages of the given level, oldest first.
    pub fn messages(&self, level: NoticeLevel) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }

    /// Number of notices whose message contains `text` (case-insensitive).
    pub fn count_containing(&self, text: &str) -> usize {
        let text = text.to_lowercase();
        self.notices()
            .iter()
            .filter(|n| n.message.to_lowercase().contains(&text))
            .count()
    }

    pub fn clear(&self) {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl NoticeSink for RecordingNotices {
    fn show(&self, notice: Notice) {
        record(&self.notices, notice);
    }
}

/// A role notifier that keeps every notification.
#[derive(Debug, Default)]
pub struct RecordingRoleNotifier {
    notifications: Mutex<Vec<RoleNotification>>,
    fail: AtomicBool,
}

impl RecordingRoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every notification fail after being recorded.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn notifications(&self) -> Vec<RoleNotification> {
        snapshot(&self.notifications)
    }
}

#[async_trait]
impl RoleNotifier for RecordingRoleNotifier {
    async fn notify(&self, notification: RoleNotification) -> Result<(), ServiceError> {
        record(&self.notifications, notification);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::Transport("notifications offline".to_string()));
        }
        Ok(())
    }
}

/// A change channel that keeps every published event.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    events: Mutex<Vec<(String, ChangeEvent)>>,
    fail: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every publish after recording it.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Published `(room, event)` pairs, oldest first.
    pub fn events(&self) -> Vec<(String, ChangeEvent)> {
        snapshot(&self.events)
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ChangeChannel for RecordingChannel {
    async fn publish(&self, room: &str, event: &ChangeEvent) -> Result<(), BridgeError> {
        record(&self.events, (room.to_string(), event.clone()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(BridgeError::Rejected {
                status: 502,
                body: "gateway down".to_string(),
            });
        }
        Ok(())
    }
}

/// A refresher that counts refresh requests.
#[derive(Debug, Default)]
pub struct CountingRefresher {
    reasons: Mutex<Vec<RefreshReason>>,
    fail: AtomicBool,
}

impl CountingRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn reasons(&self) -> Vec<RefreshReason> {
        snapshot(&self.reasons)
    }

    pub fn count(&self) -> usize {
        self.reasons.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl Refresher for CountingRefresher {
    async fn refresh(&self, reason: RefreshReason) -> Result<(), BridgeError> {
        record(&self.reasons, reason);
        if self.fail.load(Ordering::SeqCst) {
            return Err(BridgeError::Refresh("order service unavailable".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_filtering() {
        let sink = RecordingNotices::new();
        sink.show(Notice::info("Status cannot be changed at this stage"));
        sink.show(Notice::error("Request timed out, please retry"));
        assert_eq!(sink.messages(NoticeLevel::Error).len(), 1);
        assert_eq!(sink.count_containing("TIMED OUT"), 1);
        sink.clear();
        assert!(sink.notices().is_empty());
    }
}
