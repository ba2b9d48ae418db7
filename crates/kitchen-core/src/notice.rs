//! User-facing notices (toasts).

use serde::Serialize;

use crate::order::OrderId;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A short message shown to kitchen staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            order_id: None,
        }
    }

    /// Attach the order this notice is about.
    pub fn for_order(mut self, order_id: &OrderId) -> Self {
        self.order_id = Some(order_id.clone());
        self
    }
}

/// Destination for notices.
///
/// Abstracted to support different surfaces (screen toasts, logs, tests).
pub trait NoticeSink: Send + Sync {
    fn show(&self, notice: Notice);
}

/// A sink that discards every notice.
#[derive(Debug, Clone, Default)]
pub struct NoOpNotices;

impl NoticeSink for NoOpNotices {
    fn show(&self, _notice: Notice) {}
}

/// A sink that logs every notice.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotices;

impl NoticeSink for LoggingNotices {
    fn show(&self, notice: Notice) {
        let order = notice.order_id.as_ref().map(OrderId::as_str).unwrap_or("-");
        match notice.level {
            NoticeLevel::Error => tracing::warn!(order_id = %order, "{}", notice.message),
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(order_id = %order, "{}", notice.message)
            }
        }
    }
}
