//! Voice session lifetime.

use chrono::{DateTime, Duration, Utc};

/// One activation of voice mode. Dies on deactivation or at its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSession {
    pub active: bool,
    pub activated_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub wake_word_detected: bool,
    pub last_command_time: Option<DateTime<Utc>>,
}

impl VoiceSession {
    /// Start a session lasting `length`.
    pub fn start(now: DateTime<Utc>, length: std::time::Duration) -> Self {
        let length = Duration::from_std(length).unwrap_or_else(|_| Duration::hours(1));
        Self {
            active: true,
            activated_at: now,
            deadline: now + length,
            wake_word_detected: false,
            last_command_time: None,
        }
    }

    /// Whether the hard deadline has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }

    /// Time left before the deadline, floored at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline - now).max(Duration::zero())
    }

    pub fn record_wake(&mut self) {
        self.wake_word_detected = true;
    }

    pub fn record_command(&mut self, at: DateTime<Utc>) {
        self.wake_word_detected = false;
        self.last_command_time = Some(at);
    }
}
