//! Transient user-facing notifications (toasts).
//!
//! The rendering layer subscribes to a [`Notifier`] and shows each
//! notification for `duration_ms`. Publishing never blocks and never fails,
//! whether or not anyone is listening.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;
const MAX_RECENT: usize = 100;

/// Toast duration for connection and validation messages.
pub const SHORT_DURATION_MS: u64 = 3_000;
/// Toast duration for transfer outcomes.
pub const LONG_DURATION_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            notification_type,
            title: title.into(),
            message: message.into(),
            duration_ms: SHORT_DURATION_MS,
            timestamp: Utc::now(),
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Broadcast channel for notifications plus a bounded history of recent ones.
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
    recent: Mutex<VecDeque<Notification>>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    /// Subscribe to notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn publish(&self, notification: Notification) {
        {
            let mut recent = self.recent.lock();
            recent.push_front(notification.clone());
            recent.truncate(MAX_RECENT);
        }
        // No receivers is fine: toasts are best-effort.
        let _ = self.tx.send(notification);
    }

    pub fn info(&self, title: impl Into<String>, message: impl Into<String>) {
        self.publish(Notification::new(NotificationType::Info, title, message));
    }

    pub fn success(&self, title: impl Into<String>, message: impl Into<String>) {
        self.publish(Notification::new(NotificationType::Success, title, message));
    }

    pub fn warning(&self, title: impl Into<String>, message: impl Into<String>) {
        self.publish(Notification::new(NotificationType::Warning, title, message));
    }

    pub fn error(&self, title: impl Into<String>, message: impl Into<String>) {
        self.publish(Notification::new(NotificationType::Error, title, message));
    }

    /// Most recent notifications, newest first.
    pub fn recent(&self) -> Vec<Notification> {
        self.recent.lock().iter().cloned().collect()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
