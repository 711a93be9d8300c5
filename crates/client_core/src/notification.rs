//! User-facing notifications, delivered over a broadcast channel.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Validation,
    Device,
    SubmissionSucceeded,
    SubmissionFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raised_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self.kind, NotificationKind::SubmissionSucceeded)
    }
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn emit(&self, kind: NotificationKind, message: impl Into<String>) {
        // No subscribers is fine; headless callers rely on return values.
        let _ = self.tx.send(Notification::new(kind, message));
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}
