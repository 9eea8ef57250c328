//! Human-readable notifications pushed to whatever surface listens.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use stockwise_events::EventBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            created_at: at,
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(NotificationKind::Success, title, message, at)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(NotificationKind::Warning, title, message, at)
    }
}

/// Fire-and-forget notification target.
pub trait NotificationSink: Send + Sync {
    fn add_alert(&self, notification: Notification);
}

impl<N> NotificationSink for Arc<N>
where
    N: NotificationSink + ?Sized,
{
    fn add_alert(&self, notification: Notification) {
        (**self).add_alert(notification)
    }
}

/// Publishes notifications onto a bus; listeners subscribe instead of polling.
#[derive(Debug)]
pub struct BusNotificationSink<B> {
    bus: B,
}

impl<B> BusNotificationSink<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }
}

impl<B> NotificationSink for BusNotificationSink<B>
where
    B: EventBus<Notification>,
{
    fn add_alert(&self, notification: Notification) {
        let title = notification.title.clone();
        if let Err(err) = self.bus.publish(notification) {
            warn!(%title, error = ?err, "failed to publish notification");
        }
    }
}
