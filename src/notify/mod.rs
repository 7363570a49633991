pub mod discord;

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::NotifyError;
use crate::message::Notification;

pub use discord::DiscordNotifier;

/// Outbound chat sink. One `send` is one sink call.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, n: &Notification) -> Result<(), NotifyError>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    async fn send(&self, n: &Notification) -> Result<(), NotifyError> {
        (**self).send(n).await
    }
}

/// Keeps every notification in memory instead of delivering it.
/// Used by tests and by dry runs without a webhook.
#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every call fails (after being recorded).
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, n: &Notification) -> Result<(), NotifyError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(n.clone());
        }
        if self.fail {
            return Err(NotifyError::Status {
                status: 500,
                body: "recording notifier set to fail".into(),
            });
        }
        tracing::debug!(messages = n.message_count(), "recorded notification");
        Ok(())
    }
}
