//! Outbound realtime pushes.
//!
//! Delivery is best-effort and decoupled from persistence: the dispatcher
//! runs every push on its own task after the write has committed, and a
//! failed push is logged and counted, never returned to the caller.

use crate::metrics::NOTIFICATIONS_TOTAL;
use crate::models::Message;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("recipient {0} has no live connection")]
    RecipientOffline(String),

    #[error("serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("channel error: {0}")]
    Channel(String),
}

#[async_trait]
pub trait DeliveryNotifier: Send + Sync {
    async fn notify_new_message(
        &self,
        recipient_username: &str,
        message: &Message,
    ) -> Result<(), NotifyError>;

    async fn notify_read_receipt(
        &self,
        original_sender_username: &str,
        message_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<(), NotifyError>;
}

/// Drops every push.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl DeliveryNotifier for NoopNotifier {
    async fn notify_new_message(&self, _: &str, _: &Message) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn notify_read_receipt(
        &self,
        _: &str,
        _: Uuid,
        _: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        Ok(())
    }
}

fn record(kind: &str, result: &Result<(), NotifyError>) {
    let outcome = match result {
        Ok(()) => "delivered",
        Err(NotifyError::RecipientOffline(_)) => "offline",
        Err(_) => "failed",
    };
    NOTIFICATIONS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

/// Fire-and-forget front of a [`DeliveryNotifier`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn DeliveryNotifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn DeliveryNotifier>) -> Self {
        Self { notifier }
    }

    /// Push a new message to its recipient. The handle may be dropped.
    pub fn new_message(&self, message: Message) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let result = notifier
                .notify_new_message(&message.recipient_username, &message)
                .await;
            record("new_message", &result);
            match result {
                Ok(()) => {}
                Err(NotifyError::RecipientOffline(recipient)) => {
                    tracing::debug!(
                        message_id = %message.id,
                        recipient = %recipient,
                        "recipient offline, new message push skipped"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        message_id = %message.id,
                        recipient = %message.recipient_username,
                        "new message push failed"
                    );
                }
            }
        })
    }

    /// Push read receipts for `messages` to their original senders.
    pub fn read_receipts(&self, messages: Vec<Message>) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            for message in messages {
                let Some(read_at) = message.read_at() else {
                    continue;
                };
                let result = notifier
                    .notify_read_receipt(&message.sender_username, message.id, read_at)
                    .await;
                record("read_receipt", &result);
                match result {
                    Ok(()) | Err(NotifyError::RecipientOffline(_)) => {}
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            message_id = %message.id,
                            sender = %message.sender_username,
                            "read receipt push failed"
                        );
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        receipts: Mutex<Vec<(String, Uuid)>>,
    }

    #[async_trait]
    impl DeliveryNotifier for Recording {
        async fn notify_new_message(&self, _: &str, _: &Message) -> Result<(), NotifyError> {
            Err(NotifyError::Channel("closed".into()))
        }

        async fn notify_read_receipt(
            &self,
            sender: &str,
            message_id: Uuid,
            _: DateTime<Utc>,
        ) -> Result<(), NotifyError> {
            self.receipts.lock().push((sender.to_string(), message_id));
            Ok(())
        }
    }

    fn message() -> Message {
        Message::new(
            Uuid::new_v4(),
            "alice".into(),
            "bob".into(),
            "hi".into(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_failed_push_does_not_panic_task() {
        let dispatcher = NotificationDispatcher::new(Arc::new(Recording::default()));
        dispatcher.new_message(message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_receipts_skip_unread_messages() {
        let recording = Arc::new(Recording::default());
        let dispatcher = NotificationDispatcher::new(recording.clone());

        let unread = message();
        let mut read = message();
        read.mark_read(Utc::now());

        dispatcher
            .read_receipts(vec![unread, read.clone()])
            .await
            .unwrap();

        let receipts = recording.receipts.lock();
        assert_eq!(receipts.as_slice(), &[("alice".to_string(), read.id)]);
    }
}
