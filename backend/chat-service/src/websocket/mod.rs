use crate::models::Message;
use crate::services::notifier::{DeliveryNotifier, NotifyError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod events;

pub use events::WsOutboundEvent;

/// Unique identifier for a WebSocket subscriber
///
/// Each WebSocket connection gets a unique subscriber ID when it registers.
/// This allows for precise cleanup when connections close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber entry with ID and channel
struct Subscriber {
    id: SubscriberId,
    sender: UnboundedSender<String>,
}

/// Connection registry for WebSocket subscribers
///
/// Tracks the live connections of each user (a user may have several
/// devices connected). Doubles as the in-process [`DeliveryNotifier`].
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    // username -> list of subscribers
    inner: Arc<RwLock<HashMap<String, Vec<Subscriber>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `username`.
    ///
    /// Returns the subscriber id (used for cleanup) and the receiving end of
    /// the connection's outbound queue.
    pub async fn add_subscriber(&self, username: &str) -> (SubscriberId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let subscriber_id = SubscriberId::new();

        let mut guard = self.inner.write().await;
        let subscribers = guard.entry(username.to_string()).or_default();
        subscribers.push(Subscriber {
            id: subscriber_id,
            sender: tx,
        });

        tracing::debug!(
            "Added subscriber {:?} for user {}, total subscribers: {}",
            subscriber_id,
            username,
            subscribers.len()
        );

        (subscriber_id, rx)
    }

    /// Remove a specific subscriber. Must be called when a connection closes.
    pub async fn remove_subscriber(&self, username: &str, subscriber_id: SubscriberId) {
        let mut guard = self.inner.write().await;

        if let Some(subscribers) = guard.get_mut(username) {
            subscribers.retain(|s| s.id != subscriber_id);

            if subscribers.is_empty() {
                guard.remove(username);
                tracing::debug!("Removed last subscriber for user {}", username);
            }
        }
    }

    /// Send `msg` to every live connection of `username`.
    ///
    /// Dead senders are cleaned up on the way. Returns how many connections
    /// accepted the message.
    pub async fn send_to_user(&self, username: &str, msg: String) -> usize {
        let mut guard = self.inner.write().await;
        let Some(subscribers) = guard.get_mut(username) else {
            return 0;
        };

        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.sender.send(msg.clone()).is_ok());
        let after = subscribers.len();

        if before != after {
            tracing::debug!(
                "Send to user {}: {} dead senders cleaned up, {} active",
                username,
                before - after,
                after
            );
        }
        if after == 0 {
            guard.remove(username);
        }
        after
    }

    async fn push(&self, username: &str, event: WsOutboundEvent) -> Result<(), NotifyError> {
        let payload = event.to_json()?;
        if self.send_to_user(username, payload).await == 0 {
            return Err(NotifyError::RecipientOffline(username.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DeliveryNotifier for ConnectionRegistry {
    async fn notify_new_message(
        &self,
        recipient_username: &str,
        message: &Message,
    ) -> Result<(), NotifyError> {
        self.push(
            recipient_username,
            WsOutboundEvent::MessageNew {
                message: message.clone(),
            },
        )
        .await
    }

    async fn notify_read_receipt(
        &self,
        original_sender_username: &str,
        message_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        self.push(
            original_sender_username,
            WsOutboundEvent::MessageRead {
                message_id,
                read_at,
            },
        )
        .await
    }
}
