use crate::clock::MonotonicClock;
use crate::error::AppResult;
use crate::models::{ConversationSummary, Message};
use crate::repository::MessageRepository;
use crate::services::conversation_aggregator::ConversationAggregator;
use crate::services::identity::IdentityLookup;
use crate::services::message_store::MessageStore;
use crate::services::notifier::{DeliveryNotifier, NotificationDispatcher};
use crate::services::read_receipts::ReadReceiptTracker;
use std::sync::Arc;
use uuid::Uuid;

/// Entry point for the transport layer.
///
/// Persistence always completes before any push is dispatched, and push
/// failures never surface here.
pub struct ChatService {
    store: MessageStore,
    receipts: ReadReceiptTracker,
    aggregator: ConversationAggregator,
    dispatcher: NotificationDispatcher,
}

impl ChatService {
    pub fn new(
        repo: Arc<dyn MessageRepository>,
        identity: Arc<dyn IdentityLookup>,
        notifier: Arc<dyn DeliveryNotifier>,
        message_max_length: usize,
    ) -> Self {
        let clock = Arc::new(MonotonicClock::new());
        Self {
            store: MessageStore::new(
                Arc::clone(&repo),
                Arc::clone(&identity),
                Arc::clone(&clock),
                message_max_length,
            ),
            receipts: ReadReceiptTracker::new(Arc::clone(&repo), clock),
            aggregator: ConversationAggregator::new(repo, identity),
            dispatcher: NotificationDispatcher::new(notifier),
        }
    }

    pub async fn send_message(
        &self,
        sender: &str,
        recipient: &str,
        text: &str,
        client_id: Option<Uuid>,
    ) -> AppResult<Message> {
        let appended = self.store.append(sender, recipient, text, client_id).await?;
        // A retry was already pushed the first time round
        if appended.is_new {
            self.dispatcher.new_message(appended.message.clone());
        }
        Ok(appended.message)
    }

    pub async fn get_conversation(&self, user_a: &str, user_b: &str) -> AppResult<Vec<Message>> {
        self.store.list_conversation(user_a, user_b).await
    }

    pub async fn get_conversation_summaries(
        &self,
        user: &str,
    ) -> AppResult<Vec<ConversationSummary>> {
        self.aggregator.summaries_for(user).await
    }

    /// Returns the number of messages that went from unread to read.
    pub async fn mark_conversation_read(&self, user: &str, peer: &str) -> AppResult<usize> {
        let transitioned = self.receipts.mark_read(user, peer).await?;
        let count = transitioned.len();
        if count > 0 {
            self.dispatcher.read_receipts(transitioned);
        }
        Ok(count)
    }

    /// Returns 1 when the message went from unread to read, 0 when it was
    /// already read.
    pub async fn mark_message_read(
        &self,
        user: &str,
        peer: &str,
        message_id: Uuid,
    ) -> AppResult<usize> {
        match self.receipts.mark_message_read(user, peer, message_id).await? {
            Some(message) => {
                self.dispatcher.read_receipts(vec![message]);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
