use crate::error::{AppError, AppResult};
use crate::models::{ConversationKey, Message};
use crate::repository::{InsertOutcome, MessageRepository, SingleReadOutcome, SummaryParts};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

type ConversationLog = Arc<RwLock<Vec<Message>>>;

/// Message log held in process memory.
///
/// Each conversation has its own lock, so writers in different
/// conversations never contend. Lock order is always
/// `ids` shard -> `conversations` shard -> conversation log -> `peers` shard.
#[derive(Default)]
pub struct InMemoryMessageRepository {
    conversations: DashMap<ConversationKey, ConversationLog>,
    ids: DashMap<Uuid, ConversationKey>,
    peers: DashMap<String, BTreeSet<String>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, key: &ConversationKey) -> Option<ConversationLog> {
        self.conversations.get(key).map(|log| Arc::clone(log.value()))
    }

    fn find(&self, key: &ConversationKey, id: Uuid) -> Option<Message> {
        let log = self.log(key)?;
        let messages = log.read();
        messages.iter().find(|m| m.id == id).cloned()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: Message) -> AppResult<InsertOutcome> {
        match self.ids.entry(message.id) {
            Entry::Occupied(entry) => {
                let stored = self.find(entry.get(), message.id).ok_or_else(|| {
                    tracing::error!(message_id = %message.id, "id indexed without a stored message");
                    AppError::Internal
                })?;
                Ok(InsertOutcome::Existing(stored))
            }
            Entry::Vacant(entry) => {
                let key = message.conversation_key();
                let log = Arc::clone(self.conversations.entry(key.clone()).or_default().value());
                {
                    let mut messages = log.write();
                    let pos = messages
                        .partition_point(|m| m.ordering_key() <= message.ordering_key());
                    messages.insert(pos, message.clone());
                }
                self.peers
                    .entry(message.sender_username.clone())
                    .or_default()
                    .insert(message.recipient_username.clone());
                self.peers
                    .entry(message.recipient_username.clone())
                    .or_default()
                    .insert(message.sender_username.clone());
                // Published last: a reader of `ids` always finds the message.
                entry.insert(key);
                Ok(InsertOutcome::Inserted(message))
            }
        }
    }

    async fn conversation(&self, key: &ConversationKey) -> AppResult<Vec<Message>> {
        Ok(self
            .log(key)
            .map(|log| log.read().clone())
            .unwrap_or_default())
    }

    async fn summary_parts(
        &self,
        key: &ConversationKey,
        viewer: &str,
    ) -> AppResult<Option<SummaryParts>> {
        let Some(log) = self.log(key) else {
            return Ok(None);
        };

        let messages = log.read();
        Ok(messages.last().map(|last| SummaryParts {
            last_message: last.clone(),
            unread_messages: messages
                .iter()
                .filter(|m| m.is_unread_for(viewer))
                .cloned()
                .collect(),
        }))
    }

    async fn peers_of(&self, username: &str) -> AppResult<Vec<String>> {
        Ok(self
            .peers
            .get(username)
            .map(|peers| peers.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn mark_conversation_read(
        &self,
        key: &ConversationKey,
        reader: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<Message>> {
        let Some(log) = self.log(key) else {
            return Ok(Vec::new());
        };

        let mut messages = log.write();
        let transitioned = messages
            .iter_mut()
            .filter(|m| m.recipient_username == reader)
            .filter_map(|m| m.mark_read(at).then(|| m.clone()))
            .collect();
        Ok(transitioned)
    }

    async fn mark_message_read(
        &self,
        key: &ConversationKey,
        reader: &str,
        message_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<SingleReadOutcome> {
        let log = self.log(key).ok_or(AppError::NotFound)?;
        let mut messages = log.write();
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id && m.recipient_username == reader)
            .ok_or(AppError::NotFound)?;

        if message.mark_read(at) {
            Ok(SingleReadOutcome::Transitioned(message.clone()))
        } else {
            Ok(SingleReadOutcome::AlreadyRead(message.clone()))
        }
    }
}
