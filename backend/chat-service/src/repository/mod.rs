//! Persistence substrate for the message log.
//!
//! The store and the read-receipt tracker only talk to [`MessageRepository`];
//! Postgres backs production, the in-memory implementation backs tests and
//! database-less local runs.

pub mod memory;
pub mod postgres;

use crate::error::AppResult;
use crate::models::{ConversationKey, Message};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::InMemoryMessageRepository;
pub use postgres::PgMessageRepository;

/// Result of an insert keyed by message id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted(Message),
    /// A row with this id already existed; it is returned unchanged.
    Existing(Message),
}

/// What a conversation summary needs from the log: the latest message and
/// the messages still unread by the viewer, in conversation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryParts {
    pub last_message: Message,
    pub unread_messages: Vec<Message>,
}

/// Result of a single-message read transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleReadOutcome {
    Transitioned(Message),
    AlreadyRead(Message),
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert unless the id is taken. Concurrent inserts with one id leave
    /// exactly one row.
    async fn insert(&self, message: Message) -> AppResult<InsertOutcome>;

    /// All messages of a conversation ordered by `(sent_at, id)` ascending.
    async fn conversation(&self, key: &ConversationKey) -> AppResult<Vec<Message>>;

    /// Latest message plus the unread messages addressed to `viewer`.
    /// `None` when the conversation is empty.
    async fn summary_parts(
        &self,
        key: &ConversationKey,
        viewer: &str,
    ) -> AppResult<Option<SummaryParts>>;

    /// Distinct usernames `username` has exchanged messages with, sorted.
    async fn peers_of(&self, username: &str) -> AppResult<Vec<String>>;

    /// Set `read_at` on every unread message addressed to `reader` in the
    /// conversation. Only rows still unread are touched; the transitioned
    /// messages are returned in conversation order.
    async fn mark_conversation_read(
        &self,
        key: &ConversationKey,
        reader: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<Message>>;

    /// Single-message variant. Fails with `NotFound` when the message is not
    /// part of `key` or not addressed to `reader`.
    async fn mark_message_read(
        &self,
        key: &ConversationKey,
        reader: &str,
        message_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<SingleReadOutcome>;
}
