//! # Message Store
//!
//! Only writer of message content. Validates participants against the
//! identity collaborator, assigns id and `sent_at`, and suppresses duplicate
//! sends that reuse a client-supplied id with identical content.

use crate::clock::MonotonicClock;
use crate::error::{AppError, AppResult};
use crate::metrics::{DUPLICATE_SENDS_TOTAL, MESSAGES_SENT_TOTAL};
use crate::models::{normalize_username, ConversationKey, Message};
use crate::repository::{InsertOutcome, MessageRepository};
use crate::services::identity::IdentityLookup;
use std::sync::Arc;
use uuid::Uuid;

/// Result of [`MessageStore::append`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    pub message: Message,
    /// `false` when a retry was answered with the already stored message.
    pub is_new: bool,
}

pub struct MessageStore {
    repo: Arc<dyn MessageRepository>,
    identity: Arc<dyn IdentityLookup>,
    clock: Arc<MonotonicClock>,
    max_length: usize,
}

/// Normalize a username taken from a request path or body.
pub(crate) fn require_username(raw: &str) -> AppResult<String> {
    normalize_username(raw)
        .ok_or_else(|| AppError::BadRequest("username must not be empty".into()))
}

impl MessageStore {
    pub fn new(
        repo: Arc<dyn MessageRepository>,
        identity: Arc<dyn IdentityLookup>,
        clock: Arc<MonotonicClock>,
        max_length: usize,
    ) -> Self {
        Self {
            repo,
            identity,
            clock,
            max_length,
        }
    }

    /// Append a message from `sender` to `recipient`.
    ///
    /// When `client_id` names a message already stored with the same content
    /// the stored message is returned and nothing is written.
    pub async fn append(
        &self,
        sender: &str,
        recipient: &str,
        text: &str,
        client_id: Option<Uuid>,
    ) -> AppResult<Appended> {
        let sender = normalize_username(sender)
            .ok_or_else(|| AppError::InvalidSender("sender username is empty".into()))?;
        let recipient = normalize_username(recipient)
            .ok_or_else(|| AppError::InvalidRecipient("recipient username is empty".into()))?;
        if sender == recipient {
            return Err(AppError::InvalidRecipient(
                "cannot send a message to yourself".into(),
            ));
        }

        if text.trim().is_empty() {
            return Err(AppError::EmptyMessage);
        }
        // Postgres TEXT cannot store NUL
        if text.contains('\0') {
            return Err(AppError::BadRequest(
                "message text must not contain NUL characters".into(),
            ));
        }
        if text.chars().count() > self.max_length {
            return Err(AppError::BadRequest(format!(
                "message exceeds {} characters",
                self.max_length
            )));
        }

        if !self.identity.exists(&sender).await? {
            return Err(AppError::InvalidSender(sender));
        }
        if !self.identity.exists(&recipient).await? {
            return Err(AppError::InvalidRecipient(recipient));
        }

        let candidate = Message::new(
            client_id.unwrap_or_else(Uuid::new_v4),
            sender,
            recipient,
            text.to_string(),
            self.clock.now(),
        );

        match self.repo.insert(candidate.clone()).await? {
            InsertOutcome::Inserted(message) => {
                MESSAGES_SENT_TOTAL.inc();
                tracing::info!(
                    message_id = %message.id,
                    sender = %message.sender_username,
                    recipient = %message.recipient_username,
                    "message appended"
                );
                Ok(Appended {
                    message,
                    is_new: true,
                })
            }
            InsertOutcome::Existing(stored) if stored.same_content(&candidate) => {
                DUPLICATE_SENDS_TOTAL.inc();
                tracing::debug!(message_id = %stored.id, "duplicate send suppressed");
                Ok(Appended {
                    message: stored,
                    is_new: false,
                })
            }
            InsertOutcome::Existing(stored) => {
                tracing::warn!(
                    message_id = %stored.id,
                    sender = %candidate.sender_username,
                    "message id reused with different content"
                );
                Err(AppError::IdConflict(stored.id))
            }
        }
    }

    /// Every message between `user_a` and `user_b` ordered by `(sent_at, id)`.
    pub async fn list_conversation(&self, user_a: &str, user_b: &str) -> AppResult<Vec<Message>> {
        let user_a = require_username(user_a)?;
        let user_b = require_username(user_b)?;
        self.repo
            .conversation(&ConversationKey::new(&user_a, &user_b))
            .await
    }

    /// Distinct peers `user` has exchanged at least one message with.
    pub async fn list_conversations_for(&self, user: &str) -> AppResult<Vec<String>> {
        let user = require_username(user)?;
        self.repo.peers_of(&user).await
    }
}
