use crate::clock::MonotonicClock;
use crate::error::AppResult;
use crate::metrics::READ_RECEIPTS_TOTAL;
use crate::models::{ConversationKey, Message};
use crate::repository::{MessageRepository, SingleReadOutcome};
use crate::services::message_store::require_username;
use std::sync::Arc;
use uuid::Uuid;

/// Applies the one-way `Unread -> Read` transition.
///
/// Both operations are idempotent: messages already read are left alone
/// and are not reported as transitioned.
pub struct ReadReceiptTracker {
    repo: Arc<dyn MessageRepository>,
    clock: Arc<MonotonicClock>,
}

impl ReadReceiptTracker {
    pub fn new(repo: Arc<dyn MessageRepository>, clock: Arc<MonotonicClock>) -> Self {
        Self { repo, clock }
    }

    /// Mark every unread message from `peer` to `viewer` as read. Returns the
    /// messages that changed state, in conversation order.
    pub async fn mark_read(&self, viewer: &str, peer: &str) -> AppResult<Vec<Message>> {
        let viewer = require_username(viewer)?;
        let peer = require_username(peer)?;
        let key = ConversationKey::new(&viewer, &peer);

        let transitioned = self
            .repo
            .mark_conversation_read(&key, &viewer, self.clock.now())
            .await?;

        if !transitioned.is_empty() {
            READ_RECEIPTS_TOTAL.inc_by(transitioned.len() as u64);
            tracing::info!(
                viewer = %viewer,
                peer = %peer,
                transitioned = transitioned.len(),
                "conversation marked read"
            );
        }
        Ok(transitioned)
    }

    /// Mark a single message as read. Returns the message when it changed
    /// state, `None` when it was already read.
    pub async fn mark_message_read(
        &self,
        viewer: &str,
        peer: &str,
        message_id: Uuid,
    ) -> AppResult<Option<Message>> {
        let viewer = require_username(viewer)?;
        let peer = require_username(peer)?;
        let key = ConversationKey::new(&viewer, &peer);

        match self
            .repo
            .mark_message_read(&key, &viewer, message_id, self.clock.now())
            .await?
        {
            SingleReadOutcome::Transitioned(message) => {
                READ_RECEIPTS_TOTAL.inc();
                tracing::info!(viewer = %viewer, message_id = %message_id, "message marked read");
                Ok(Some(message))
            }
            SingleReadOutcome::AlreadyRead(_) => Ok(None),
        }
    }
}
