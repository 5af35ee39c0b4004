use crate::error::AppResult;
use crate::models::{ConversationKey, ConversationSummary};
use crate::repository::MessageRepository;
use crate::services::identity::IdentityLookup;
use crate::services::message_store::require_username;
use futures::future::try_join_all;
use std::cmp::Reverse;
use std::sync::Arc;

/// Builds the conversation list a client shows: one entry per peer with the
/// latest message and the messages the viewer has not read yet.
///
/// Nothing is cached, every call reads the current log. Only the latest
/// message and the unread rows of each conversation are loaded.
pub struct ConversationAggregator {
    repo: Arc<dyn MessageRepository>,
    identity: Arc<dyn IdentityLookup>,
}

impl ConversationAggregator {
    pub fn new(repo: Arc<dyn MessageRepository>, identity: Arc<dyn IdentityLookup>) -> Self {
        Self { repo, identity }
    }

    /// Summaries for `user`, most recently active conversation first.
    pub async fn summaries_for(&self, user: &str) -> AppResult<Vec<ConversationSummary>> {
        let user = require_username(user)?;
        let peers = self.repo.peers_of(&user).await?;

        let summaries = try_join_all(peers.iter().map(|peer| self.summary(&user, peer))).await?;

        let mut summaries: Vec<ConversationSummary> = summaries.into_iter().flatten().collect();
        summaries.sort_by_key(|s| Reverse(s.last_message.ordering_key()));
        Ok(summaries)
    }

    async fn summary(&self, user: &str, peer: &str) -> AppResult<Option<ConversationSummary>> {
        let Some(parts) = self
            .repo
            .summary_parts(&ConversationKey::new(user, peer), user)
            .await?
        else {
            return Ok(None);
        };

        let photo = match self.identity.profile_photo(peer).await {
            Ok(photo) => photo,
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "profile photo lookup failed");
                None
            }
        };

        Ok(Some(ConversationSummary::new(
            peer,
            photo,
            parts.last_message,
            parts.unread_messages,
        )))
    }
}
