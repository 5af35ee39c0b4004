use serde::{Deserialize, Serialize};

use super::message::Message;

/// Per-viewer, per-peer projection of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub peer_username: String,
    pub peer_profile_photo: Option<String>,
    pub last_message: Message,
    pub unread_messages: Vec<Message>,
    pub unread_count: usize,
}

impl ConversationSummary {
    /// `unread_messages` are the messages addressed to the viewer that the
    /// viewer has not read, in conversation order.
    pub fn new(
        peer: &str,
        peer_profile_photo: Option<String>,
        last_message: Message,
        unread_messages: Vec<Message>,
    ) -> Self {
        Self {
            peer_username: peer.to_string(),
            peer_profile_photo,
            last_message,
            unread_count: unread_messages.len(),
            unread_messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn message(sender: &str, recipient: &str, text: &str) -> Message {
        Message::new(
            Uuid::new_v4(),
            sender.to_string(),
            recipient.to_string(),
            text.to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_unread_count_follows_unread_list() {
        let one = message("alice", "bob", "one");
        let three = message("alice", "bob", "three");

        let summary =
            ConversationSummary::new("alice", None, three.clone(), vec![one, three.clone()]);
        assert_eq!(summary.peer_username, "alice");
        assert_eq!(summary.last_message.id, three.id);
        assert_eq!(summary.unread_count, 2);
    }

    #[test]
    fn test_wire_shape() {
        let last = message("bob", "alice", "hi");
        let summary = ConversationSummary::new("bob", Some("bob.png".into()), last, Vec::new());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["peerUsername"], "bob");
        assert_eq!(json["peerProfilePhoto"], "bob.png");
        assert_eq!(json["unreadCount"], 0);
        assert!(json["unreadMessages"].as_array().unwrap().is_empty());
        assert_eq!(json["lastMessage"]["text"], "hi");
    }
}
