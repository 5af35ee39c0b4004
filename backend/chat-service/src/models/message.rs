use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::conversation::ConversationKey;

/// Read state of a single message.
///
/// `Unread -> Read` is the only transition. Once a message is read its
/// timestamp never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadState {
    #[default]
    Unread,
    Read(DateTime<Utc>),
}

impl ReadState {
    pub fn read_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ReadState::Unread => None,
            ReadState::Read(at) => Some(*at),
        }
    }

    pub fn is_unread(&self) -> bool {
        matches!(self, ReadState::Unread)
    }
}

impl From<Option<DateTime<Utc>>> for ReadState {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map(ReadState::Read).unwrap_or_default()
    }
}

impl Serialize for ReadState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.read_at().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ReadState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<DateTime<Utc>>::deserialize(deserializer).map(ReadState::from)
    }
}

/// A single direct message, as stored and as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_username: String,
    pub recipient_username: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    #[serde(rename = "readAt", default, skip_serializing_if = "ReadState::is_unread")]
    pub read_state: ReadState,
}

impl Message {
    pub fn new(
        id: Uuid,
        sender_username: String,
        recipient_username: String,
        text: String,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sender_username,
            recipient_username,
            text,
            sent_at,
            read_state: ReadState::Unread,
        }
    }

    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::new(&self.sender_username, &self.recipient_username)
    }

    /// Canonical ordering within a conversation.
    pub fn ordering_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.sent_at, self.id)
    }

    pub fn read_at(&self) -> Option<DateTime<Utc>> {
        self.read_state.read_at()
    }

    pub fn is_unread_for(&self, username: &str) -> bool {
        self.recipient_username == username && self.read_state.is_unread()
    }

    /// Same sender, recipient and text. Used to tell a client retry apart
    /// from a reused id.
    pub fn same_content(&self, other: &Message) -> bool {
        self.sender_username == other.sender_username
            && self.recipient_username == other.recipient_username
            && self.text == other.text
    }

    /// Apply the read transition. Returns `false` when the message was
    /// already read. The stored timestamp is never earlier than `sent_at`.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if !self.read_state.is_unread() {
            return false;
        }
        self.read_state = ReadState::Read(at.max(self.sent_at));
        true
    }
}
