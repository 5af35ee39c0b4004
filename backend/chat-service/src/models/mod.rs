pub mod conversation;
pub mod message;
pub mod summary;

pub use conversation::{normalize_username, ConversationKey};
pub use message::{Message, ReadState};
pub use summary::ConversationSummary;
