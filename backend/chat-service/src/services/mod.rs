pub mod chat_service;
pub mod conversation_aggregator;
pub mod identity;
pub mod message_store;
pub mod notifier;
pub mod read_receipts;

// Re-export key types for convenience
pub use chat_service::ChatService;
pub use conversation_aggregator::ConversationAggregator;
pub use identity::{IdentityLookup, InMemoryDirectory, PgProfileDirectory};
pub use message_store::{Appended, MessageStore};
pub use notifier::{DeliveryNotifier, NoopNotifier, NotificationDispatcher, NotifyError};
pub use read_receipts::ReadReceiptTracker;
