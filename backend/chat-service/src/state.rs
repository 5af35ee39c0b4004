use crate::{
    config::Config,
    repository::MessageRepository,
    services::{ChatService, IdentityLookup},
    websocket::ConnectionRegistry,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub registry: ConnectionRegistry,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the chat service with the connection registry as its notifier.
    pub fn new(
        config: Arc<Config>,
        repo: Arc<dyn MessageRepository>,
        identity: Arc<dyn IdentityLookup>,
    ) -> Self {
        let registry = ConnectionRegistry::new();
        let chat = Arc::new(ChatService::new(
            repo,
            identity,
            Arc::new(registry.clone()),
            config.message_max_length,
        ));

        Self {
            chat,
            registry,
            config,
        }
    }
}
