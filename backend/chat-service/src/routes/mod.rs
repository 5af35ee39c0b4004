pub mod conversations;
pub mod messages;
pub mod wsroute;

use actix_web::web;

/// REST, WebSocket and ops endpoints.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(messages::send_message)
            .service(conversations::get_conversations)
            .service(conversations::get_messages)
            .service(conversations::mark_conversation_read)
            .service(conversations::mark_message_read),
    )
    .service(wsroute::ws_handler)
    .service(crate::metrics::metrics_handler)
    .route("/health", web::get().to(|| async { "OK" }));
}
