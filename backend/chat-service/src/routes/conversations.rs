use crate::{error::AppError, middleware::guards::User, state::AppState};
use actix_web::{get, post, web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub transitioned: usize,
}

/// GET /api/v1/conversations
/// Conversation list of the caller, most recently active first
#[get("/conversations")]
pub async fn get_conversations(
    state: web::Data<AppState>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let summaries = state.chat.get_conversation_summaries(&user.username).await?;
    Ok(HttpResponse::Ok().json(summaries))
}

/// GET /api/v1/conversations/{peer}/messages
#[get("/conversations/{peer}/messages")]
pub async fn get_messages(
    state: web::Data<AppState>,
    peer: web::Path<String>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let messages = state
        .chat
        .get_conversation(&user.username, &peer.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// POST /api/v1/conversations/{peer}/read
#[post("/conversations/{peer}/read")]
pub async fn mark_conversation_read(
    state: web::Data<AppState>,
    peer: web::Path<String>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let transitioned = state
        .chat
        .mark_conversation_read(&user.username, &peer.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MarkReadResponse { transitioned }))
}

/// POST /api/v1/conversations/{peer}/messages/{id}/read
#[post("/conversations/{peer}/messages/{id}/read")]
pub async fn mark_message_read(
    state: web::Data<AppState>,
    path: web::Path<(String, Uuid)>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let (peer, message_id) = path.into_inner();
    let transitioned = state
        .chat
        .mark_message_read(&user.username, &peer, message_id)
        .await?;
    Ok(HttpResponse::Ok().json(MarkReadResponse { transitioned }))
}
