use crate::{error::AppError, middleware::guards::User, state::AppState};
use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient_username: String,
    pub text: String,
    /// Client-generated id; resending with the same id and content is a no-op.
    #[serde(default)]
    pub id: Option<Uuid>,
}

/// POST /api/v1/messages
#[post("/messages")]
pub async fn send_message(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let message = state
        .chat
        .send_message(&user.username, &body.recipient_username, &body.text, body.id)
        .await?;

    Ok(HttpResponse::Created().json(message))
}
