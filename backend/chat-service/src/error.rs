use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid sender: {0}")]
    InvalidSender(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("message text must not be empty")]
    EmptyMessage,

    #[error("message id {0} already used with different content")]
    IdConflict(Uuid),

    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal server error")]
    Internal,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    retryable: bool,
}

impl AppError {
    /// Transient failures the caller may retry. Validation and conflict
    /// errors are permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::ServiceUnavailable(_) | AppError::Internal
        )
    }

    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_)
            | AppError::InvalidSender(_)
            | AppError::InvalidRecipient(_)
            | AppError::EmptyMessage => 400,
            AppError::Unauthorized => 401,
            AppError::NotFound => 404,
            AppError::IdConflict(_) => 409,
            AppError::ServiceUnavailable(_) => 503,
            AppError::Database(_)
            | AppError::Internal
            | AppError::Config(_)
            | AppError::StartServer(_) => 500,
        }
    }

    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::StartServer(_) => "start_server",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidSender(_) => "invalid_sender",
            AppError::InvalidRecipient(_) => "invalid_recipient",
            AppError::EmptyMessage => "empty_message",
            AppError::IdConflict(_) => "id_conflict",
            AppError::NotFound => "not_found",
            AppError::Database(_) => "database",
            AppError::ServiceUnavailable(_) => "service_unavailable",
            AppError::Internal => "internal",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(AppError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        // Storage details stay in the logs.
        let message = match self {
            AppError::Database(_) => "storage temporarily unavailable".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(ResponseError::status_code(self)).json(ErrorBody {
            error: self.code(),
            message,
            retryable: self.is_retryable(),
        })
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(e: tokio_postgres::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        AppError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::EmptyMessage.status_code(), 400);
        assert_eq!(AppError::InvalidRecipient("x".into()).status_code(), 400);
        assert_eq!(AppError::IdConflict(Uuid::nil()).status_code(), 409);
        assert_eq!(AppError::NotFound.status_code(), 404);
        assert_eq!(AppError::Database("down".into()).status_code(), 500);
    }

    #[test]
    fn test_retryable() {
        assert!(AppError::Database("timeout".into()).is_retryable());
        assert!(AppError::ServiceUnavailable("identity".into()).is_retryable());
        assert!(!AppError::EmptyMessage.is_retryable());
        assert!(!AppError::IdConflict(Uuid::nil()).is_retryable());
    }
}
