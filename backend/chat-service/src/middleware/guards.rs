//! Request guards.
//!
//! Authentication happens upstream; the gateway forwards the verified
//! username in the `X-Username` header.

use crate::error::AppError;
use crate::models::normalize_username;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};

pub const USERNAME_HEADER: &str = "X-Username";

/// Represents the authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
}

impl FromRequest for User {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let username = req
            .headers()
            .get(USERNAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(normalize_username);

        ready(
            username
                .map(|username| User { username })
                .ok_or(AppError::Unauthorized),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_user_from_header() {
        let req = TestRequest::default()
            .insert_header((USERNAME_HEADER, " Alice "))
            .to_http_request();
        let user = User::extract(&req).await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[actix_web::test]
    async fn test_missing_header_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        let err = User::extract(&req).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}
