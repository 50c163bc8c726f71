//! API error types and handling
//!
//! This is the response boundary: token failures collapse into one
//! uninformative kind here, whatever the codec reported.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::AuthError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email already registered")]
    EmailAlreadyExists,
    #[error("Untrusted caller")]
    UntrustedCaller,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Wrong token type")]
    WrongTokenKind,
    #[error("Account no longer exists")]
    AccountGone,
    #[error("Authentication required")]
    Unauthorized,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Internal errors
    #[error("Internal server error")]
    Internal,
    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Authentication
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", self.to_string()),
            ApiError::EmailAlreadyExists => (StatusCode::CONFLICT, "EMAIL_EXISTS", self.to_string()),
            ApiError::UntrustedCaller => (StatusCode::UNAUTHORIZED, "UNTRUSTED_CALLER", self.to_string()),
            ApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", self.to_string()),
            ApiError::WrongTokenKind => (StatusCode::UNAUTHORIZED, "WRONG_TOKEN_KIND", self.to_string()),
            ApiError::AccountGone => (StatusCode::UNAUTHORIZED, "ACCOUNT_GONE", self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),

            // Validation
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),

            // Internal
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", self.to_string()),
            ApiError::ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", self.to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::DuplicateEmail => ApiError::EmailAlreadyExists,
            AuthError::UntrustedCaller => ApiError::UntrustedCaller,
            AuthError::InvalidToken(_) => ApiError::InvalidToken,
            AuthError::WrongTokenKind => ApiError::WrongTokenKind,
            AuthError::AccountGone => ApiError::AccountGone,
            AuthError::Unauthenticated => ApiError::Unauthorized,
            AuthError::StoreUnavailable(_) => ApiError::ServiceUnavailable,
            AuthError::Validation(msg) => ApiError::Validation(msg.to_string()),
            AuthError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal auth error");
                ApiError::Internal
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
