//! Authentication routes

use axum::{extract::State, http::HeaderMap, http::StatusCode, Form, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::TokenPair,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Header the trusted front-end uses to authenticate social-login relays
pub const API_KEY_HEADER: &str = "x-api-key";

/// Floor on password-login latency so timing does not reveal whether an
/// account exists
const MIN_LOGIN_RESPONSE_TIME: std::time::Duration = std::time::Duration::from_millis(500);

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// OAuth2 password-grant style form body
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SocialLoginRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AccountResponse>)> {
    let account = state.sessions.register(&req.email, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            id: account.id.0,
            email: account.email,
        }),
    ))
}

/// Password login
pub async fn token(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> ApiResult<Json<TokenPair>> {
    let start = std::time::Instant::now();

    let result = state
        .sessions
        .login_password(&form.username, &form.password)
        .await;

    let elapsed = start.elapsed();
    if elapsed < MIN_LOGIN_RESPONSE_TIME {
        tokio::time::sleep(MIN_LOGIN_RESPONSE_TIME - elapsed).await;
    }

    Ok(Json(result?))
}

/// Login relayed by the front-end after a third-party sign-in
pub async fn social_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SocialLoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    let caller_key = headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("social login: Missing API key header");
            ApiError::UntrustedCaller
        })?;

    let pair = state.sessions.login_social(&req.email, caller_key).await?;
    Ok(Json(pair))
}

/// Rotate a refresh token into a new pair
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    let pair = state.sessions.refresh(&req.refresh_token).await?;
    Ok(Json(pair))
}
