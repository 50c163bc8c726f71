//! Bearer-token authentication for protected routes

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use plantvita_shared::{Account, AccountId};

use crate::{error::ApiError, state::AppState};

/// The resolved principal, available to handlers as `Extension<AuthUser>`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: AccountId,
    pub email: String,
}

impl From<Account> for AuthUser {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.id,
            email: account.email,
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Require a valid access token; runs before every protected handler
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .map(str::to_owned)
        .ok_or(ApiError::Unauthorized)?;

    let account = state.sessions.resolve(&token).await?;
    req.extensions_mut().insert(AuthUser::from(account));

    Ok(next.run(req).await)
}
