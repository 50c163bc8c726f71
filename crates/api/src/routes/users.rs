//! Account routes for the authenticated principal

use axum::{Extension, Json};

use super::auth::AccountResponse;
use crate::auth::AuthUser;

/// Current account, as resolved from the bearer token
pub async fn me(Extension(auth_user): Extension<AuthUser>) -> Json<AccountResponse> {
    Json(AccountResponse {
        id: auth_user.account_id.0,
        email: auth_user.email,
    })
}
