//! Router-level tests for the authentication endpoints
//!
//! These drive the full axum `Router` in-process against the in-memory
//! account store, so no database or network is needed.
//!
//! ## Running Tests
//! ```bash
//! cargo test -p plantvita-api --test auth_routes
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use plantvita_api::{auth::SessionService, routes::create_router, AppState, Config};
use plantvita_shared::InMemoryAccountStore;
use serde_json::{json, Value};
use tower::ServiceExt;

const CALLER_KEY: &str = "route-test-caller-key";

// ============================================================================
// Test Utilities
// ============================================================================

fn test_config() -> Config {
    let vars = HashMap::from([
        ("DATABASE_URL", "postgres://unused"),
        ("AUTH_KEY", "route-test-signing-secret"),
        ("API_SECRET_KEY", CALLER_KEY),
        ("AUTH_TOKEN_EXPIRE", "30"),
        ("HASH_MEMORY_KIB", "8"),
        ("HASH_ITERATIONS", "1"),
        ("HASH_PARALLELISM", "1"),
    ]);
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).expect("valid test config")
}

fn app() -> Router {
    let config = test_config();
    let store = Arc::new(InMemoryAccountStore::new());
    let sessions = SessionService::from_config(store, &config.auth).expect("session service");
    create_router(AppState::new(sessions))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn social_login(email: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/social-login")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder
        .body(Body::from(json!({ "email": email }).to_string()))
        .expect("request")
}

fn refresh_request(token: &str) -> Request<Body> {
    post_json("/refresh", json!({ "refresh_token": token }))
}

fn get_with_bearer(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

async fn register_and_login(app: &Router, email: &str, password: &str) -> Value {
    let register = post_json("/register", json!({ "email": email, "password": password }));
    let (status, _) = send(app, register).await;
    assert_eq!(status, StatusCode::CREATED);

    let login = post_form("/token", &format!("username={email}&password={password}"));
    let (status, pair) = send(app, login).await;
    assert_eq!(status, StatusCode::OK);
    pair
}

// ============================================================================
// Registration and password login
// ============================================================================

#[tokio::test]
async fn test_register_and_duplicate() {
    let app = app();

    let (status, body) = send(
        &app,
        post_json("/register", json!({ "email": "alice@example.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password_hash").is_none());

    let (status, body) = send(
        &app,
        post_json("/register", json!({ "email": "alice@example.com", "password": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "EMAIL_EXISTS");
}

#[tokio::test]
async fn test_password_login() {
    let app = app();
    let pair = register_and_login(&app, "alice@example.com", "pw123").await;

    assert_eq!(pair["token_type"], "bearer");
    assert!(pair["access_token"].is_string());
    assert!(pair["refresh_token"].is_string());
}

#[tokio::test]
async fn test_wrong_password_and_unknown_account_look_identical() {
    let app = app();
    register_and_login(&app, "alice@example.com", "pw123").await;

    let (wrong_status, wrong_body) =
        send(&app, post_form("/token", "username=alice@example.com&password=wrongpw")).await;
    let (unknown_status, unknown_body) =
        send(&app, post_form("/token", "username=nobody@example.com&password=pw123")).await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&wrong_body), "INVALID_CREDENTIALS");
    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn test_failed_login_is_not_faster_than_floor() {
    let app = app();

    let start = std::time::Instant::now();
    let (status, _) =
        send(&app, post_form("/token", "username=nobody@example.com&password=pw123")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(start.elapsed() >= std::time::Duration::from_millis(500));
}

// ============================================================================
// Social login
// ============================================================================

#[tokio::test]
async fn test_social_login_requires_trusted_caller() {
    let app = app();

    let (status, body) = send(&app, social_login("bob@example.com", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNTRUSTED_CALLER");

    let (status, body) = send(&app, social_login("bob@example.com", Some("guess"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNTRUSTED_CALLER");
}

#[tokio::test]
async fn test_social_account_cannot_password_login() {
    let app = app();

    let (status, pair) = send(&app, social_login("bob@example.com", Some(CALLER_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pair["token_type"], "bearer");

    let (status, body) =
        send(&app, post_form("/token", "username=bob@example.com&password=anything")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "INVALID_CREDENTIALS");

    // Registering the same email afterwards is a duplicate
    let (status, _) = send(
        &app,
        post_json("/register", json!({ "email": "bob@example.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test]
async fn test_refresh_flow() {
    let app = app();
    let pair = register_and_login(&app, "alice@example.com", "pw123").await;
    let refresh_token = pair["refresh_token"].as_str().expect("refresh token");
    let access_token = pair["access_token"].as_str().expect("access token");

    let (status, first) = send(&app, refresh_request(refresh_token)).await;
    assert_eq!(status, StatusCode::OK);

    // The original refresh token is still accepted
    let (status, second) = send(&app, refresh_request(refresh_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(first["refresh_token"], second["refresh_token"]);

    let (status, body) = send(&app, refresh_request(access_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "WRONG_TOKEN_KIND");

    let (status, body) = send(&app, refresh_request("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "INVALID_TOKEN");
    assert_eq!(body["error"]["message"], "Invalid or expired token");
}

// ============================================================================
// Protected routes
// ============================================================================

#[tokio::test]
async fn test_protected_route_resolves_principal() {
    let app = app();
    let pair = register_and_login(&app, "alice@example.com", "pw123").await;
    let access_token = pair["access_token"].as_str().expect("access token");
    let refresh_token = pair["refresh_token"].as_str().expect("refresh token");

    let (status, body) = send(&app, get_with_bearer("/users/me", Some(access_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");

    let (status, body) = send(&app, get_with_bearer("/users/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHORIZED");

    let (status, _) = send(&app, get_with_bearer("/users/me", Some(refresh_token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get_with_bearer("/users/me", Some("not.a.token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = app();

    let (status, body) = send(&app, get_with_bearer("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Plant-Vita backend is running");

    let (status, body) = send(&app, get_with_bearer("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "healthy");

    let (status, _) = send(&app, get_with_bearer("/health/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
}
