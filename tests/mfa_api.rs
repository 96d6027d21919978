//! Router-level tests for TOTP setup and verification.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

use common::{app_with, extract_json, json_request};
use lead_capture_api::store::MemoryStore;
use lead_capture_api::totp;

fn now() -> u64 {
    Utc::now().timestamp() as u64
}

async fn post(store: &Arc<MemoryStore>, route: &str, body: Value) -> (StatusCode, Value) {
    let response = app_with(Arc::clone(store))
        .oneshot(json_request("POST", route, body))
        .await
        .unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

async fn setup(store: &Arc<MemoryStore>, user_id: &str) -> Value {
    let (status, body) = post(store, "/api/auth/setup-mfa", json!({"userId": user_id})).await;
    assert_eq!(status, StatusCode::OK);
    body
}

/// A six-digit code that matches no step inside the verification window.
fn wrong_code(secret: &str) -> String {
    let step = totp::time_step(now());
    let window: Vec<String> = (step.saturating_sub(2)..=step + 2)
        .map(|s| totp::code_for_step(secret, s).unwrap())
        .collect();
    (0..10u32)
        .map(|d| d.to_string().repeat(6))
        .find(|candidate| !window.contains(candidate))
        .unwrap()
}

#[tokio::test]
async fn test_setup_returns_secret_uri_and_backup_codes() {
    let store = Arc::new(MemoryStore::new());
    let body = setup(&store, "user-1").await;

    let secret = body["secret"].as_str().unwrap();
    assert!(totp::code_at(secret, now()).is_ok());

    let uri = body["qrCodeUrl"].as_str().unwrap();
    assert!(uri.starts_with("otpauth://totp/"));
    assert!(uri.contains(&format!("secret={}", secret)));
    assert!(uri.contains("issuer=Test%20Issuer") || uri.contains("issuer=Test+Issuer"));

    let codes = body["backupCodes"].as_array().unwrap();
    assert_eq!(codes.len(), 10);
    assert!(codes
        .iter()
        .all(|c| c.as_str().map(|c| c.len() == 9 && c.as_bytes()[4] == b'-') == Some(true)));
}

#[tokio::test]
async fn test_setup_requires_user_id() {
    let store = Arc::new(MemoryStore::new());

    let (status, body) = post(&store, "/api/auth/setup-mfa", json!({"userId": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User ID is required");
}

#[tokio::test]
async fn test_enable_then_replay_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let body = setup(&store, "user-2").await;
    let secret = body["secret"].as_str().unwrap().to_string();
    let code = totp::code_at(&secret, now()).unwrap();

    let (status, body) = post(
        &store,
        "/api/auth/verify-mfa",
        json!({"userId": "user-2", "token": code, "action": "enable"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["action"], "enable");

    // Same code, now for login: the step was already used
    let (status, body) = post(
        &store,
        "/api/auth/verify-mfa",
        json!({"userId": "user-2", "token": code, "action": "login"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid verification code");

    // Already enabled
    let (status, _) = post(&store, "/api/auth/setup-mfa", json!({"userId": "user-2"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_wrong_code_is_401() {
    let store = Arc::new(MemoryStore::new());
    let body = setup(&store, "user-3").await;
    let secret = body["secret"].as_str().unwrap().to_string();

    let (status, body) = post(
        &store,
        "/api/auth/verify-mfa",
        json!({"userId": "user-3", "token": wrong_code(&secret), "action": "enable"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_backup_code_is_single_use() {
    let store = Arc::new(MemoryStore::new());
    let body = setup(&store, "user-4").await;
    let secret = body["secret"].as_str().unwrap().to_string();
    let backup = body["backupCodes"][0].as_str().unwrap().to_string();

    let code = totp::code_at(&secret, now()).unwrap();
    let (status, _) = post(
        &store,
        "/api/auth/verify-mfa",
        json!({"userId": "user-4", "token": code, "action": "enable"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &store,
        "/api/auth/verify-mfa",
        json!({"userId": "user-4", "token": backup, "action": "login"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["backupCodesRemaining"], 9);

    let (status, body) = post(
        &store,
        "/api/auth/verify-mfa",
        json!({"userId": "user-4", "token": backup, "action": "login"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_login_before_enable_conflicts() {
    let store = Arc::new(MemoryStore::new());
    let body = setup(&store, "user-5").await;
    let secret = body["secret"].as_str().unwrap().to_string();
    let code = totp::code_at(&secret, now()).unwrap();

    let (status, body) = post(
        &store,
        "/api/auth/verify-mfa",
        json!({"userId": "user-5", "token": code, "action": "login"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_verify_request_validation() {
    let store = Arc::new(MemoryStore::new());

    let cases = [
        (json!({"token": "123456", "action": "login"}), StatusCode::BAD_REQUEST),
        (json!({"userId": "u", "action": "login"}), StatusCode::BAD_REQUEST),
        (json!({"userId": "u", "token": "123456"}), StatusCode::BAD_REQUEST),
        (
            json!({"userId": "u", "token": "123456", "action": "reset"}),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({"userId": "u", "token": "12ab", "action": "login"}),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({"userId": "nobody", "token": "123456", "action": "LOGIN"}),
            StatusCode::NOT_FOUND,
        ),
    ];

    for (body, expected) in cases {
        let (status, response) = post(&store, "/api/auth/verify-mfa", body.clone()).await;
        assert_eq!(status, expected, "{} -> {}", body, response);
        assert_eq!(response["success"], false, "{}", body);
        assert!(response["error"].is_string(), "{}", body);
    }
}

#[tokio::test]
async fn test_verify_unreadable_body_keeps_envelope() {
    let store = Arc::new(MemoryStore::new());

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/auth/verify-mfa")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"userId\": 42"))
        .unwrap();
    let response = app_with(Arc::clone(&store)).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}
