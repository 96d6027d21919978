//! Shared helpers for the router-level integration tests.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use serde_json::Value;
use std::sync::Arc;

use lead_capture_api::build_router;
use lead_capture_api::config::Config;
use lead_capture_api::handlers::AppState;
use lead_capture_api::notifier::LeadNotifier;
use lead_capture_api::store::{MemoryStore, Store};

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Memory-backed configuration, optionally with an admin token.
pub fn test_config(admin_token: Option<&str>) -> Config {
    let admin_token = admin_token.map(str::to_string);
    Config::from_lookup(move |key| match key {
        "STORAGE_BACKEND" => Some("memory".to_string()),
        "MFA_ISSUER" => Some("Test Issuer".to_string()),
        "ADMIN_API_TOKEN" => admin_token.clone(),
        _ => None,
    })
    .expect("test config should be valid")
}

/// App over `store` with no admin token and no webhook.
pub fn app_with(store: Arc<MemoryStore>) -> Router {
    app_with_options(store, None, None)
}

pub fn app_with_options(
    store: Arc<MemoryStore>,
    admin_token: Option<&str>,
    notifier: Option<LeadNotifier>,
) -> Router {
    let store: Arc<dyn Store> = store;
    let state = AppState::new(
        test_config(admin_token),
        Arc::clone(&store),
        store,
        notifier,
    );
    build_router(Arc::new(state))
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap(),
    );
    request
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

pub async fn extract_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}
