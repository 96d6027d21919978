//! Lead Capture API Library
//!
//! Backend for a consulting firm's marketing site: newsletter and lead forms,
//! a store-backed admin dashboard with CSV exports, and TOTP second factor.
//!
//! # Modules
//!
//! - `admin_handler`: Lead status, tenant and export endpoints.
//! - `auth`: Admin bearer-token guard.
//! - `capture`: Form validation and the newsletter upsert.
//! - `config`: Configuration management.
//! - `dashboard_handler`: Metrics, task and notification endpoints.
//! - `dashboard_models`: Dashboard data models.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `export`: Export jobs and CSV rendering.
//! - `extract`: Extractors that reject with the JSON error envelope.
//! - `handlers`: Application state and capture endpoints.
//! - `mfa`, `mfa_handler`, `totp`: Multi-factor enrollment and verification.
//! - `models`: Lead data models.
//! - `notifier`: Outbound lead webhook.
//! - `store`: Persistence client (Postgres and in-memory).

pub mod admin_handler;
pub mod auth;
pub mod capture;
pub mod config;
pub mod dashboard_handler;
pub mod dashboard_models;
pub mod db;
pub mod errors;
pub mod export;
pub mod extract;
pub mod handlers;
pub mod mfa;
pub mod mfa_handler;
pub mod models;
pub mod notifier;
pub mod store;
pub mod totp;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::AppState;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Every `/api` route. Admin, dashboard and export routes sit behind the
/// bearer guard.
pub fn api_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let admin_routes = Router::new()
        .route(
            "/api/admin/leads/:kind/:id/status",
            post(admin_handler::update_lead_status),
        )
        .route(
            "/api/admin/workshop-signups/:id/approve",
            post(admin_handler::approve_workshop_signup),
        )
        .route(
            "/api/admin/tenants",
            get(admin_handler::list_tenants).post(admin_handler::create_tenant),
        )
        .route("/api/admin/tenants/:id", put(admin_handler::update_tenant))
        .route("/api/admin/exports", post(admin_handler::create_export))
        .route("/api/admin/exports/:id", get(admin_handler::get_export))
        .route(
            "/api/admin/exports/:id/download",
            get(admin_handler::download_export),
        )
        .route("/api/dashboard/metrics", get(dashboard_handler::get_metrics))
        .route(
            "/api/dashboard/tasks",
            get(dashboard_handler::list_tasks).post(dashboard_handler::create_task),
        )
        .route(
            "/api/dashboard/tasks/:id",
            put(dashboard_handler::update_task).delete(dashboard_handler::delete_task),
        )
        .route(
            "/api/dashboard/notifications",
            get(dashboard_handler::list_notifications),
        )
        .route(
            "/api/dashboard/notifications/:id/read",
            post(dashboard_handler::mark_notification_read),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(state),
            auth::admin_auth,
        ));

    Router::new()
        .route("/api/newsletter", post(handlers::subscribe_newsletter))
        .route("/api/demo-request", post(handlers::submit_demo_request))
        .route("/api/quick-start", post(handlers::submit_quick_start))
        .route(
            "/api/workshop-signup",
            post(handlers::submit_workshop_signup).get(handlers::list_workshop_signups),
        )
        .route(
            "/api/manufacturing-blueprint",
            post(handlers::submit_blueprint_request),
        )
        .route("/api/auth/setup-mfa", post(mfa_handler::setup_mfa))
        .route("/api/auth/verify-mfa", post(mfa_handler::verify_mfa))
        .merge(admin_routes)
}

/// Adds `/health` and the shared layers, and binds the state.
pub fn finish_router(api: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(CorsLayer::permissive()),
        )
}

/// The full application without per-IP rate limiting.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = api_routes(&state);
    finish_router(api, state)
}
