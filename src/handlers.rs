use crate::capture;
use crate::config::Config;
use crate::dashboard_models::DashboardMetrics;
use crate::errors::{AppError, ResultExt};
use crate::extract::{AppJson, AppQuery};
use crate::models::*;
use crate::notifier::LeadNotifier;
use crate::store::Store;
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// How long dashboard metrics are served from cache.
pub const METRICS_TTL: Duration = Duration::from_secs(30);

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Store used by the public capture routes.
    pub store: Arc<dyn Store>,
    /// Privileged store used by admin, dashboard and export routes.
    pub admin_store: Arc<dyn Store>,
    /// Outbound lead webhook (optional).
    pub notifier: Option<LeadNotifier>,
    /// Dashboard metrics cache (30s TTL), keyed by a constant.
    pub metrics_cache: Cache<&'static str, DashboardMetrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        admin_store: Arc<dyn Store>,
        notifier: Option<LeadNotifier>,
    ) -> Self {
        Self {
            config,
            store,
            admin_store,
            notifier,
            metrics_cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(METRICS_TTL)
                .build(),
        }
    }
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/newsletter
///
/// Subscribes an email, or refreshes the existing subscription for it.
///
/// # Returns
///
/// * `Result<Json<NewsletterResponse>, AppError>` - Message telling whether the subscriber is new, and its id.
pub async fn subscribe_newsletter(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<NewsletterPayload>,
) -> Result<Json<NewsletterResponse>, AppError> {
    tracing::info!("POST /newsletter");

    let outcome = capture::subscribe(state.store.as_ref(), payload).await?;

    Ok(Json(NewsletterResponse {
        message: outcome.message().to_string(),
        id: outcome.subscription().id,
    }))
}

/// POST /api/demo-request
///
/// # Returns
///
/// * `Result<Json<DemoRequestResponse>, AppError>` - The stored request echoed back under `data`.
pub async fn submit_demo_request(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<DemoRequestPayload>,
) -> Result<Json<DemoRequestResponse>, AppError> {
    tracing::info!("POST /demo-request");

    let row =
        capture::submit_demo_request(state.store.as_ref(), state.notifier.as_ref(), payload)
            .await?;

    Ok(Json(DemoRequestResponse {
        message: "Demo request submitted successfully".to_string(),
        data: row,
    }))
}

/// POST /api/quick-start
pub async fn submit_quick_start(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<QuickStartPayload>,
) -> Result<Json<QuickStartResponse>, AppError> {
    tracing::info!("POST /quick-start");

    let row =
        capture::submit_quick_start(state.store.as_ref(), state.notifier.as_ref(), payload)
            .await?;

    Ok(Json(QuickStartResponse {
        message: "Quick start assessment submitted successfully".to_string(),
        id: row.id,
    }))
}

/// POST /api/workshop-signup
pub async fn submit_workshop_signup(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<WorkshopSignupPayload>,
) -> Result<Json<WorkshopSignupResponse>, AppError> {
    tracing::info!("POST /workshop-signup");

    let row =
        capture::submit_workshop_signup(state.store.as_ref(), state.notifier.as_ref(), payload)
            .await?;

    Ok(Json(WorkshopSignupResponse {
        success: true,
        message: "Workshop signup submitted successfully".to_string(),
        id: row.id,
    }))
}

/// GET /api/workshop-signup
///
/// Lists signups newest first, optionally filtered by `status` and `type`.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `filter` - Query parameters `status` and `type`.
pub async fn list_workshop_signups(
    State(state): State<Arc<AppState>>,
    AppQuery(filter): AppQuery<WorkshopSignupFilter>,
) -> Result<Json<WorkshopSignupList>, AppError> {
    tracing::info!("GET /workshop-signup - filter: {:?}", filter);

    let signups = state
        .store
        .list_workshop_signups(&filter)
        .await
        .context("Failed to fetch workshop signups")?;

    Ok(Json(WorkshopSignupList { signups }))
}

/// POST /api/manufacturing-blueprint
pub async fn submit_blueprint_request(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<BlueprintRequestPayload>,
) -> Result<Json<BlueprintRequestResponse>, AppError> {
    tracing::info!("POST /manufacturing-blueprint");

    let row =
        capture::submit_blueprint_request(state.store.as_ref(), state.notifier.as_ref(), payload)
            .await?;

    Ok(Json(BlueprintRequestResponse {
        success: true,
        message: "Blueprint request submitted successfully".to_string(),
        request_id: row.id,
    }))
}
