use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::dashboard_models::{NewTenant, Tenant, TenantUpdate};
use crate::errors::{AppError, ResultExt};
use crate::extract::{AppJson, AppPath};
use crate::export::{spawn_export_job, ExportAccepted, ExportJob, ExportRequest, ExportStatus};
use crate::handlers::AppState;
use crate::models::{LeadKind, LeadStatus};
use crate::store::Store;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub success: bool,
    pub id: Uuid,
    pub kind: LeadKind,
    pub status: LeadStatus,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub success: bool,
    pub id: Uuid,
    pub status: LeadStatus,
}

#[derive(Debug, Serialize)]
pub struct TenantList {
    pub tenants: Vec<Tenant>,
}

fn parse_kind(kind: &str) -> Result<LeadKind, AppError> {
    kind.parse()
        .map_err(|_| AppError::BadRequest(format!("Unknown lead kind '{}'", kind)))
}

/// Moves a lead from its current status to `to`.
///
/// The store applies the change as a compare-and-set, so a concurrent change
/// between the read and the write surfaces as a conflict.
pub async fn transition_lead(
    store: &dyn Store,
    kind: LeadKind,
    id: Uuid,
    to: LeadStatus,
) -> Result<LeadStatus, AppError> {
    let current = store
        .lead_status(kind, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No {} with id {}", kind.label(), id)))?;

    if !current.can_transition_to(to) {
        return Err(AppError::Conflict(format!(
            "Cannot move {} from '{}' to '{}'",
            kind.label(),
            current,
            to
        )));
    }

    if !store.transition_lead_status(kind, id, current, to).await? {
        return Err(AppError::Conflict(format!(
            "The {} was modified concurrently",
            kind.label()
        )));
    }

    tracing::info!("{} {} moved from {} to {}", kind, id, current, to);
    Ok(to)
}

/// POST /api/admin/leads/:kind/:id/status
///
/// # Arguments
///
/// * `kind` - Lead kind slug, e.g. `demo-requests`.
/// * `id` - Lead id.
/// * `payload` - `{status}` naming the target status.
pub async fn update_lead_status(
    State(state): State<Arc<AppState>>,
    AppPath((kind, id)): AppPath<(String, Uuid)>,
    AppJson(payload): AppJson<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, AppError> {
    tracing::info!("POST /admin/leads/{}/{}/status", kind, id);

    let kind = parse_kind(&kind)?;
    let status = payload
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Status is required".to_string()))?;
    let to: LeadStatus = status
        .parse()
        .map_err(|e| AppError::BadRequest(format!("{}", e)))?;

    let status = transition_lead(state.admin_store.as_ref(), kind, id, to)
        .await
        .context("Failed to update lead status")?;

    Ok(Json(StatusUpdateResponse {
        success: true,
        id,
        kind,
        status,
    }))
}

/// POST /api/admin/workshop-signups/:id/approve
pub async fn approve_workshop_signup(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApproveResponse>, AppError> {
    tracing::info!("POST /admin/workshop-signups/{}/approve", id);

    let status = transition_lead(
        state.admin_store.as_ref(),
        LeadKind::WorkshopSignup,
        id,
        LeadStatus::Approved,
    )
    .await
    .context("Failed to approve workshop signup")?;

    Ok(Json(ApproveResponse {
        success: true,
        id,
        status,
    }))
}

/// GET /api/admin/tenants
pub async fn list_tenants(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TenantList>, AppError> {
    let tenants = state
        .admin_store
        .list_tenants()
        .await
        .context("Failed to fetch tenants")?;
    Ok(Json(TenantList { tenants }))
}

/// POST /api/admin/tenants
pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    AppJson(mut payload): AppJson<NewTenant>,
) -> Result<(StatusCode, Json<Tenant>), AppError> {
    payload.name = payload.name.trim().to_string();
    payload.slug = payload.slug.trim().to_lowercase();
    if payload.name.is_empty() || payload.slug.is_empty() {
        return Err(AppError::BadRequest(
            "Tenant name and slug are required".to_string(),
        ));
    }

    tracing::info!("POST /admin/tenants - slug: {}", payload.slug);

    let tenant = state
        .admin_store
        .create_tenant(&payload)
        .await
        .context("Failed to create tenant")?;

    Ok((StatusCode::CREATED, Json(tenant)))
}

/// PUT /api/admin/tenants/:id
pub async fn update_tenant(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<TenantUpdate>,
) -> Result<Json<Tenant>, AppError> {
    tracing::info!("PUT /admin/tenants/{}", id);

    let tenant = state
        .admin_store
        .update_tenant(id, &payload)
        .await
        .context("Failed to update tenant")?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    Ok(Json(tenant))
}

/// POST /api/admin/exports
///
/// Queues a CSV export of one lead kind and answers 202 immediately; poll
/// `GET /api/admin/exports/:id` for progress.
pub async fn create_export(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<ExportRequest>,
) -> Result<(StatusCode, Json<ExportAccepted>), AppError> {
    let kind = payload
        .kind
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::BadRequest("Export kind is required".to_string()))?;
    let kind = parse_kind(kind)?;

    let job = state
        .admin_store
        .create_export_job(kind)
        .await
        .context("Failed to create export job")?;

    tracing::info!("POST /admin/exports - queued job {} for {}", job.id, kind);

    let accepted = ExportAccepted {
        job_id: job.id,
        status: job.status,
    };
    spawn_export_job(Arc::clone(&state.admin_store), job);

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// GET /api/admin/exports/:id
pub async fn get_export(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ExportJob>, AppError> {
    let job = state
        .admin_store
        .get_export_job(id)
        .await
        .context("Failed to fetch export job")?
        .ok_or_else(|| AppError::NotFound("Export job not found".to_string()))?;
    Ok(Json(job))
}

/// GET /api/admin/exports/:id/download
///
/// Serves the CSV once the job completed; 409 while it is still pending,
/// running, or if it failed.
pub async fn download_export(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let job = state
        .admin_store
        .get_export_job(id)
        .await
        .context("Failed to fetch export job")?
        .ok_or_else(|| AppError::NotFound("Export job not found".to_string()))?;

    if job.status != ExportStatus::Completed {
        return Err(AppError::Conflict(format!(
            "Export job is {}",
            job.status.as_str()
        )));
    }

    let csv = state
        .admin_store
        .export_artifact(id)
        .await
        .context("Failed to fetch export artifact")?
        .ok_or_else(|| AppError::InternalError(format!("Export {} has no artifact", id)))?;

    let disposition = format!("attachment; filename=\"{}-{}.csv\"", job.kind.slug(), id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}
