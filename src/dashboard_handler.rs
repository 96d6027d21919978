use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::dashboard_models::{
    DashboardMetrics, NewTask, Notification, NotificationQuery, Task, TaskQuery, TaskUpdate,
};
use crate::errors::{AppError, ResultExt};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::handlers::AppState;
use crate::store::Store;

const METRICS_KEY: &str = "dashboard";

#[derive(Debug, Serialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
}

/// Computes metrics straight from the store, bypassing the cache.
pub async fn compute_metrics(store: &dyn Store) -> Result<DashboardMetrics, AppError> {
    let counts = store.lead_counts().await?;
    let active_subscribers = store.count_active_subscriptions().await?;
    let open_tasks = store.count_open_tasks().await?;
    let unread_notifications = store.count_unread_notifications().await?;

    Ok(DashboardMetrics::from_counts(
        &counts,
        active_subscribers,
        open_tasks,
        unread_notifications,
    ))
}

/// GET /api/dashboard/metrics
///
/// Lead counts by kind and status plus subscriber, task and notification
/// totals. Served from a 30 second cache.
pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardMetrics>, AppError> {
    if let Some(cached) = state.metrics_cache.get(METRICS_KEY).await {
        tracing::debug!("Dashboard metrics served from cache");
        return Ok(Json(cached));
    }

    let metrics = compute_metrics(state.admin_store.as_ref())
        .await
        .context("Failed to compute dashboard metrics")?;

    state
        .metrics_cache
        .insert(METRICS_KEY, metrics.clone())
        .await;

    Ok(Json(metrics))
}

/// GET /api/dashboard/tasks
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<TaskQuery>,
) -> Result<Json<TaskList>, AppError> {
    let tasks = state
        .admin_store
        .list_tasks(query.status)
        .await
        .context("Failed to fetch tasks")?;
    Ok(Json(TaskList { tasks }))
}

/// POST /api/dashboard/tasks
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    AppJson(mut payload): AppJson<NewTask>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    payload.title = payload.title.trim().to_string();
    if payload.title.is_empty() {
        return Err(AppError::BadRequest("Task title is required".to_string()));
    }

    let task = state
        .admin_store
        .create_task(&payload)
        .await
        .context("Failed to create task")?;

    tracing::info!("Created task {}", task.id);
    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /api/dashboard/tasks/:id
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<TaskUpdate>,
) -> Result<Json<Task>, AppError> {
    if payload.is_empty() {
        return Err(AppError::BadRequest("No task fields to update".to_string()));
    }
    if payload.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::BadRequest("Task title cannot be empty".to_string()));
    }

    let task = state
        .admin_store
        .update_task(id, &payload)
        .await
        .context("Failed to update task")?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// DELETE /api/dashboard/tasks/:id
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state
        .admin_store
        .delete_task(id)
        .await
        .context("Failed to delete task")?;

    if !deleted {
        return Err(AppError::NotFound("Task not found".to_string()));
    }
    tracing::info!("Deleted task {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/dashboard/notifications
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<NotificationQuery>,
) -> Result<Json<NotificationList>, AppError> {
    let notifications = state
        .admin_store
        .list_notifications(query.unread)
        .await
        .context("Failed to fetch notifications")?;
    Ok(Json(NotificationList { notifications }))
}

/// POST /api/dashboard/notifications/:id/read
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let found = state
        .admin_store
        .mark_notification_read(id)
        .await
        .context("Failed to update notification")?;

    if !found {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "success": true, "id": id })))
}
