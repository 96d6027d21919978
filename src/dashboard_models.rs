use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::{text_enum, LeadKind, LeadStatus};

// ============ Tasks ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

text_enum!(TaskStatus, "task status", {
    Todo => "todo",
    InProgress => "in_progress",
    Done => "done",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

text_enum!(TaskPriority, "task priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    #[sqlx(try_from = "String")]
    pub priority: TaskPriority,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default, alias = "due_date")]
    pub due_date: Option<NaiveDate>,
}

/// Partial task update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default, alias = "due_date")]
    pub due_date: Option<NaiveDate>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
            && self.due_date.is_none()
    }

    /// Applies the update in place.
    pub fn apply(&self, task: &mut Task) {
        if let Some(ref title) = self.title {
            task.title = title.clone();
        }
        if let Some(ref description) = self.description {
            task.description = Some(description.clone());
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(ref assignee) = self.assignee {
            task.assignee = Some(assignee.clone());
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
}

// ============ Notifications ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

text_enum!(NotificationLevel, "notification level", {
    Info => "info",
    Success => "success",
    Warning => "warning",
    Error => "error",
});

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[sqlx(try_from = "String")]
    pub level: NotificationLevel,
    pub lead_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
    pub lead_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

// ============ Tenants ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
}

text_enum!(TenantStatus, "tenant status", {
    Active => "active",
    Suspended => "suspended",
});

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub plan: String,
    #[sqlx(try_from = "String")]
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTenant {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub plan: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantUpdate {
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub status: Option<TenantStatus>,
}

// ============ Metrics ============

/// One row of the per-kind, per-status lead breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadCount {
    pub kind: LeadKind,
    pub status: LeadStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindMetrics {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_leads: i64,
    pub leads_by_kind: BTreeMap<String, KindMetrics>,
    pub active_subscribers: i64,
    pub open_tasks: i64,
    pub unread_notifications: i64,
    pub generated_at: DateTime<Utc>,
}

impl DashboardMetrics {
    /// Folds raw lead counts into the dashboard shape; every kind is present
    /// even when it has no rows.
    pub fn from_counts(
        counts: &[LeadCount],
        active_subscribers: i64,
        open_tasks: i64,
        unread_notifications: i64,
    ) -> Self {
        let mut leads_by_kind: BTreeMap<String, KindMetrics> = LeadKind::ALL
            .iter()
            .map(|kind| (kind.slug().to_string(), KindMetrics::default()))
            .collect();

        let mut total_leads = 0;
        for row in counts {
            let entry = leads_by_kind.entry(row.kind.slug().to_string()).or_default();
            entry.total += row.count;
            *entry
                .by_status
                .entry(row.status.as_str().to_string())
                .or_insert(0) += row.count;
            total_leads += row.count;
        }

        Self {
            total_leads,
            leads_by_kind,
            active_subscribers,
            open_tasks,
            unread_notifications,
            generated_at: Utc::now(),
        }
    }
}
