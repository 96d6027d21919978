//! Persistence client.
//!
//! Each concern gets its own repository trait; `Store` bundles them so the
//! router can carry a single `Arc<dyn Store>`. `PgStore` is the production
//! backend and `MemoryStore` serves local runs and tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::dashboard_models::{
    LeadCount, NewNotification, NewTask, NewTenant, Notification, Task, TaskStatus, TaskUpdate,
    Tenant, TenantUpdate,
};
use crate::export::ExportJob;
use crate::mfa::MfaEnrollment;
use crate::models::{
    BlueprintRequest, DemoRequest, LeadKind, LeadStatus, LeadSummary, NewBlueprintRequest,
    NewDemoRequest, NewQuickStart, NewSubscription, NewWorkshopSignup, NewsletterSubscription,
    QuickStartAssessment, WorkshopSignup, WorkshopSignupFilter,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable")]
    Unavailable,
    /// A unique constraint rejected the write; carries the conflicting value.
    #[error("duplicate value: {0}")]
    Duplicate(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Looks up a subscriber by already-normalized email.
    async fn find_subscription_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<NewsletterSubscription>>;

    /// Inserts an active subscriber. Fails with `Duplicate` when the email exists.
    async fn insert_subscription(
        &self,
        new: &NewSubscription,
    ) -> StoreResult<NewsletterSubscription>;

    /// Replaces interests, sets the active flag and bumps `updated_at`.
    async fn update_subscription(
        &self,
        id: Uuid,
        interests: &[String],
        is_active: bool,
    ) -> StoreResult<Option<NewsletterSubscription>>;

    async fn count_active_subscriptions(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn insert_demo_request(&self, new: &NewDemoRequest) -> StoreResult<DemoRequest>;
    async fn insert_quick_start(&self, new: &NewQuickStart) -> StoreResult<QuickStartAssessment>;
    async fn insert_workshop_signup(
        &self,
        new: &NewWorkshopSignup,
    ) -> StoreResult<WorkshopSignup>;
    /// Newest first.
    async fn list_workshop_signups(
        &self,
        filter: &WorkshopSignupFilter,
    ) -> StoreResult<Vec<WorkshopSignup>>;
    async fn insert_blueprint_request(
        &self,
        new: &NewBlueprintRequest,
    ) -> StoreResult<BlueprintRequest>;

    async fn lead_status(&self, kind: LeadKind, id: Uuid) -> StoreResult<Option<LeadStatus>>;

    /// Compare-and-set: moves the lead to `to` only while it is still `from`.
    /// Returns false when the current status differs or the lead is gone.
    async fn transition_lead_status(
        &self,
        kind: LeadKind,
        id: Uuid,
        from: LeadStatus,
        to: LeadStatus,
    ) -> StoreResult<bool>;

    /// Oldest first, for exports.
    async fn lead_summaries(&self, kind: LeadKind) -> StoreResult<Vec<LeadSummary>>;

    /// One row per (kind, status) pair that has at least one lead.
    async fn lead_counts(&self) -> StoreResult<Vec<LeadCount>>;
}

#[async_trait]
pub trait MfaRepository: Send + Sync {
    async fn get_mfa_enrollment(&self, user_id: &str) -> StoreResult<Option<MfaEnrollment>>;

    /// Stores a pending enrollment, replacing any earlier pending one.
    /// Returns `None` when the user already has an enabled enrollment.
    async fn save_pending_mfa_enrollment(
        &self,
        user_id: &str,
        secret: &str,
        backup_code_hashes: &[String],
    ) -> StoreResult<Option<MfaEnrollment>>;

    /// Accepts `step` only if it is newer than the last accepted one. When
    /// `enable` is set the enrollment must be pending and becomes enabled;
    /// otherwise it must already be enabled.
    async fn record_mfa_step(&self, user_id: &str, step: i64, enable: bool) -> StoreResult<bool>;

    /// Removes a matching unused backup code and returns how many remain.
    async fn consume_backup_code(
        &self,
        user_id: &str,
        code_hash: &str,
    ) -> StoreResult<Option<usize>>;

    async fn delete_mfa_enrollment(&self, user_id: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    async fn list_tasks(&self, status: Option<TaskStatus>) -> StoreResult<Vec<Task>>;
    async fn create_task(&self, new: &NewTask) -> StoreResult<Task>;
    async fn update_task(&self, id: Uuid, update: &TaskUpdate) -> StoreResult<Option<Task>>;
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;
    /// Tasks not yet done.
    async fn count_open_tasks(&self) -> StoreResult<i64>;

    async fn create_notification(&self, new: &NewNotification) -> StoreResult<Notification>;
    /// Newest first.
    async fn list_notifications(&self, unread_only: bool) -> StoreResult<Vec<Notification>>;
    async fn mark_notification_read(&self, id: Uuid) -> StoreResult<bool>;
    async fn count_unread_notifications(&self) -> StoreResult<i64>;

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>>;
    /// Fails with `Duplicate` when the slug is taken.
    async fn create_tenant(&self, new: &NewTenant) -> StoreResult<Tenant>;
    async fn update_tenant(&self, id: Uuid, update: &TenantUpdate) -> StoreResult<Option<Tenant>>;
}

#[async_trait]
pub trait ExportRepository: Send + Sync {
    async fn create_export_job(&self, kind: LeadKind) -> StoreResult<ExportJob>;
    async fn get_export_job(&self, id: Uuid) -> StoreResult<Option<ExportJob>>;
    /// pending → running; false if the job is not pending.
    async fn claim_export_job(&self, id: Uuid) -> StoreResult<bool>;
    async fn complete_export_job(&self, id: Uuid, csv: &str, row_count: i64) -> StoreResult<()>;
    async fn fail_export_job(&self, id: Uuid, error: &str) -> StoreResult<()>;
    /// The CSV of a completed job.
    async fn export_artifact(&self, id: Uuid) -> StoreResult<Option<String>>;
}

/// Everything the HTTP layer needs from persistence.
pub trait Store:
    SubscriptionRepository + LeadRepository + MfaRepository + DashboardRepository + ExportRepository
{
}

impl<T> Store for T where
    T: SubscriptionRepository
        + LeadRepository
        + MfaRepository
        + DashboardRepository
        + ExportRepository
{
}
