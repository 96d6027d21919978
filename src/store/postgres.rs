use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{
    DashboardRepository, ExportRepository, LeadRepository, MfaRepository, StoreError, StoreResult,
    SubscriptionRepository,
};
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

const EXPORT_COLUMNS: &str =
    "id, kind, status, row_count, error, created_at, started_at, completed_at";

/// Postgres-backed store. Concurrency guarantees come from single-statement
/// conditional updates.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a unique violation to `Duplicate`, everything else to `Database`.
fn unique_or_db(err: sqlx::Error, value: &str) -> StoreError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StoreError::Duplicate(value.to_string())
        }
        other => StoreError::Database(other),
    }
}

#[derive(FromRow)]
struct SummaryRow {
    id: Uuid,
    name: Option<String>,
    email: String,
    company: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(FromRow)]
struct CountRow {
    kind: String,
    status: String,
    count: i64,
}

#[async_trait]
impl SubscriptionRepository for PgStore {
    async fn find_subscription_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<NewsletterSubscription>> {
        let row = sqlx::query_as::<_, NewsletterSubscription>(
            "SELECT id, email, name, interests, is_active, source, created_at, updated_at
             FROM newsletter_subscriptions WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_subscription(
        &self,
        new: &NewSubscription,
    ) -> StoreResult<NewsletterSubscription> {
        sqlx::query_as::<_, NewsletterSubscription>(
            "INSERT INTO newsletter_subscriptions (id, email, name, interests, is_active, source)
             VALUES ($1, $2, $3, $4, TRUE, $5)
             RETURNING id, email, name, interests, is_active, source, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.interests)
        .bind(&new.source)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_or_db(e, &new.email))
    }

    async fn update_subscription(
        &self,
        id: Uuid,
        interests: &[String],
        is_active: bool,
    ) -> StoreResult<Option<NewsletterSubscription>> {
        let row = sqlx::query_as::<_, NewsletterSubscription>(
            "UPDATE newsletter_subscriptions
             SET interests = $2, is_active = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING id, email, name, interests, is_active, source, created_at, updated_at",
        )
        .bind(id)
        .bind(interests)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn count_active_subscriptions(&self) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM newsletter_subscriptions WHERE is_active")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[async_trait]
impl LeadRepository for PgStore {
    async fn insert_demo_request(&self, new: &NewDemoRequest) -> StoreResult<DemoRequest> {
        let row = sqlx::query_as::<_, DemoRequest>(
            "INSERT INTO demo_requests
                (id, name, email, company, phone, job_title, company_size, industry,
                 interests, message, preferred_date, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.company)
        .bind(&new.phone)
        .bind(&new.job_title)
        .bind(&new.company_size)
        .bind(&new.industry)
        .bind(&new.interests)
        .bind(&new.message)
        .bind(&new.preferred_date)
        .bind(LeadKind::DemoRequest.initial_status().as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_quick_start(&self, new: &NewQuickStart) -> StoreResult<QuickStartAssessment> {
        let row = sqlx::query_as::<_, QuickStartAssessment>(
            "INSERT INTO quick_start_assessments
                (id, name, email, company, industry, company_size, timeline, budget,
                 goals, pain_points, current_ai_usage, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.company)
        .bind(&new.industry)
        .bind(&new.company_size)
        .bind(&new.timeline)
        .bind(&new.budget)
        .bind(&new.goals)
        .bind(&new.pain_points)
        .bind(&new.current_ai_usage)
        .bind(LeadKind::QuickStart.initial_status().as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_workshop_signup(
        &self,
        new: &NewWorkshopSignup,
    ) -> StoreResult<WorkshopSignup> {
        let row = sqlx::query_as::<_, WorkshopSignup>(
            "INSERT INTO workshop_signups
                (id, name, email, company, job_title, workshop_type, team_size,
                 preferred_dates, goals, message, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.company)
        .bind(&new.job_title)
        .bind(&new.workshop_type)
        .bind(&new.team_size)
        .bind(&new.preferred_dates)
        .bind(&new.goals)
        .bind(&new.message)
        .bind(LeadKind::WorkshopSignup.initial_status().as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_workshop_signups(
        &self,
        filter: &WorkshopSignupFilter,
    ) -> StoreResult<Vec<WorkshopSignup>> {
        let rows = sqlx::query_as::<_, WorkshopSignup>(
            "SELECT * FROM workshop_signups
             WHERE ($1::text IS NULL OR status = $1)
               AND ($2::text IS NULL OR workshop_type = $2)
             ORDER BY created_at DESC",
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.workshop_type.as_deref())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_blueprint_request(
        &self,
        new: &NewBlueprintRequest,
    ) -> StoreResult<BlueprintRequest> {
        let row = sqlx::query_as::<_, BlueprintRequest>(
            "INSERT INTO manufacturing_blueprint_requests
                (id, company, email, name, industry_segment, facility_count,
                 challenges, priorities, timeline, budget, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.company)
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.industry_segment)
        .bind(&new.facility_count)
        .bind(&new.challenges)
        .bind(&new.priorities)
        .bind(&new.timeline)
        .bind(&new.budget)
        .bind(LeadKind::BlueprintRequest.initial_status().as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn lead_status(&self, kind: LeadKind, id: Uuid) -> StoreResult<Option<LeadStatus>> {
        // Table names come from a closed enum, never from input
        let sql = format!("SELECT status FROM {} WHERE id = $1", kind.table());
        let status: Option<String> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        status
            .map(|s| s.parse().map_err(|e| StoreError::Corrupt(format!("{}", e))))
            .transpose()
    }

    async fn transition_lead_status(
        &self,
        kind: LeadKind,
        id: Uuid,
        from: LeadStatus,
        to: LeadStatus,
    ) -> StoreResult<bool> {
        let sql = format!(
            "UPDATE {} SET status = $3 WHERE id = $1 AND status = $2",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn lead_summaries(&self, kind: LeadKind) -> StoreResult<Vec<LeadSummary>> {
        let sql = format!(
            "SELECT id, name, email, company, status, created_at FROM {} ORDER BY created_at",
            kind.table()
        );
        let rows = sqlx::query_as::<_, SummaryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let status = row
                    .status
                    .parse()
                    .map_err(|e| StoreError::Corrupt(format!("{}", e)))?;
                Ok(LeadSummary {
                    id: row.id,
                    kind,
                    name: row.name,
                    email: row.email,
                    company: row.company,
                    status,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    async fn lead_counts(&self) -> StoreResult<Vec<LeadCount>> {
        let sql = LeadKind::ALL
            .iter()
            .map(|kind| {
                format!(
                    "SELECT '{}' AS kind, status, COUNT(*) AS count FROM {} GROUP BY status",
                    kind.slug(),
                    kind.table()
                )
            })
            .collect::<Vec<_>>()
            .join(" UNION ALL ");

        let rows = sqlx::query_as::<_, CountRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(LeadCount {
                    kind: row
                        .kind
                        .parse()
                        .map_err(|e| StoreError::Corrupt(format!("{}", e)))?,
                    status: row
                        .status
                        .parse()
                        .map_err(|e| StoreError::Corrupt(format!("{}", e)))?,
                    count: row.count,
                })
            })
            .collect()
    }
}

#[async_trait]
impl MfaRepository for PgStore {
    async fn get_mfa_enrollment(&self, user_id: &str) -> StoreResult<Option<MfaEnrollment>> {
        let row = sqlx::query_as::<_, MfaEnrollment>(
            "SELECT * FROM mfa_enrollments WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn save_pending_mfa_enrollment(
        &self,
        user_id: &str,
        secret: &str,
        backup_code_hashes: &[String],
    ) -> StoreResult<Option<MfaEnrollment>> {
        // The conflict branch only fires while the existing row is still pending
        let row = sqlx::query_as::<_, MfaEnrollment>(
            "INSERT INTO mfa_enrollments (user_id, secret, backup_code_hashes, enabled)
             VALUES ($1, $2, $3, FALSE)
             ON CONFLICT (user_id) DO UPDATE
                SET secret = EXCLUDED.secret,
                    backup_code_hashes = EXCLUDED.backup_code_hashes,
                    last_used_step = NULL,
                    created_at = NOW(),
                    enabled_at = NULL
                WHERE mfa_enrollments.enabled = FALSE
             RETURNING *",
        )
        .bind(user_id)
        .bind(secret)
        .bind(backup_code_hashes)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn record_mfa_step(&self, user_id: &str, step: i64, enable: bool) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE mfa_enrollments
             SET last_used_step = $2,
                 enabled = enabled OR $3,
                 enabled_at = CASE WHEN $3 THEN NOW() ELSE enabled_at END
             WHERE user_id = $1
               AND enabled <> $3
               AND (last_used_step IS NULL OR last_used_step < $2)",
        )
        .bind(user_id)
        .bind(step)
        .bind(enable)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn consume_backup_code(
        &self,
        user_id: &str,
        code_hash: &str,
    ) -> StoreResult<Option<usize>> {
        let remaining: Option<i32> = sqlx::query_scalar(
            "UPDATE mfa_enrollments
             SET backup_code_hashes = array_remove(backup_code_hashes, $2)
             WHERE user_id = $1 AND enabled AND $2 = ANY(backup_code_hashes)
             RETURNING cardinality(backup_code_hashes)",
        )
        .bind(user_id)
        .bind(code_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(remaining.map(|n| n.max(0) as usize))
    }

    async fn delete_mfa_enrollment(&self, user_id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM mfa_enrollments WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl DashboardRepository for PgStore {
    async fn list_tasks(&self, status: Option<TaskStatus>) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_task(&self, new: &NewTask) -> StoreResult<Task> {
        let row = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (id, title, description, status, priority, assignee, due_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.description)
        .bind(TaskStatus::Todo.as_str())
        .bind(new.priority.as_str())
        .bind(&new.assignee)
        .bind(new.due_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_task(&self, id: Uuid, update: &TaskUpdate) -> StoreResult<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                assignee = COALESCE($6, assignee),
                due_date = COALESCE($7, due_date),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.priority.map(|p| p.as_str()))
        .bind(update.assignee.as_deref())
        .bind(update.due_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn count_open_tasks(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE status <> $1")
            .bind(TaskStatus::Done.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_notification(&self, new: &NewNotification) -> StoreResult<Notification> {
        let row = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (id, title, message, level, lead_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.message)
        .bind(new.level.as_str())
        .bind(new.lead_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_notifications(&self, unread_only: bool) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications
             WHERE NOT ($1 AND read)
             ORDER BY created_at DESC",
        )
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn mark_notification_read(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn count_unread_notifications(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE NOT read")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        let rows = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create_tenant(&self, new: &NewTenant) -> StoreResult<Tenant> {
        sqlx::query_as::<_, Tenant>(
            "INSERT INTO tenants (id, name, slug, plan)
             VALUES ($1, $2, $3, COALESCE($4, 'standard'))
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.slug)
        .bind(new.plan.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_or_db(e, &new.slug))
    }

    async fn update_tenant(&self, id: Uuid, update: &TenantUpdate) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, Tenant>(
            "UPDATE tenants SET
                plan = COALESCE($2, plan),
                status = COALESCE($3, status),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(update.plan.as_deref())
        .bind(update.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl ExportRepository for PgStore {
    async fn create_export_job(&self, kind: LeadKind) -> StoreResult<ExportJob> {
        let sql = format!(
            "INSERT INTO export_jobs (id, kind, status) VALUES ($1, $2, 'pending') RETURNING {}",
            EXPORT_COLUMNS
        );
        let row = sqlx::query_as::<_, ExportJob>(&sql)
            .bind(Uuid::new_v4())
            .bind(kind.slug())
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_export_job(&self, id: Uuid) -> StoreResult<Option<ExportJob>> {
        let sql = format!("SELECT {} FROM export_jobs WHERE id = $1", EXPORT_COLUMNS);
        let row = sqlx::query_as::<_, ExportJob>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn claim_export_job(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE export_jobs SET status = 'running', started_at = NOW()
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn complete_export_job(&self, id: Uuid, csv: &str, row_count: i64) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE export_jobs
             SET status = 'completed', artifact = $2, row_count = $3, completed_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(csv)
        .bind(row_count)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!("export job {} vanished", id)));
        }
        Ok(())
    }

    async fn fail_export_job(&self, id: Uuid, error: &str) -> StoreResult<()> {
        sqlx::query(
            "UPDATE export_jobs SET status = 'failed', error = $2, completed_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn export_artifact(&self, id: Uuid) -> StoreResult<Option<String>> {
        let artifact: Option<Option<String>> = sqlx::query_scalar(
            "SELECT artifact FROM export_jobs WHERE id = $1 AND status = 'completed'",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(artifact.flatten())
    }
}
