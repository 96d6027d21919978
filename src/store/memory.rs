use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    DashboardRepository, ExportRepository, LeadRepository, MfaRepository, StoreError, StoreResult,
    SubscriptionRepository,
};
use crate::dashboard_models::{
    LeadCount, NewNotification, NewTask, NewTenant, Notification, Task, TaskStatus, TaskUpdate,
    Tenant, TenantStatus, TenantUpdate,
};
use crate::export::{ExportJob, ExportStatus};
use crate::mfa::MfaEnrollment;
use crate::models::{
    BlueprintRequest, DemoRequest, LeadKind, LeadStatus, LeadSummary, NewBlueprintRequest,
    NewDemoRequest, NewQuickStart, NewSubscription, NewWorkshopSignup, NewsletterSubscription,
    QuickStartAssessment, WorkshopSignup, WorkshopSignupFilter,
};

#[derive(Default)]
struct Tables {
    subscriptions: Vec<NewsletterSubscription>,
    demo_requests: Vec<DemoRequest>,
    quick_starts: Vec<QuickStartAssessment>,
    workshop_signups: Vec<WorkshopSignup>,
    blueprint_requests: Vec<BlueprintRequest>,
    mfa: HashMap<String, MfaEnrollment>,
    tasks: Vec<Task>,
    notifications: Vec<Notification>,
    tenants: Vec<Tenant>,
    export_jobs: Vec<ExportJob>,
    export_artifacts: HashMap<Uuid, String>,
}

impl Tables {
    /// Mutable status slot of a lead, whatever its kind.
    fn status_mut(&mut self, kind: LeadKind, id: Uuid) -> Option<&mut LeadStatus> {
        match kind {
            LeadKind::DemoRequest => self
                .demo_requests
                .iter_mut()
                .find(|r| r.id == id)
                .map(|r| &mut r.status),
            LeadKind::QuickStart => self
                .quick_starts
                .iter_mut()
                .find(|r| r.id == id)
                .map(|r| &mut r.status),
            LeadKind::WorkshopSignup => self
                .workshop_signups
                .iter_mut()
                .find(|r| r.id == id)
                .map(|r| &mut r.status),
            LeadKind::BlueprintRequest => self
                .blueprint_requests
                .iter_mut()
                .find(|r| r.id == id)
                .map(|r| &mut r.status),
        }
    }

    fn summaries(&self, kind: LeadKind) -> Vec<LeadSummary> {
        match kind {
            LeadKind::DemoRequest => self.demo_requests.iter().map(LeadSummary::from).collect(),
            LeadKind::QuickStart => self.quick_starts.iter().map(LeadSummary::from).collect(),
            LeadKind::WorkshopSignup => self
                .workshop_signups
                .iter()
                .map(LeadSummary::from)
                .collect(),
            LeadKind::BlueprintRequest => self
                .blueprint_requests
                .iter()
                .map(LeadSummary::from)
                .collect(),
        }
    }

    fn export_job_mut(&mut self, id: Uuid) -> Option<&mut ExportJob> {
        self.export_jobs.iter_mut().find(|j| j.id == id)
    }
}

/// In-process store behind a single lock.
///
/// Rows are appended in insertion order, so "oldest first" is iteration
/// order. Each operation takes the lock once, which makes the
/// compare-and-set operations atomic.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            available: AtomicBool::new(true),
        }
    }

    /// A store whose every operation fails with `StoreError::Unavailable`.
    pub fn unavailable() -> Self {
        let store = Self::new();
        store.set_available(false);
        store
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    /// Number of stored newsletter subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.tables.read().await.subscriptions.len()
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn find_subscription_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<NewsletterSubscription>> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.subscriptions.iter().find(|s| s.email == email).cloned())
    }

    async fn insert_subscription(
        &self,
        new: &NewSubscription,
    ) -> StoreResult<NewsletterSubscription> {
        self.check()?;
        let mut t = self.tables.write().await;
        if t.subscriptions.iter().any(|s| s.email == new.email) {
            return Err(StoreError::Duplicate(new.email.clone()));
        }
        let now = Utc::now();
        let row = NewsletterSubscription {
            id: Uuid::new_v4(),
            email: new.email.clone(),
            name: new.name.clone(),
            interests: new.interests.clone(),
            is_active: true,
            source: new.source.clone(),
            created_at: now,
            updated_at: now,
        };
        t.subscriptions.push(row.clone());
        Ok(row)
    }

    async fn update_subscription(
        &self,
        id: Uuid,
        interests: &[String],
        is_active: bool,
    ) -> StoreResult<Option<NewsletterSubscription>> {
        self.check()?;
        let mut t = self.tables.write().await;
        Ok(t.subscriptions.iter_mut().find(|s| s.id == id).map(|s| {
            s.interests = interests.to_vec();
            s.is_active = is_active;
            s.updated_at = Utc::now();
            s.clone()
        }))
    }

    async fn count_active_subscriptions(&self) -> StoreResult<i64> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.subscriptions.iter().filter(|s| s.is_active).count() as i64)
    }
}

#[async_trait]
impl LeadRepository for MemoryStore {
    async fn insert_demo_request(&self, new: &NewDemoRequest) -> StoreResult<DemoRequest> {
        self.check()?;
        let row = DemoRequest {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            email: new.email.clone(),
            company: new.company.clone(),
            phone: new.phone.clone(),
            job_title: new.job_title.clone(),
            company_size: new.company_size.clone(),
            industry: new.industry.clone(),
            interests: new.interests.clone(),
            message: new.message.clone(),
            preferred_date: new.preferred_date.clone(),
            status: LeadKind::DemoRequest.initial_status(),
            created_at: Utc::now(),
        };
        self.tables.write().await.demo_requests.push(row.clone());
        Ok(row)
    }

    async fn insert_quick_start(&self, new: &NewQuickStart) -> StoreResult<QuickStartAssessment> {
        self.check()?;
        let row = QuickStartAssessment {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            email: new.email.clone(),
            company: new.company.clone(),
            industry: new.industry.clone(),
            company_size: new.company_size.clone(),
            timeline: new.timeline.clone(),
            budget: new.budget.clone(),
            goals: new.goals.clone(),
            pain_points: new.pain_points.clone(),
            current_ai_usage: new.current_ai_usage.clone(),
            status: LeadKind::QuickStart.initial_status(),
            created_at: Utc::now(),
        };
        self.tables.write().await.quick_starts.push(row.clone());
        Ok(row)
    }

    async fn insert_workshop_signup(
        &self,
        new: &NewWorkshopSignup,
    ) -> StoreResult<WorkshopSignup> {
        self.check()?;
        let row = WorkshopSignup {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            email: new.email.clone(),
            company: new.company.clone(),
            job_title: new.job_title.clone(),
            workshop_type: new.workshop_type.clone(),
            team_size: new.team_size.clone(),
            preferred_dates: new.preferred_dates.clone(),
            goals: new.goals.clone(),
            message: new.message.clone(),
            status: LeadKind::WorkshopSignup.initial_status(),
            created_at: Utc::now(),
        };
        self.tables.write().await.workshop_signups.push(row.clone());
        Ok(row)
    }

    async fn list_workshop_signups(
        &self,
        filter: &WorkshopSignupFilter,
    ) -> StoreResult<Vec<WorkshopSignup>> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.workshop_signups
            .iter()
            .rev()
            .filter(|s| filter.status.map_or(true, |status| s.status == status))
            .filter(|s| {
                filter
                    .workshop_type
                    .as_deref()
                    .map_or(true, |wt| s.workshop_type.as_deref() == Some(wt))
            })
            .cloned()
            .collect())
    }

    async fn insert_blueprint_request(
        &self,
        new: &NewBlueprintRequest,
    ) -> StoreResult<BlueprintRequest> {
        self.check()?;
        let row = BlueprintRequest {
            id: Uuid::new_v4(),
            company: new.company.clone(),
            email: new.email.clone(),
            name: new.name.clone(),
            industry_segment: new.industry_segment.clone(),
            facility_count: new.facility_count.clone(),
            challenges: new.challenges.clone(),
            priorities: new.priorities.clone(),
            timeline: new.timeline.clone(),
            budget: new.budget.clone(),
            status: LeadKind::BlueprintRequest.initial_status(),
            created_at: Utc::now(),
        };
        self.tables.write().await.blueprint_requests.push(row.clone());
        Ok(row)
    }

    async fn lead_status(&self, kind: LeadKind, id: Uuid) -> StoreResult<Option<LeadStatus>> {
        self.check()?;
        let mut t = self.tables.write().await;
        Ok(t.status_mut(kind, id).map(|s| *s))
    }

    async fn transition_lead_status(
        &self,
        kind: LeadKind,
        id: Uuid,
        from: LeadStatus,
        to: LeadStatus,
    ) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.write().await;
        match t.status_mut(kind, id) {
            Some(status) if *status == from => {
                *status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn lead_summaries(&self, kind: LeadKind) -> StoreResult<Vec<LeadSummary>> {
        self.check()?;
        Ok(self.tables.read().await.summaries(kind))
    }

    async fn lead_counts(&self) -> StoreResult<Vec<LeadCount>> {
        self.check()?;
        let t = self.tables.read().await;
        let mut counts: Vec<LeadCount> = Vec::new();
        for kind in LeadKind::ALL {
            for lead in t.summaries(kind) {
                match counts
                    .iter_mut()
                    .find(|c| c.kind == kind && c.status == lead.status)
                {
                    Some(c) => c.count += 1,
                    None => counts.push(LeadCount {
                        kind,
                        status: lead.status,
                        count: 1,
                    }),
                }
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl MfaRepository for MemoryStore {
    async fn get_mfa_enrollment(&self, user_id: &str) -> StoreResult<Option<MfaEnrollment>> {
        self.check()?;
        Ok(self.tables.read().await.mfa.get(user_id).cloned())
    }

    async fn save_pending_mfa_enrollment(
        &self,
        user_id: &str,
        secret: &str,
        backup_code_hashes: &[String],
    ) -> StoreResult<Option<MfaEnrollment>> {
        self.check()?;
        let mut t = self.tables.write().await;
        if t.mfa.get(user_id).is_some_and(|e| e.enabled) {
            return Ok(None);
        }
        let enrollment = MfaEnrollment {
            user_id: user_id.to_string(),
            secret: secret.to_string(),
            backup_code_hashes: backup_code_hashes.to_vec(),
            enabled: false,
            last_used_step: None,
            created_at: Utc::now(),
            enabled_at: None,
        };
        t.mfa.insert(user_id.to_string(), enrollment.clone());
        Ok(Some(enrollment))
    }

    async fn record_mfa_step(&self, user_id: &str, step: i64, enable: bool) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.write().await;
        let Some(enrollment) = t.mfa.get_mut(user_id) else {
            return Ok(false);
        };
        if enrollment.enabled == enable {
            return Ok(false);
        }
        if enrollment.last_used_step.is_some_and(|last| last >= step) {
            return Ok(false);
        }
        enrollment.last_used_step = Some(step);
        if enable {
            enrollment.enabled = true;
            enrollment.enabled_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn consume_backup_code(
        &self,
        user_id: &str,
        code_hash: &str,
    ) -> StoreResult<Option<usize>> {
        self.check()?;
        let mut t = self.tables.write().await;
        let Some(enrollment) = t.mfa.get_mut(user_id).filter(|e| e.enabled) else {
            return Ok(None);
        };
        let Some(pos) = enrollment
            .backup_code_hashes
            .iter()
            .position(|h| h == code_hash)
        else {
            return Ok(None);
        };
        enrollment.backup_code_hashes.remove(pos);
        Ok(Some(enrollment.backup_code_hashes.len()))
    }

    async fn delete_mfa_enrollment(&self, user_id: &str) -> StoreResult<bool> {
        self.check()?;
        Ok(self.tables.write().await.mfa.remove(user_id).is_some())
    }
}

#[async_trait]
impl DashboardRepository for MemoryStore {
    async fn list_tasks(&self, status: Option<TaskStatus>) -> StoreResult<Vec<Task>> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.tasks
            .iter()
            .filter(|task| status.map_or(true, |s| task.status == s))
            .cloned()
            .collect())
    }

    async fn create_task(&self, new: &NewTask) -> StoreResult<Task> {
        self.check()?;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: new.title.clone(),
            description: new.description.clone(),
            status: TaskStatus::Todo,
            priority: new.priority,
            assignee: new.assignee.clone(),
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: Uuid, update: &TaskUpdate) -> StoreResult<Option<Task>> {
        self.check()?;
        let mut t = self.tables.write().await;
        Ok(t.tasks.iter_mut().find(|task| task.id == id).map(|task| {
            update.apply(task);
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.tasks.len();
        t.tasks.retain(|task| task.id != id);
        Ok(t.tasks.len() != before)
    }

    async fn count_open_tasks(&self) -> StoreResult<i64> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.tasks
            .iter()
            .filter(|task| task.status != TaskStatus::Done)
            .count() as i64)
    }

    async fn create_notification(&self, new: &NewNotification) -> StoreResult<Notification> {
        self.check()?;
        let notification = Notification {
            id: Uuid::new_v4(),
            title: new.title.clone(),
            message: new.message.clone(),
            level: new.level,
            lead_id: new.lead_id,
            read: false,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, unread_only: bool) -> StoreResult<Vec<Notification>> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.notifications
            .iter()
            .rev()
            .filter(|n| !unread_only || !n.read)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, id: Uuid) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.write().await;
        match t.notifications.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_unread_notifications(&self) -> StoreResult<i64> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.notifications.iter().filter(|n| !n.read).count() as i64)
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        self.check()?;
        Ok(self.tables.read().await.tenants.clone())
    }

    async fn create_tenant(&self, new: &NewTenant) -> StoreResult<Tenant> {
        self.check()?;
        let mut t = self.tables.write().await;
        if t.tenants.iter().any(|tenant| tenant.slug == new.slug) {
            return Err(StoreError::Duplicate(new.slug.clone()));
        }
        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            slug: new.slug.clone(),
            plan: new.plan.clone().unwrap_or_else(|| "standard".to_string()),
            status: TenantStatus::Active,
            created_at: now,
            updated_at: now,
        };
        t.tenants.push(tenant.clone());
        Ok(tenant)
    }

    async fn update_tenant(&self, id: Uuid, update: &TenantUpdate) -> StoreResult<Option<Tenant>> {
        self.check()?;
        let mut t = self.tables.write().await;
        Ok(t.tenants.iter_mut().find(|tenant| tenant.id == id).map(|tenant| {
            if let Some(ref plan) = update.plan {
                tenant.plan = plan.clone();
            }
            if let Some(status) = update.status {
                tenant.status = status;
            }
            tenant.updated_at = Utc::now();
            tenant.clone()
        }))
    }
}

#[async_trait]
impl ExportRepository for MemoryStore {
    async fn create_export_job(&self, kind: LeadKind) -> StoreResult<ExportJob> {
        self.check()?;
        let job = ExportJob {
            id: Uuid::new_v4(),
            kind,
            status: ExportStatus::Pending,
            row_count: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        self.tables.write().await.export_jobs.push(job.clone());
        Ok(job)
    }

    async fn get_export_job(&self, id: Uuid) -> StoreResult<Option<ExportJob>> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.export_jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn claim_export_job(&self, id: Uuid) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.write().await;
        match t.export_job_mut(id) {
            Some(job) if job.status == ExportStatus::Pending => {
                job.status = ExportStatus::Running;
                job.started_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_export_job(&self, id: Uuid, csv: &str, row_count: i64) -> StoreResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let job = t
            .export_job_mut(id)
            .ok_or_else(|| StoreError::Corrupt(format!("export job {} vanished", id)))?;
        job.status = ExportStatus::Completed;
        job.row_count = Some(row_count);
        job.completed_at = Some(Utc::now());
        t.export_artifacts.insert(id, csv.to_string());
        Ok(())
    }

    async fn fail_export_job(&self, id: Uuid, error: &str) -> StoreResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        if let Some(job) = t.export_job_mut(id) {
            job.status = ExportStatus::Failed;
            job.error = Some(error.to_string());
            job.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn export_artifact(&self, id: Uuid) -> StoreResult<Option<String>> {
        self.check()?;
        let t = self.tables.read().await;
        let completed = t
            .export_jobs
            .iter()
            .any(|j| j.id == id && j.status == ExportStatus::Completed);
        Ok(if completed {
            t.export_artifacts.get(&id).cloned()
        } else {
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard_models::TaskPriority;

    fn subscription(email: &str) -> NewSubscription {
        NewSubscription {
            email: email.to_string(),
            name: None,
            interests: vec!["ai".to_string()],
            source: None,
        }
    }

    fn signup(workshop_type: &str) -> NewWorkshopSignup {
        NewWorkshopSignup {
            name: "Jane".to_string(),
            email: "jane@x.com".to_string(),
            company: "Acme".to_string(),
            job_title: None,
            workshop_type: Some(workshop_type.to_string()),
            team_size: None,
            preferred_dates: vec![],
            goals: vec![],
            message: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_subscription_rejected() {
        let store = MemoryStore::new();
        store.insert_subscription(&subscription("a@x.com")).await.unwrap();

        let err = store
            .insert_subscription(&subscription("a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_set() {
        let store = MemoryStore::new();
        let row = store.insert_workshop_signup(&signup("genai")).await.unwrap();

        assert!(store
            .transition_lead_status(
                LeadKind::WorkshopSignup,
                row.id,
                LeadStatus::Pending,
                LeadStatus::Approved
            )
            .await
            .unwrap());
        // Stale expectation loses
        assert!(!store
            .transition_lead_status(
                LeadKind::WorkshopSignup,
                row.id,
                LeadStatus::Pending,
                LeadStatus::Rejected
            )
            .await
            .unwrap());
        assert_eq!(
            store
                .lead_status(LeadKind::WorkshopSignup, row.id)
                .await
                .unwrap(),
            Some(LeadStatus::Approved)
        );
        // Wrong kind does not find the row
        assert_eq!(
            store.lead_status(LeadKind::QuickStart, row.id).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_workshop_filter_newest_first() {
        let store = MemoryStore::new();
        let first = store.insert_workshop_signup(&signup("genai")).await.unwrap();
        store.insert_workshop_signup(&signup("mlops")).await.unwrap();
        let third = store.insert_workshop_signup(&signup("genai")).await.unwrap();

        let filter = WorkshopSignupFilter {
            status: None,
            workshop_type: Some("genai".to_string()),
        };
        let rows = store.list_workshop_signups(&filter).await.unwrap();
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third.id, first.id]);
    }

    #[tokio::test]
    async fn test_mfa_step_must_advance() {
        let store = MemoryStore::new();
        store
            .save_pending_mfa_enrollment("u", "SECRET", &[])
            .await
            .unwrap();

        // Login steps are refused while pending
        assert!(!store.record_mfa_step("u", 10, false).await.unwrap());
        assert!(store.record_mfa_step("u", 10, true).await.unwrap());
        assert!(!store.record_mfa_step("u", 10, false).await.unwrap());
        assert!(!store.record_mfa_step("u", 9, false).await.unwrap());
        assert!(store.record_mfa_step("u", 11, false).await.unwrap());

        // Enabled enrollments are not replaced by a new pending one
        assert!(store
            .save_pending_mfa_enrollment("u", "OTHER", &[])
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_tasks_and_counts() {
        let store = MemoryStore::new();
        let task = store
            .create_task(&NewTask {
                title: "Follow up".to_string(),
                priority: TaskPriority::High,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(store.count_open_tasks().await.unwrap(), 1);

        let update = TaskUpdate {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        let updated = store.update_task(task.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(store.count_open_tasks().await.unwrap(), 0);

        assert!(store.delete_task(task.id).await.unwrap());
        assert!(!store.delete_task(task.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_export_artifact_hidden_until_completed() {
        let store = MemoryStore::new();
        let job = store.create_export_job(LeadKind::DemoRequest).await.unwrap();
        assert!(store.export_artifact(job.id).await.unwrap().is_none());

        assert!(store.claim_export_job(job.id).await.unwrap());
        assert!(!store.claim_export_job(job.id).await.unwrap());
        store.complete_export_job(job.id, "id\n", 0).await.unwrap();

        assert_eq!(
            store.export_artifact(job.id).await.unwrap().as_deref(),
            Some("id\n")
        );
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = MemoryStore::unavailable();
        assert!(matches!(
            store.find_subscription_by_email("a@x.com").await,
            Err(StoreError::Unavailable)
        ));
        assert!(matches!(
            store.list_tenants().await,
            Err(StoreError::Unavailable)
        ));

        store.set_available(true);
        assert!(store.list_tenants().await.unwrap().is_empty());
    }
}
