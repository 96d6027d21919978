//! Lead capture service: validation, normalization and the post-insert side
//! effects shared by every form.

use crate::dashboard_models::{NewNotification, NotificationLevel};
use crate::errors::{AppError, ResultExt};
use crate::models::{
    BlueprintRequest, BlueprintRequestPayload, DemoRequest, DemoRequestPayload, LeadSummary,
    NewBlueprintRequest, NewDemoRequest, NewQuickStart, NewSubscription, NewWorkshopSignup,
    NewsletterPayload, NewsletterSubscription, QuickStartAssessment, QuickStartPayload,
    WorkshopSignup, WorkshopSignupPayload,
};
use crate::notifier::{LeadEvent, LeadNotifier};
use crate::store::{DashboardRepository, LeadRepository, Store, StoreError, SubscriptionRepository};

pub const EMAIL_REQUIRED: &str = "Email is required";
pub const NAME_EMAIL_COMPANY_REQUIRED: &str = "Name, email, and company are required";
pub const COMPANY_EMAIL_REQUIRED: &str = "Company and email are required";

/// Trimmed value, or `None` when absent or blank.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Emails are matched case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Whether the newsletter call created or refreshed the subscriber.
#[derive(Debug, Clone)]
pub enum SubscribeOutcome {
    Created(NewsletterSubscription),
    Updated(NewsletterSubscription),
}

impl SubscribeOutcome {
    pub fn subscription(&self) -> &NewsletterSubscription {
        match self {
            SubscribeOutcome::Created(s) | SubscribeOutcome::Updated(s) => s,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SubscribeOutcome::Created(_) => "Successfully subscribed to newsletter",
            SubscribeOutcome::Updated(_) => "Subscription updated successfully",
        }
    }
}

/// Upserts a newsletter subscriber keyed by normalized email.
pub async fn subscribe(
    store: &dyn Store,
    payload: NewsletterPayload,
) -> Result<SubscribeOutcome, AppError> {
    let email = present(payload.email)
        .map(|e| normalize_email(&e))
        .ok_or_else(|| AppError::BadRequest(EMAIL_REQUIRED.to_string()))?;

    upsert_subscription(store, email, payload.name, payload.interests, payload.source)
        .await
        .context("Failed to subscribe to newsletter")
}

async fn upsert_subscription(
    store: &dyn Store,
    email: String,
    name: Option<String>,
    interests: Option<Vec<String>>,
    source: Option<String>,
) -> Result<SubscribeOutcome, AppError> {
    if let Some(existing) = store.find_subscription_by_email(&email).await? {
        return refresh_subscription(store, existing, interests).await;
    }

    let new = NewSubscription {
        email,
        name: present(name),
        interests: interests.clone().unwrap_or_default(),
        source: present(source),
    };

    match store.insert_subscription(&new).await {
        Ok(created) => {
            tracing::info!("New newsletter subscriber {}", created.id);
            Ok(SubscribeOutcome::Created(created))
        }
        Err(StoreError::Duplicate(_)) => {
            // Lost a race with a concurrent insert of the same email
            tracing::debug!("Newsletter insert raced, retrying as update");
            let existing = store
                .find_subscription_by_email(&new.email)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError("Subscriber vanished after conflict".to_string())
                })?;
            refresh_subscription(store, existing, interests).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn refresh_subscription(
    store: &dyn Store,
    existing: NewsletterSubscription,
    interests: Option<Vec<String>>,
) -> Result<SubscribeOutcome, AppError> {
    let interests = interests.unwrap_or(existing.interests);
    let updated = store
        .update_subscription(existing.id, &interests, true)
        .await?
        .ok_or_else(|| AppError::InternalError("Subscriber vanished during update".to_string()))?;

    tracing::info!("Refreshed newsletter subscriber {}", updated.id);
    Ok(SubscribeOutcome::Updated(updated))
}

/// Records the dashboard notification and fires the webhook for a new lead.
/// Neither may fail the request.
async fn announce(store: &dyn Store, notifier: Option<&LeadNotifier>, lead: LeadSummary) {
    let who = lead.name.clone().unwrap_or_else(|| lead.email.clone());
    let notification = NewNotification {
        title: format!("New {}", lead.kind.label()),
        message: format!("{} from {}", who, lead.company),
        level: NotificationLevel::Info,
        lead_id: Some(lead.id),
    };
    if let Err(e) = store.create_notification(&notification).await {
        tracing::warn!("Failed to record notification for {} {}: {}", lead.kind, lead.id, e);
    }

    if let Some(notifier) = notifier {
        notifier.spawn_send(LeadEvent::from(&lead));
    }
}

pub async fn submit_demo_request(
    store: &dyn Store,
    notifier: Option<&LeadNotifier>,
    payload: DemoRequestPayload,
) -> Result<DemoRequest, AppError> {
    let (Some(name), Some(email), Some(company)) = (
        present(payload.name),
        present(payload.email),
        present(payload.company),
    ) else {
        return Err(AppError::BadRequest(NAME_EMAIL_COMPANY_REQUIRED.to_string()));
    };

    let new = NewDemoRequest {
        name,
        email,
        company,
        phone: present(payload.phone),
        job_title: present(payload.job_title),
        company_size: present(payload.company_size),
        industry: present(payload.industry),
        interests: payload.interests.unwrap_or_default(),
        message: present(payload.message),
        preferred_date: present(payload.preferred_date),
    };

    let row = store
        .insert_demo_request(&new)
        .await
        .context("Failed to submit demo request")?;

    tracing::info!("Stored demo request {}", row.id);
    announce(store, notifier, LeadSummary::from(&row)).await;
    Ok(row)
}

pub async fn submit_quick_start(
    store: &dyn Store,
    notifier: Option<&LeadNotifier>,
    payload: QuickStartPayload,
) -> Result<QuickStartAssessment, AppError> {
    let (Some(name), Some(email), Some(company)) = (
        present(payload.name),
        present(payload.email),
        present(payload.company),
    ) else {
        return Err(AppError::BadRequest(NAME_EMAIL_COMPANY_REQUIRED.to_string()));
    };

    let new = NewQuickStart {
        name,
        email,
        company,
        industry: present(payload.industry),
        company_size: present(payload.company_size),
        timeline: present(payload.timeline),
        budget: present(payload.budget),
        goals: payload.goals.unwrap_or_default(),
        pain_points: payload.pain_points.unwrap_or_default(),
        current_ai_usage: present(payload.current_ai_usage),
    };

    let row = store
        .insert_quick_start(&new)
        .await
        .context("Failed to submit quick start assessment")?;

    tracing::info!("Stored quick start assessment {}", row.id);
    announce(store, notifier, LeadSummary::from(&row)).await;
    Ok(row)
}

pub async fn submit_workshop_signup(
    store: &dyn Store,
    notifier: Option<&LeadNotifier>,
    payload: WorkshopSignupPayload,
) -> Result<WorkshopSignup, AppError> {
    let (Some(name), Some(email), Some(company)) = (
        present(payload.name),
        present(payload.email),
        present(payload.company),
    ) else {
        return Err(AppError::BadRequest(NAME_EMAIL_COMPANY_REQUIRED.to_string()));
    };

    let new = NewWorkshopSignup {
        name,
        email,
        company,
        job_title: present(payload.job_title),
        workshop_type: present(payload.workshop_type),
        team_size: present(payload.team_size),
        preferred_dates: payload.preferred_dates.unwrap_or_default(),
        goals: payload.goals.unwrap_or_default(),
        message: present(payload.message),
    };

    let row = store
        .insert_workshop_signup(&new)
        .await
        .context("Failed to submit workshop signup")?;

    tracing::info!("Stored workshop signup {}", row.id);
    announce(store, notifier, LeadSummary::from(&row)).await;
    Ok(row)
}

pub async fn submit_blueprint_request(
    store: &dyn Store,
    notifier: Option<&LeadNotifier>,
    payload: BlueprintRequestPayload,
) -> Result<BlueprintRequest, AppError> {
    let (Some(company), Some(email)) = (present(payload.company), present(payload.email)) else {
        return Err(AppError::BadRequest(COMPANY_EMAIL_REQUIRED.to_string()));
    };

    let new = NewBlueprintRequest {
        company,
        email,
        name: present(payload.name),
        industry_segment: present(payload.industry_segment),
        facility_count: present(payload.facility_count),
        challenges: payload.challenges.unwrap_or_default(),
        priorities: payload.priorities.unwrap_or_default(),
        timeline: present(payload.timeline),
        budget: present(payload.budget),
    };

    let row = store
        .insert_blueprint_request(&new)
        .await
        .context("Failed to submit blueprint request")?;

    tracing::info!("Stored manufacturing blueprint request {}", row.id);
    announce(store, notifier, LeadSummary::from(&row)).await;
    Ok(row)
}
