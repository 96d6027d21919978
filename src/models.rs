use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============ Lead Status ============

/// Server-assigned lifecycle status shared by every lead-capture record.
///
/// Transitions only move forward; `Rejected` and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Pending,
    New,
    Active,
    Approved,
    Rejected,
    Completed,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Pending => "pending",
            LeadStatus::New => "new",
            LeadStatus::Active => "active",
            LeadStatus::Approved => "approved",
            LeadStatus::Rejected => "rejected",
            LeadStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadStatus::Rejected | LeadStatus::Completed)
    }

    /// Whether an administrative action may move a record from `self` to `next`.
    pub fn can_transition_to(&self, next: LeadStatus) -> bool {
        use LeadStatus::*;
        matches!(
            (self, next),
            (Pending | New, Active | Approved | Rejected)
                | (Active, Completed | Rejected)
                | (Approved, Completed)
        )
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored or submitted string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl FromStr for LeadStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LeadStatus::Pending),
            "new" => Ok(LeadStatus::New),
            "active" => Ok(LeadStatus::Active),
            "approved" => Ok(LeadStatus::Approved),
            "rejected" => Ok(LeadStatus::Rejected),
            "completed" => Ok(LeadStatus::Completed),
            other => Err(UnknownVariant::new("lead status", other)),
        }
    }
}

impl TryFrom<String> for LeadStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Implements `as_str`, `FromStr` and `TryFrom<String>` for a text-backed enum.
macro_rules! text_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, $crate::models::UnknownVariant> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::models::UnknownVariant::new($label, other)),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::models::UnknownVariant;

            fn try_from(value: String) -> Result<Self, $crate::models::UnknownVariant> {
                value.parse()
            }
        }
    };
}

pub(crate) use text_enum;

// ============ Lead Kinds ============

/// The lead-capture forms that carry a status and can be exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadKind {
    #[serde(rename = "demo-requests")]
    DemoRequest,
    #[serde(rename = "quick-start")]
    QuickStart,
    #[serde(rename = "workshop-signups")]
    WorkshopSignup,
    #[serde(rename = "blueprint-requests")]
    BlueprintRequest,
}

impl LeadKind {
    pub const ALL: [LeadKind; 4] = [
        LeadKind::DemoRequest,
        LeadKind::QuickStart,
        LeadKind::WorkshopSignup,
        LeadKind::BlueprintRequest,
    ];

    /// Path segment and export label.
    pub fn slug(&self) -> &'static str {
        match self {
            LeadKind::DemoRequest => "demo-requests",
            LeadKind::QuickStart => "quick-start",
            LeadKind::WorkshopSignup => "workshop-signups",
            LeadKind::BlueprintRequest => "blueprint-requests",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            LeadKind::DemoRequest => "demo_requests",
            LeadKind::QuickStart => "quick_start_assessments",
            LeadKind::WorkshopSignup => "workshop_signups",
            LeadKind::BlueprintRequest => "manufacturing_blueprint_requests",
        }
    }

    /// Status assigned when a record of this kind is created.
    pub fn initial_status(&self) -> LeadStatus {
        match self {
            LeadKind::DemoRequest => LeadStatus::New,
            _ => LeadStatus::Pending,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LeadKind::DemoRequest => "demo request",
            LeadKind::QuickStart => "quick start assessment",
            LeadKind::WorkshopSignup => "workshop signup",
            LeadKind::BlueprintRequest => "manufacturing blueprint request",
        }
    }
}

impl fmt::Display for LeadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for LeadKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| UnknownVariant::new("lead kind", s))
    }
}

impl TryFrom<String> for LeadKind {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============ Database Models ============

/// A newsletter subscriber; one row per normalized email.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NewsletterSubscription {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub interests: Vec<String>,
    pub is_active: bool,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DemoRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub interests: Vec<String>,
    pub message: Option<String>,
    pub preferred_date: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuickStartAssessment {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: String,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub timeline: Option<String>,
    pub budget: Option<String>,
    pub goals: Vec<String>,
    pub pain_points: Vec<String>,
    pub current_ai_usage: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WorkshopSignup {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: String,
    pub job_title: Option<String>,
    pub workshop_type: Option<String>,
    pub team_size: Option<String>,
    pub preferred_dates: Vec<String>,
    pub goals: Vec<String>,
    pub message: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BlueprintRequest {
    pub id: Uuid,
    pub company: String,
    pub email: String,
    pub name: Option<String>,
    pub industry_segment: Option<String>,
    pub facility_count: Option<String>,
    pub challenges: Vec<String>,
    pub priorities: Vec<String>,
    pub timeline: Option<String>,
    pub budget: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

/// Kind-independent projection of a lead, used by exports and notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSummary {
    pub id: Uuid,
    pub kind: LeadKind,
    pub name: Option<String>,
    pub email: String,
    pub company: String,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&DemoRequest> for LeadSummary {
    fn from(r: &DemoRequest) -> Self {
        Self {
            id: r.id,
            kind: LeadKind::DemoRequest,
            name: Some(r.name.clone()),
            email: r.email.clone(),
            company: r.company.clone(),
            status: r.status,
            created_at: r.created_at,
        }
    }
}

impl From<&QuickStartAssessment> for LeadSummary {
    fn from(r: &QuickStartAssessment) -> Self {
        Self {
            id: r.id,
            kind: LeadKind::QuickStart,
            name: Some(r.name.clone()),
            email: r.email.clone(),
            company: r.company.clone(),
            status: r.status,
            created_at: r.created_at,
        }
    }
}

impl From<&WorkshopSignup> for LeadSummary {
    fn from(r: &WorkshopSignup) -> Self {
        Self {
            id: r.id,
            kind: LeadKind::WorkshopSignup,
            name: Some(r.name.clone()),
            email: r.email.clone(),
            company: r.company.clone(),
            status: r.status,
            created_at: r.created_at,
        }
    }
}

impl From<&BlueprintRequest> for LeadSummary {
    fn from(r: &BlueprintRequest) -> Self {
        Self {
            id: r.id,
            kind: LeadKind::BlueprintRequest,
            name: r.name.clone(),
            email: r.email.clone(),
            company: r.company.clone(),
            status: r.status,
            created_at: r.created_at,
        }
    }
}

/// Filters accepted by the workshop signup listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkshopSignupFilter {
    pub status: Option<LeadStatus>,
    #[serde(rename = "type")]
    pub workshop_type: Option<String>,
}

// ============ Insert Models ============
// Validated, normalized values ready for the store.

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub email: String,
    pub name: Option<String>,
    pub interests: Vec<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDemoRequest {
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub interests: Vec<String>,
    pub message: Option<String>,
    pub preferred_date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewQuickStart {
    pub name: String,
    pub email: String,
    pub company: String,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub timeline: Option<String>,
    pub budget: Option<String>,
    pub goals: Vec<String>,
    pub pain_points: Vec<String>,
    pub current_ai_usage: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewWorkshopSignup {
    pub name: String,
    pub email: String,
    pub company: String,
    pub job_title: Option<String>,
    pub workshop_type: Option<String>,
    pub team_size: Option<String>,
    pub preferred_dates: Vec<String>,
    pub goals: Vec<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBlueprintRequest {
    pub company: String,
    pub email: String,
    pub name: Option<String>,
    pub industry_segment: Option<String>,
    pub facility_count: Option<String>,
    pub challenges: Vec<String>,
    pub priorities: Vec<String>,
    pub timeline: Option<String>,
    pub budget: Option<String>,
}

// ============ API Request Models ============
// Every field is optional so that presence checks produce the form's own
// 400 message instead of a deserialization rejection.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterPayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub interests: Option<Vec<String>>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoRequestPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "job_title")]
    pub job_title: Option<String>,
    #[serde(default, alias = "company_size")]
    pub company_size: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub interests: Option<Vec<String>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "preferred_date")]
    pub preferred_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStartPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default, alias = "company_size")]
    pub company_size: Option<String>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub goals: Option<Vec<String>>,
    #[serde(default, alias = "pain_points")]
    pub pain_points: Option<Vec<String>>,
    #[serde(default, alias = "current_ai_usage")]
    pub current_ai_usage: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopSignupPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default, alias = "job_title")]
    pub job_title: Option<String>,
    #[serde(default, alias = "workshop_type")]
    pub workshop_type: Option<String>,
    #[serde(default, alias = "team_size")]
    pub team_size: Option<String>,
    #[serde(default, alias = "preferred_dates")]
    pub preferred_dates: Option<Vec<String>>,
    #[serde(default)]
    pub goals: Option<Vec<String>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintRequestPayload {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "industry_segment")]
    pub industry_segment: Option<String>,
    #[serde(default, alias = "facility_count")]
    pub facility_count: Option<String>,
    #[serde(default)]
    pub challenges: Option<Vec<String>>,
    #[serde(default)]
    pub priorities: Option<Vec<String>>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
}

// ============ API Response Models ============

#[derive(Debug, Serialize)]
pub struct NewsletterResponse {
    pub message: String,
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DemoRequestResponse {
    pub message: String,
    pub data: DemoRequest,
}

#[derive(Debug, Serialize)]
pub struct QuickStartResponse {
    pub message: String,
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct WorkshopSignupResponse {
    pub success: bool,
    pub message: String,
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct WorkshopSignupList {
    pub signups: Vec<WorkshopSignup>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintRequestResponse {
    pub success: bool,
    pub message: String,
    pub request_id: Uuid,
}
