use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::borrow::Cow;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{text_enum, LeadKind, LeadSummary};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

text_enum!(ExportStatus, "export status", {
    Pending => "pending",
    Running => "running",
    Completed => "completed",
    Failed => "failed",
});

/// A persisted lead export. The CSV artifact is stored separately and is
/// only readable once the job has completed.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub kind: LeadKind,
    #[sqlx(try_from = "String")]
    pub status: ExportStatus,
    pub row_count: Option<i64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportAccepted {
    pub job_id: Uuid,
    pub status: ExportStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to render CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV output was not UTF-8")]
    Encoding,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    id: Uuid,
    kind: &'a str,
    name: Cow<'a, str>,
    email: Cow<'a, str>,
    company: Cow<'a, str>,
    status: &'a str,
    created_at: String,
}

/// Quotes a cell that a spreadsheet would otherwise evaluate as a formula.
fn neutralize_formula(cell: &str) -> Cow<'_, str> {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@') => Cow::Owned(format!("'{}", cell)),
        _ => Cow::Borrowed(cell),
    }
}

/// Renders lead summaries as CSV with a header row.
pub fn render_csv(leads: &[LeadSummary]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if leads.is_empty() {
        writer.write_record([
            "id",
            "kind",
            "name",
            "email",
            "company",
            "status",
            "created_at",
        ])?;
    }
    for lead in leads {
        writer.serialize(CsvRow {
            id: lead.id,
            kind: lead.kind.slug(),
            name: neutralize_formula(lead.name.as_deref().unwrap_or("")),
            email: neutralize_formula(&lead.email),
            company: neutralize_formula(&lead.company),
            status: lead.status.as_str(),
            created_at: lead.created_at.to_rfc3339(),
        })?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    String::from_utf8(bytes).map_err(|_| ExportError::Encoding)
}

/// Spawns the export worker for `job` (non-blocking).
///
/// The task owns its own handle on the store, so the job outlives the
/// request that created it:
/// 1. Claim the job (pending → running)
/// 2. Load lead summaries for the job's kind
/// 3. Render and store the CSV, mark completed
/// 4. On any error, mark failed with the message
pub fn spawn_export_job(store: Arc<dyn Store>, job: ExportJob) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run_export_job(store.as_ref(), job.id, job.kind).await;
    })
}

/// Runs one export job to completion.
pub async fn run_export_job(store: &dyn Store, job_id: Uuid, kind: LeadKind) {
    match store.claim_export_job(job_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("Export job {} was already claimed, skipping", job_id);
            return;
        }
        Err(e) => {
            tracing::error!("Failed to claim export job {}: {}", job_id, e);
            return;
        }
    }

    tracing::info!("Starting export job {} for {}", job_id, kind);

    let result: Result<(String, i64), ExportError> = async {
        let leads = store.lead_summaries(kind).await?;
        let csv = render_csv(&leads)?;
        Ok((csv, leads.len() as i64))
    }
    .await;

    match result {
        Ok((csv, rows)) => {
            if let Err(e) = store.complete_export_job(job_id, &csv, rows).await {
                tracing::error!("Failed to store export artifact for job {}: {}", job_id, e);
                if let Err(e) = store.fail_export_job(job_id, &e.to_string()).await {
                    tracing::error!("Failed to mark export job {} as failed: {}", job_id, e);
                }
                return;
            }
            tracing::info!("Export job {} completed ({} rows)", job_id, rows);
        }
        Err(e) => {
            tracing::error!("Export job {} failed: {}", job_id, e);
            if let Err(e) = store.fail_export_job(job_id, &e.to_string()).await {
                tracing::error!("Failed to mark export job {} as failed: {}", job_id, e);
            }
        }
    }
}
