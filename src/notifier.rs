use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::models::{LeadKind, LeadSummary};

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("failed to build webhook client: {0}")]
    Client(reqwest::Error),
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Payload POSTed to the lead webhook for every captured lead.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadEvent {
    pub event: &'static str,
    pub kind: LeadKind,
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub company: String,
    pub created_at: DateTime<Utc>,
}

impl From<&LeadSummary> for LeadEvent {
    fn from(lead: &LeadSummary) -> Self {
        Self {
            event: "lead.created",
            kind: lead.kind,
            id: lead.id,
            name: lead.name.clone(),
            email: lead.email.clone(),
            company: lead.company.clone(),
            created_at: lead.created_at,
        }
    }
}

/// Outbound webhook for new leads.
#[derive(Clone)]
pub struct LeadNotifier {
    client: reqwest::Client,
    url: String,
}

impl LeadNotifier {
    /// Creates a notifier posting to `url`.
    pub fn new(url: String) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(NotifierError::Client)?;

        Ok(Self { client, url })
    }

    /// Delivers one event. Any non-2xx answer is an error.
    pub async fn send(&self, event: &LeadEvent) -> Result<(), NotifierError> {
        tracing::debug!("Sending {} event for {} {}", event.event, event.kind, event.id);

        let response = self.client.post(&self.url).json(event).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotifierError::Status { status, body });
        }

        Ok(())
    }

    /// Sends `event` in the background; failures are only logged.
    pub fn spawn_send(&self, event: LeadEvent) -> tokio::task::JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&event).await {
                tracing::warn!("Lead webhook for {} {} failed: {}", event.kind, event.id, e);
            }
        })
    }
}
