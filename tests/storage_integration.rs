use std::env;
use uuid::Uuid;

use lead_capture_api::db::Database;
use lead_capture_api::export::{run_export_job, ExportStatus};
use lead_capture_api::models::{LeadKind, LeadStatus, NewSubscription, NewWorkshopSignup};
use lead_capture_api::store::{
    ExportRepository, LeadRepository, PgStore, StoreError, SubscriptionRepository,
};

async fn connect() -> anyhow::Result<PgStore> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url, 2).await?;
    db.migrate().await?;
    Ok(PgStore::new(db.pool.clone()))
}

/// Postgres smoke test for the newsletter unique key.
/// Marked ignored to avoid running against a shared database by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn subscription_email_is_unique_smoke_test() -> anyhow::Result<()> {
    let store = connect().await?;

    // Unique email so repeated runs do not collide
    let email = format!("smoke-{}@example.com", Uuid::new_v4());
    let new = NewSubscription {
        email: email.clone(),
        name: None,
        interests: vec!["ai".to_string()],
        source: Some("smoke-test".to_string()),
    };

    let created = store.insert_subscription(&new).await?;
    assert_eq!(created.email, email);
    assert!(created.is_active);

    match store.insert_subscription(&new).await {
        Err(StoreError::Duplicate(_)) => {}
        other => panic!("Expected duplicate error, got {:?}", other.map(|s| s.id)),
    }

    let updated = store
        .update_subscription(created.id, &["data".to_string()], true)
        .await?
        .ok_or_else(|| anyhow::anyhow!("subscription vanished"))?;
    assert_eq!(updated.interests, vec!["data".to_string()]);

    Ok(())
}

/// Postgres smoke test for the lead status compare-and-set and the export worker.
#[tokio::test]
#[ignore]
async fn workshop_transition_and_export_smoke_test() -> anyhow::Result<()> {
    let store = connect().await?;

    let signup = store
        .insert_workshop_signup(&NewWorkshopSignup {
            name: "Smoke Test".to_string(),
            email: format!("smoke-{}@example.com", Uuid::new_v4()),
            company: "Smoke Co".to_string(),
            job_title: None,
            workshop_type: Some("smoke".to_string()),
            team_size: None,
            preferred_dates: vec![],
            goals: vec![],
            message: None,
        })
        .await?;
    assert_eq!(signup.status, LeadStatus::Pending);

    let kind = LeadKind::WorkshopSignup;
    assert!(
        store
            .transition_lead_status(kind, signup.id, LeadStatus::Pending, LeadStatus::Approved)
            .await?
    );
    // Stale expectation loses
    assert!(
        !store
            .transition_lead_status(kind, signup.id, LeadStatus::Pending, LeadStatus::Rejected)
            .await?
    );
    assert_eq!(
        store.lead_status(kind, signup.id).await?,
        Some(LeadStatus::Approved)
    );

    let job = store.create_export_job(kind).await?;
    run_export_job(&store, job.id, kind).await;

    let job = store
        .get_export_job(job.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("export job vanished"))?;
    assert_eq!(job.status, ExportStatus::Completed);
    assert!(!store.claim_export_job(job.id).await?);

    let csv = store
        .export_artifact(job.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("artifact missing"))?;
    assert!(csv.contains(&signup.id.to_string()));

    Ok(())
}
