//! Router-level tests for the public capture endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

use common::{app_with, empty_request, extract_json, json_request};
use lead_capture_api::capture::subscribe;
use lead_capture_api::models::{LeadKind, NewsletterPayload};
use lead_capture_api::store::{LeadRepository, MemoryStore};
use lead_capture_api::MAX_BODY_BYTES;

const CAPTURE_ROUTES: [(&str, &str); 5] = [
    ("/api/newsletter", "Email is required"),
    ("/api/demo-request", "Name, email, and company are required"),
    ("/api/quick-start", "Name, email, and company are required"),
    ("/api/workshop-signup", "Name, email, and company are required"),
    ("/api/manufacturing-blueprint", "Company and email are required"),
];

fn complete_body() -> serde_json::Value {
    json!({"name": "Jane", "email": "jane@x.com", "company": "Acme"})
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app_with(Arc::new(MemoryStore::new()));

    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "lead-capture-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_quick_start_success() {
    let store = Arc::new(MemoryStore::new());
    let app = app_with(Arc::clone(&store));

    let response = app
        .oneshot(json_request("POST", "/api/quick-start", complete_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], "Quick start assessment submitted successfully");
    assert!(body["id"].as_str().is_some());
    let leads = store.lead_summaries(LeadKind::QuickStart).await.unwrap();
    assert_eq!(leads.len(), 1);
}

#[tokio::test]
async fn test_demo_request_empty_body() {
    let app = app_with(Arc::new(MemoryStore::new()));

    let response = app
        .oneshot(json_request("POST", "/api/demo-request", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Name, email, and company are required");
}

#[tokio::test]
async fn test_demo_request_echoes_record() {
    let app = app_with(Arc::new(MemoryStore::new()));

    let mut payload = complete_body();
    payload["jobTitle"] = json!("CTO");
    payload["interests"] = json!(["ai", "automation"]);

    let response = app
        .oneshot(json_request("POST", "/api/demo-request", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], "Demo request submitted successfully");
    assert_eq!(body["data"]["status"], "new");
    assert_eq!(body["data"]["job_title"], "CTO");
    assert_eq!(body["data"]["interests"], json!(["ai", "automation"]));
}

#[tokio::test]
async fn test_missing_required_fields_never_reach_store() {
    // An unavailable store would turn any store call into a 500
    let store = Arc::new(MemoryStore::unavailable());

    for (route, message) in CAPTURE_ROUTES {
        let app = app_with(Arc::clone(&store));
        let response = app
            .oneshot(json_request("POST", route, json!({"name": "Jane"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", route);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"], message, "{}", route);
    }
}

#[tokio::test]
async fn test_blank_fields_count_as_missing() {
    let app = app_with(Arc::new(MemoryStore::new()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/manufacturing-blueprint",
            json!({"company": "   ", "email": "ops@acme.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_failure_returns_500_with_message() {
    let store = Arc::new(MemoryStore::unavailable());

    for (route, _) in CAPTURE_ROUTES {
        let app = app_with(Arc::clone(&store));
        let response = app
            .oneshot(json_request("POST", route, complete_body()))
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "{}",
            route
        );
        let body = extract_json(response.into_body()).await;
        let error = body["error"].as_str().unwrap_or_default();
        assert!(error.starts_with("Failed to"), "{}: {}", route, error);
    }
}

#[tokio::test]
async fn test_workshop_listing_failure_returns_500() {
    let app = app_with(Arc::new(MemoryStore::unavailable()));

    let response = app
        .oneshot(empty_request("GET", "/api/workshop-signup"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Failed to fetch workshop signups");
}

#[tokio::test]
async fn test_newsletter_upsert_keeps_one_record() {
    let store = Arc::new(MemoryStore::new());

    let first = app_with(Arc::clone(&store))
        .oneshot(json_request(
            "POST",
            "/api/newsletter",
            json!({"email": "Reader@Example.com", "interests": ["ai"]}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = extract_json(first.into_body()).await;
    assert_eq!(first["message"], "Successfully subscribed to newsletter");

    let second = app_with(Arc::clone(&store))
        .oneshot(json_request(
            "POST",
            "/api/newsletter",
            json!({"email": " reader@example.com", "interests": ["data"]}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second = extract_json(second.into_body()).await;
    assert_eq!(second["message"], "Subscription updated successfully");
    assert_eq!(second["id"], first["id"]);

    assert_eq!(store.subscription_count().await, 1);
}

#[tokio::test]
async fn test_workshop_signup_then_filtered_listing() {
    let store = Arc::new(MemoryStore::new());

    for workshop_type in ["genai-foundations", "mlops", "genai-foundations"] {
        let mut payload = complete_body();
        payload["workshopType"] = json!(workshop_type);
        let response = app_with(Arc::clone(&store))
            .oneshot(json_request("POST", "/api/workshop-signup", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = extract_json(response.into_body()).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Workshop signup submitted successfully");
    }

    let response = app_with(Arc::clone(&store))
        .oneshot(empty_request(
            "GET",
            "/api/workshop-signup?type=genai-foundations&status=pending",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let signups = body["signups"].as_array().unwrap();
    assert_eq!(signups.len(), 2);
    assert!(signups
        .iter()
        .all(|s| s["workshop_type"] == "genai-foundations" && s["status"] == "pending"));

    let response = app_with(store)
        .oneshot(empty_request("GET", "/api/workshop-signup?status=approved"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert!(body["signups"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_blueprint_request_returns_request_id() {
    let app = app_with(Arc::new(MemoryStore::new()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/manufacturing-blueprint",
            json!({
                "company": "Acme Metals",
                "email": "ops@acme.com",
                "industrySegment": "metals",
                "challenges": ["downtime"]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Blueprint request submitted successfully");
    assert!(body["requestId"].as_str().is_some());
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = app_with(Arc::new(MemoryStore::new()));

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/quick-start")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"name\": "))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_mistyped_field_is_json_bad_request() {
    let app = app_with(Arc::new(MemoryStore::new()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/quick-start",
            json!({"name": 123, "email": "jane@x.com", "company": "Acme"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn test_null_list_fields_are_accepted() {
    let store = Arc::new(MemoryStore::new());

    let response = app_with(Arc::clone(&store))
        .oneshot(json_request(
            "POST",
            "/api/demo-request",
            json!({
                "name": "Jane",
                "email": "jane@x.com",
                "company": "Acme",
                "interests": null
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let leads = store.lead_summaries(LeadKind::DemoRequest).await.unwrap();
    assert_eq!(leads.len(), 1);
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let app = app_with(Arc::new(MemoryStore::new()));

    let oversized = vec![b' '; MAX_BODY_BYTES + 1];
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/newsletter")
        .header("content-type", "application/json")
        .header("content-length", oversized.len())
        .body(axum::body::Body::from(oversized))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_subscribe_keeps_one_row() {
    for round in 0..8 {
        let store = Arc::new(MemoryStore::new());
        let email = format!("race-{}@example.com", round);

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                let email = if i % 2 == 0 { email.to_uppercase() } else { email.clone() };
                tokio::spawn(async move {
                    subscribe(
                        store.as_ref(),
                        NewsletterPayload {
                            email: Some(email),
                            name: None,
                            interests: Some(vec![format!("topic-{}", i)]),
                            source: None,
                        },
                    )
                    .await
                })
            })
            .collect();

        for task in tasks {
            let outcome = task.await.unwrap();
            assert!(outcome.is_ok(), "round {}: {:?}", round, outcome.err());
        }
        assert_eq!(store.subscription_count().await, 1, "round {}", round);
    }
}

#[tokio::test]
async fn test_capture_creates_dashboard_notification() {
    let store = Arc::new(MemoryStore::new());

    app_with(Arc::clone(&store))
        .oneshot(json_request("POST", "/api/demo-request", complete_body()))
        .await
        .unwrap();

    let response = app_with(store)
        .oneshot(empty_request("GET", "/api/dashboard/notifications?unread=true"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let notifications = body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["title"], "New demo request");
    assert_eq!(notifications[0]["message"], "Jane from Acme");
}
