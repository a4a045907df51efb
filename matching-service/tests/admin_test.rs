//! Administrative surface: bulk rescore and suggestion expiry.

mod common;

use common::spawn_app;
use matching_service::dtos::{ExpireResponse, RescoreResponse};
use serde_json::json;
use serial_test::serial;

// Expiry is a global sweep, so these tests cannot overlap.

#[tokio::test]
#[serial]
async fn bulk_rescore_reenqueues_scorable_documents() {
    let Some(app) = spawn_app().await else { return };

    app.register_transaction("90.00", "EUR", "2024-01-10", Some("Coffee House"))
        .await;
    let document = app
        .register_document(
            "Coffee House",
            Some("100.00"),
            Some("EUR"),
            Some("2024-01-10"),
            Some("Coffee House"),
        )
        .await;

    app.process_document(document.document_id).await;
    app.wait_for_scoring(document.document_id).await;

    let response = app
        .post("/admin/rescore", &json!({ "tenant_id": app.tenant_id }))
        .await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let rescore: RescoreResponse = response.json().await.unwrap();
    assert_eq!(rescore.enqueued, 1);

    // The rescore converges on the same single suggestion row.
    app.wait_for_scoring(document.document_id).await;
    let suggestions = app.suggestions(document.document_id).await.suggestions;
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].status, "pending");
}

#[tokio::test]
#[serial]
async fn expiry_retires_stale_pending_suggestions() {
    let Some(app) = spawn_app().await else { return };

    app.register_transaction("90.00", "EUR", "2024-01-10", Some("Coffee House"))
        .await;
    let document = app
        .register_document(
            "Coffee House",
            Some("100.00"),
            Some("EUR"),
            Some("2024-01-10"),
            Some("Coffee House"),
        )
        .await;

    app.process_document(document.document_id).await;
    app.wait_for_scoring(document.document_id).await;

    let response = app
        .post("/admin/suggestions/expire", &json!({ "older_than_days": 0 }))
        .await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let expired: ExpireResponse = response.json().await.unwrap();
    assert!(expired.expired >= 1);

    let suggestions = app.suggestions(document.document_id).await.suggestions;
    assert_eq!(suggestions[0].status, "expired");

    // A later rescore revives the expired suggestion.
    app.process_document(document.document_id).await;
    app.wait_for_scoring(document.document_id).await;
    let suggestions = app.suggestions(document.document_id).await.suggestions;
    assert_eq!(suggestions[0].status, "pending");
}

#[tokio::test]
async fn negative_expiry_window_is_rejected() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .post("/admin/suggestions/expire", &json!({ "older_than_days": -1 }))
        .await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
