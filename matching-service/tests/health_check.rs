//! Health, readiness and metrics endpoints.

mod common;

use common::spawn_app;

#[tokio::test]
async fn health_check_works() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "matching-service");
}

#[tokio::test]
async fn readiness_check_works() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .get(app.url("/ready"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_text() {
    let Some(app) = spawn_app().await else { return };

    // Generate some traffic so counters exist.
    app.register_document("Metrics probe", None, None, None, None)
        .await;

    let response = app
        .client
        .get(app.url("/metrics"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("matching_db_query_duration_seconds"));
}
