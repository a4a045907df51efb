//! Suggestion lifecycle: competing candidates, user override, decline, and
//! idempotent rescoring.

mod common;

use common::{spawn_app, TestApp};
use matching_service::dtos::SuggestionResponse;
use serde_json::json;
use uuid::Uuid;

/// Two competing candidates for one document, neither auto-matchable.
/// Returns (document_id, leading suggestion, runner-up suggestion).
async fn scored_document_with_two_candidates(
    app: &TestApp,
) -> (Uuid, SuggestionResponse, SuggestionResponse) {
    app.register_transaction("95.00", "EUR", "2024-01-10", Some("Coffee House"))
        .await;
    app.register_transaction("70.00", "EUR", "2024-01-10", Some("Coffee House"))
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
    let settled = app.wait_for_scoring(document.document_id).await;
    assert_eq!(settled.status, "suggested_match");

    let suggestions = app.suggestions(document.document_id).await.suggestions;
    assert_eq!(suggestions.len(), 2);
    assert!(suggestions[0].confidence > suggestions[1].confidence);
    assert!(suggestions.iter().all(|s| s.status == "pending"));

    let mut iter = suggestions.into_iter();
    let leading = iter.next().unwrap();
    let runner_up = iter.next().unwrap();
    (document.document_id, leading, runner_up)
}

#[tokio::test]
async fn confirming_the_runner_up_supersedes_the_leading_suggestion() {
    let Some(app) = spawn_app().await else { return };

    let (document_id, leading, runner_up) = scored_document_with_two_candidates(&app).await;

    // The user overrides the engine's ranking.
    let response = app
        .post(
            &format!("/documents/{}/confirm", document_id),
            &json!({ "transaction_id": runner_up.transaction_id }),
        )
        .await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let confirmed: SuggestionResponse = response.json().await.unwrap();
    assert_eq!(confirmed.status, "confirmed");
    assert_eq!(confirmed.decided_by.as_deref(), Some("test-user"));

    let suggestions = app.suggestions(document_id).await.suggestions;
    let confirmed_count = suggestions.iter().filter(|s| s.status == "confirmed").count();
    assert_eq!(confirmed_count, 1);
    let superseded = suggestions
        .iter()
        .find(|s| s.suggestion_id == leading.suggestion_id)
        .unwrap();
    assert_eq!(superseded.status, "unmatched");

    let response = app.get(&format!("/documents/{}", document_id)).await;
    let document: matching_service::dtos::DocumentResponse = response.json().await.unwrap();
    assert_eq!(document.status, "done");
    assert_eq!(
        document.matched_transaction_id,
        Some(runner_up.transaction_id)
    );
}

#[tokio::test]
async fn second_confirmation_for_the_same_document_conflicts() {
    let Some(app) = spawn_app().await else { return };

    let (document_id, leading, runner_up) = scored_document_with_two_candidates(&app).await;

    let response = app
        .post(
            &format!("/documents/{}/confirm", document_id),
            &json!({ "transaction_id": leading.transaction_id }),
        )
        .await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    // The loser must see a conflict, not a silent success.
    let response = app
        .post(
            &format!("/documents/{}/confirm", document_id),
            &json!({ "transaction_id": runner_up.transaction_id }),
        )
        .await;
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn declining_leaves_the_document_and_other_suggestions_open() {
    let Some(app) = spawn_app().await else { return };

    let (document_id, leading, runner_up) = scored_document_with_two_candidates(&app).await;

    let response = app
        .post(
            &format!("/documents/{}/decline", document_id),
            &json!({ "suggestion_id": leading.suggestion_id }),
        )
        .await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let declined: SuggestionResponse = response.json().await.unwrap();
    assert_eq!(declined.status, "declined");

    // The document stays open and the other candidate stays actionable.
    let response = app.get(&format!("/documents/{}", document_id)).await;
    let document: matching_service::dtos::DocumentResponse = response.json().await.unwrap();
    assert_eq!(document.status, "suggested_match");
    assert_eq!(document.matched_transaction_id, None);

    let suggestions = app.suggestions(document_id).await.suggestions;
    let open = suggestions
        .iter()
        .find(|s| s.suggestion_id == runner_up.suggestion_id)
        .unwrap();
    assert_eq!(open.status, "pending");

    // Declining twice conflicts.
    let response = app
        .post(
            &format!("/documents/{}/decline", document_id),
            &json!({ "suggestion_id": leading.suggestion_id }),
        )
        .await;
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn rescoring_updates_the_same_row_instead_of_duplicating() {
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
    let first = app.suggestions(document.document_id).await.suggestions;
    assert_eq!(first.len(), 1);

    // Second run with unchanged inputs: same pair, same row, same scores.
    app.process_document(document.document_id).await;
    app.wait_for_scoring(document.document_id).await;
    let second = app.suggestions(document.document_id).await.suggestions;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].suggestion_id, first[0].suggestion_id);
    assert_eq!(second[0].confidence, first[0].confidence);
    assert_eq!(second[0].match_kind, first[0].match_kind);
}

#[tokio::test]
async fn confirming_an_unknown_pair_is_not_found() {
    let Some(app) = spawn_app().await else { return };

    let document = app
        .register_document(
            "Lone receipt",
            Some("10.00"),
            Some("EUR"),
            Some("2024-01-10"),
            None,
        )
        .await;

    let response = app
        .post(
            &format!("/documents/{}/confirm", document.document_id),
            &json!({ "transaction_id": Uuid::new_v4() }),
        )
        .await;
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
