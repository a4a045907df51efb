//! End-to-end scoring flows: auto-match, high-confidence suggestion, and
//! the deterministic-only fallback when a vector is missing.

mod common;

use common::spawn_app;

#[tokio::test]
async fn exact_pair_is_auto_matched() {
    let Some(app) = spawn_app().await else { return };

    let transaction = app
        .register_transaction("100.00", "EUR", "2024-01-10", Some("Coffee House"))
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
    assert_eq!(document.status, "new");

    let status = app.process_document(document.document_id).await;
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);

    let settled = app.wait_for_scoring(document.document_id).await;
    assert_eq!(settled.status, "done");
    assert_eq!(
        settled.matched_transaction_id,
        Some(transaction.transaction_id)
    );

    let suggestions = app.suggestions(document.document_id).await.suggestions;
    assert_eq!(suggestions.len(), 1);
    let suggestion = &suggestions[0];
    assert_eq!(suggestion.status, "confirmed");
    assert_eq!(suggestion.match_kind, "auto_matched");
    assert_eq!(suggestion.decided_by.as_deref(), Some("system:auto"));
    assert_eq!(suggestion.amount_score, Some(1.0));
    assert_eq!(suggestion.currency_score, Some(1.0));
    assert_eq!(suggestion.date_score, Some(1.0));
    assert!(suggestion.confidence >= 0.95);
}

#[tokio::test]
async fn amount_mismatch_yields_high_confidence_suggestion_not_auto_match() {
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
    let settled = app.wait_for_scoring(document.document_id).await;

    // A near-miss on the amount must keep a human in the loop.
    assert_eq!(settled.status, "suggested_match");
    assert_eq!(settled.matched_transaction_id, None);

    let suggestions = app.suggestions(document.document_id).await.suggestions;
    assert_eq!(suggestions.len(), 1);
    let suggestion = &suggestions[0];
    assert_eq!(suggestion.status, "pending");
    assert_eq!(suggestion.match_kind, "high_confidence");
    let amount_score = suggestion.amount_score.unwrap();
    assert!((amount_score - (1.0 - 10.0 / 90.0)).abs() < 1e-9);
}

#[tokio::test]
async fn candidate_without_vector_scores_on_deterministic_signals() {
    let Some(app) = spawn_app().await else { return };

    // No counterparty name: the transaction has no text to embed, so the
    // pair has no embedding score and no name score.
    let transaction = app
        .register_transaction("55.00", "EUR", "2024-03-01", None)
        .await;

    let document = app
        .register_document(
            "Parking receipt",
            Some("55.00"),
            Some("EUR"),
            Some("2024-03-01"),
            None,
        )
        .await;

    app.process_document(document.document_id).await;
    let settled = app.wait_for_scoring(document.document_id).await;

    // Found through the date/currency pre-filter alone; the remaining
    // signals are exact, so the pair still auto-matches.
    assert_eq!(settled.status, "done");
    assert_eq!(
        settled.matched_transaction_id,
        Some(transaction.transaction_id)
    );

    let suggestions = app.suggestions(document.document_id).await.suggestions;
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].embedding_score, None);
    assert_eq!(suggestions[0].name_score, None);
    assert_eq!(suggestions[0].amount_score, Some(1.0));
}

#[tokio::test]
async fn document_without_candidates_is_classified_no_match() {
    let Some(app) = spawn_app().await else { return };

    let document = app
        .register_document(
            "Unmatched receipt",
            Some("12.34"),
            Some("EUR"),
            Some("2024-06-15"),
            Some("Nowhere Ltd"),
        )
        .await;

    app.process_document(document.document_id).await;
    let settled = app.wait_for_scoring(document.document_id).await;

    assert_eq!(settled.status, "no_match");
    assert!(app
        .suggestions(document.document_id)
        .await
        .suggestions
        .is_empty());
}

#[tokio::test]
async fn far_amount_within_date_window_is_no_match() {
    let Some(app) = spawn_app().await else { return };

    // Inside the date window but a wildly different amount and name:
    // retrieved as a candidate, then classified below the suggestion
    // threshold.
    app.register_transaction(
        "9000.00",
        "EUR",
        "2024-06-20",
        Some("Steelworks Heavy Industries Aktiengesellschaft"),
    )
    .await;

    let document = app
        .register_document(
            "Lunch receipt",
            Some("12.00"),
            Some("EUR"),
            Some("2024-06-15"),
            Some("Corner Bistro"),
        )
        .await;

    app.process_document(document.document_id).await;
    let settled = app.wait_for_scoring(document.document_id).await;

    assert_eq!(settled.status, "no_match");
    assert!(app
        .suggestions(document.document_id)
        .await
        .suggestions
        .is_empty());
}
