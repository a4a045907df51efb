//! Prometheus metrics for matching-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Histogram for database query duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "matching_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for scoring runs by outcome.
pub static SCORING_RUNS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "matching_scoring_runs_total",
        "Total number of document scoring runs",
        &["status"]
    )
    .expect("Failed to register SCORING_RUNS")
});

/// Counter for match decisions by classification.
pub static MATCH_DECISIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "matching_decisions_total",
        "Total number of candidate classifications",
        &["match_kind"]
    )
    .expect("Failed to register MATCH_DECISIONS")
});

/// Counter for embedding provider calls.
pub static EMBEDDING_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "matching_embedding_requests_total",
        "Total number of embedding provider calls",
        &["provider", "status"]
    )
    .expect("Failed to register EMBEDDING_REQUESTS")
});

/// Counter for reconciliation actions (confirm/decline/expire).
pub static RECONCILE_ACTIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "matching_reconcile_actions_total",
        "Total number of reconciliation actions",
        &["action", "status"]
    )
    .expect("Failed to register RECONCILE_ACTIONS")
});

/// Counter for degraded retrieval runs (index timeout or failure).
pub static RETRIEVAL_FALLBACKS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "matching_retrieval_fallbacks_total",
        "Candidate retrievals that fell back to the deterministic filter",
        &["reason"]
    )
    .expect("Failed to register RETRIEVAL_FALLBACKS")
});

/// Counter for errors.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "matching_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&SCORING_RUNS);
    Lazy::force(&MATCH_DECISIONS);
    Lazy::force(&EMBEDDING_REQUESTS);
    Lazy::force(&RECONCILE_ACTIONS);
    Lazy::force(&RETRIEVAL_FALLBACKS);
    Lazy::force(&ERRORS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Record a scoring run outcome.
pub fn record_scoring_run(status: &str) {
    SCORING_RUNS.with_label_values(&[status]).inc();
}

/// Record a candidate classification.
pub fn record_match_decision(match_kind: &str) {
    MATCH_DECISIONS.with_label_values(&[match_kind]).inc();
}

/// Record an embedding provider call.
pub fn record_embedding_request(provider: &str, status: &str) {
    EMBEDDING_REQUESTS
        .with_label_values(&[provider, status])
        .inc();
}

/// Record a reconciliation action.
pub fn record_reconcile_action(action: &str, status: &str) {
    RECONCILE_ACTIONS.with_label_values(&[action, status]).inc();
}

/// Record a retrieval fallback.
pub fn record_retrieval_fallback(reason: &str) {
    RETRIEVAL_FALLBACKS.with_label_values(&[reason]).inc();
}

/// Record an error.
pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
