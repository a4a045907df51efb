//! Back-office operations. These are not tenant-header-scoped: they take
//! the target tenant explicitly and are expected to be routed only to
//! operators by the gateway.

use crate::dtos::{ExpireRequest, ExpireResponse, RescoreRequest, RescoreResponse};
use crate::startup::AppState;
use crate::workers::ScoringJob;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::{Duration, Utc};
use service_core::error::AppError;

/// Bulk re-enqueue of every scorable document of a tenant, e.g. after an
/// embedding model upgrade. Re-scoring supersedes stale pending suggestions
/// through the idempotent upsert.
pub async fn rescore_tenant(
    State(state): State<AppState>,
    Json(request): Json<RescoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    let document_ids = state.db.list_scorable_documents(request.tenant_id).await?;

    let mut enqueued = 0;
    for document_id in document_ids {
        let job = ScoringJob {
            tenant_id: request.tenant_id,
            document_id,
        };
        state.job_tx.send(job).await.map_err(|_| {
            AppError::InternalError(anyhow::anyhow!("Worker queue is unavailable"))
        })?;
        enqueued += 1;
    }

    tracing::info!(
        tenant_id = %request.tenant_id,
        enqueued = enqueued,
        "Bulk rescore enqueued"
    );

    Ok(Json(RescoreResponse { enqueued }))
}

/// Bulk-transition stale pending suggestions to expired.
pub async fn expire_suggestions(
    State(state): State<AppState>,
    Json(request): Json<ExpireRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.older_than_days < 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "older_than_days must not be negative"
        )));
    }

    let older_than = Utc::now() - Duration::days(request.older_than_days);
    let expired = state.db.expire_suggestions(older_than).await?;

    tracing::info!(expired = expired, "Stale suggestions expired");

    Ok(Json(ExpireResponse { expired }))
}
