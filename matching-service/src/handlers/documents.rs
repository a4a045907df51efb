use crate::dtos::{DocumentResponse, RegisterDocumentRequest};
use crate::middleware::TenantContext;
use crate::models::DocumentStatus;
use crate::startup::AppState;
use crate::workers::ScoringJob;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

const SCORABLE_STATUSES: [DocumentStatus; 6] = [
    DocumentStatus::New,
    DocumentStatus::Processing,
    DocumentStatus::Analyzing,
    DocumentStatus::Pending,
    DocumentStatus::SuggestedMatch,
    DocumentStatus::NoMatch,
];

pub async fn register_document(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(request): Json<RegisterDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let document = state
        .db
        .create_document(
            tenant.tenant_id,
            &request.display_name,
            request.amount,
            request.currency.as_deref(),
            request.document_date,
            request.description.as_deref(),
            request.counterparty_name.as_deref(),
        )
        .await?;

    tracing::info!(
        document_id = %document.document_id,
        display_name = %document.display_name,
        "Inbox document registered"
    );

    Ok((StatusCode::CREATED, Json(DocumentResponse::from(document))))
}

pub async fn get_document(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let document = state
        .db
        .get_document(tenant.tenant_id, document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;

    Ok(Json(DocumentResponse::from(document)))
}

/// Enqueue a scoring run. Scoring is asynchronous; poll the suggestions
/// endpoint (or the document status) for the outcome.
pub async fn process_document(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let document = state
        .db
        .transition_document(
            tenant.tenant_id,
            document_id,
            &SCORABLE_STATUSES,
            DocumentStatus::Processing,
        )
        .await?;

    if document.is_none() {
        // Distinguish a missing document from one that cannot be rescored.
        return match state.db.get_document(tenant.tenant_id, document_id).await? {
            Some(existing) => Err(AppError::Conflict(anyhow::anyhow!(
                "Document can no longer be scored (status: {})",
                existing.status
            ))),
            None => Err(AppError::NotFound(anyhow::anyhow!("Document not found"))),
        };
    }

    let job = ScoringJob {
        tenant_id: tenant.tenant_id,
        document_id,
    };

    state.job_tx.send(job).await.map_err(|_| {
        tracing::error!(document_id = %document_id, "Failed to enqueue scoring job");
        AppError::InternalError(anyhow::anyhow!("Worker queue is unavailable"))
    })?;

    tracing::info!(document_id = %document_id, "Scoring job enqueued");

    Ok(StatusCode::ACCEPTED)
}

pub async fn archive_document(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let allowed = [
        DocumentStatus::New,
        DocumentStatus::Processing,
        DocumentStatus::Analyzing,
        DocumentStatus::Pending,
        DocumentStatus::SuggestedMatch,
        DocumentStatus::NoMatch,
        DocumentStatus::Done,
    ];

    let document = state
        .db
        .transition_document(
            tenant.tenant_id,
            document_id,
            &allowed,
            DocumentStatus::Archived,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found or not archivable")))?;

    Ok(Json(DocumentResponse::from(document)))
}

pub async fn delete_document(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let allowed = [
        DocumentStatus::New,
        DocumentStatus::Processing,
        DocumentStatus::Analyzing,
        DocumentStatus::Pending,
        DocumentStatus::SuggestedMatch,
        DocumentStatus::NoMatch,
        DocumentStatus::Archived,
    ];

    let document = state
        .db
        .transition_document(
            tenant.tenant_id,
            document_id,
            &allowed,
            DocumentStatus::Deleted,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found or not deletable")))?;

    Ok(Json(DocumentResponse::from(document)))
}
