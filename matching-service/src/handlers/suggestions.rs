use crate::dtos::{
    ConfirmRequest, DeclineRequest, SuggestionListResponse, SuggestionResponse,
};
use crate::middleware::TenantContext;
use crate::services::record_reconcile_action;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

pub async fn list_suggestions(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .db
        .get_document(tenant.tenant_id, document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;

    let suggestions = state
        .db
        .list_suggestions_for_document(tenant.tenant_id, document_id)
        .await?;

    Ok(Json(SuggestionListResponse {
        suggestions: suggestions.into_iter().map(SuggestionResponse::from).collect(),
    }))
}

/// Confirm the pairing of this document with one transaction. Competing
/// suggestions are superseded atomically; a concurrent confirmation for the
/// same document loses with a conflict and must re-fetch state.
pub async fn confirm_suggestion(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(document_id): Path<Uuid>,
    Json(request): Json<ConfirmRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .db
        .confirm_match(
            tenant.tenant_id,
            document_id,
            request.transaction_id,
            &tenant.user_id,
        )
        .await;

    match &result {
        Ok(_) => record_reconcile_action("confirm", "ok"),
        Err(AppError::Conflict(_)) => record_reconcile_action("confirm", "conflict"),
        Err(_) => record_reconcile_action("confirm", "error"),
    }

    Ok(Json(SuggestionResponse::from(result?)))
}

pub async fn decline_suggestion(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(document_id): Path<Uuid>,
    Json(request): Json<DeclineRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .db
        .decline_suggestion(
            tenant.tenant_id,
            document_id,
            request.suggestion_id,
            &tenant.user_id,
        )
        .await;

    match &result {
        Ok(_) => record_reconcile_action("decline", "ok"),
        Err(AppError::Conflict(_)) => record_reconcile_action("decline", "conflict"),
        Err(_) => record_reconcile_action("decline", "error"),
    }

    Ok(Json(SuggestionResponse::from(result?)))
}
