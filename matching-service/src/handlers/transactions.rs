use crate::dtos::{RegisterTransactionRequest, TransactionResponse};
use crate::middleware::TenantContext;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

pub async fn register_transaction(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(request): Json<RegisterTransactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let transaction = state
        .db
        .create_transaction(
            tenant.tenant_id,
            request.amount,
            &request.currency,
            request.transaction_date,
            request.counterparty_name.as_deref(),
        )
        .await?;

    // Best-effort: a transaction without a vector still matches through the
    // deterministic candidate path.
    state.engine.embed_transaction(&transaction).await;

    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse::from(transaction)),
    ))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transaction = state
        .db
        .get_transaction(tenant.tenant_id, transaction_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Transaction not found")))?;

    Ok(Json(TransactionResponse::from(transaction)))
}
