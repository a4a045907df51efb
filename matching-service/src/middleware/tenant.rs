//! Tenant context extractor for multi-tenancy support.
//!
//! Tenant and user identity arrive as headers set by the upstream gateway
//! after it has authenticated the caller and validated tenant membership.
//! Every data access below this point is scoped by the extracted tenant id;
//! requests without one never reach a handler.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

/// Tenant context extracted from request headers.
#[derive(Debug, Clone)]
pub struct TenantContext {
    /// Tenant (organization) the request is scoped to.
    pub tenant_id: Uuid,
    /// User who is making the request; recorded on reconciliation actions.
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = parts
            .headers
            .get("X-Tenant-ID")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::AuthError(anyhow::anyhow!(
                    "Missing X-Tenant-ID header (required from gateway)"
                ))
            })?;

        let tenant_id = Uuid::parse_str(tenant_id)
            .map_err(|_| AppError::AuthError(anyhow::anyhow!("Invalid X-Tenant-ID header")))?;

        let user_id = parts
            .headers
            .get("X-User-ID")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::AuthError(anyhow::anyhow!(
                    "Missing X-User-ID header (required from gateway)"
                ))
            })?;

        let span = tracing::Span::current();
        span.record("tenant_id", tenant_id.to_string().as_str());
        span.record("user_id", user_id);

        Ok(TenantContext {
            tenant_id,
            user_id: user_id.to_string(),
        })
    }
}
