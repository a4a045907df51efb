use crate::models::InboxDocument;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Extracted fields of an inbound document. Partial extraction is expected:
/// everything except the display name may be absent.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDocumentRequest {
    #[validate(length(min = 1, max = 512))]
    pub display_name: String,
    pub amount: Option<Decimal>,
    #[validate(length(min = 3, max = 3))]
    pub currency: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub counterparty_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub document_id: Uuid,
    pub tenant_id: Uuid,
    pub display_name: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub counterparty_name: Option<String>,
    pub status: String,
    pub matched_transaction_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<InboxDocument> for DocumentResponse {
    fn from(d: InboxDocument) -> Self {
        Self {
            document_id: d.document_id,
            tenant_id: d.tenant_id,
            display_name: d.display_name,
            amount: d.amount,
            currency: d.currency,
            document_date: d.document_date,
            description: d.description,
            counterparty_name: d.counterparty_name,
            status: d.status,
            matched_transaction_id: d.matched_transaction_id,
            created_utc: d.created_utc,
            updated_utc: d.updated_utc,
        }
    }
}
