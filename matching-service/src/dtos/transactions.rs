use crate::models::LedgerTransaction;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterTransactionRequest {
    pub amount: Decimal,
    #[validate(length(min = 3, max = 3))]
    pub currency: String,
    pub transaction_date: NaiveDate,
    pub counterparty_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub transaction_id: Uuid,
    pub tenant_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub transaction_date: NaiveDate,
    pub counterparty_name: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<LedgerTransaction> for TransactionResponse {
    fn from(t: LedgerTransaction) -> Self {
        Self {
            transaction_id: t.transaction_id,
            tenant_id: t.tenant_id,
            amount: t.amount,
            currency: t.currency,
            transaction_date: t.transaction_date,
            counterparty_name: t.counterparty_name,
            created_utc: t.created_utc,
        }
    }
}
