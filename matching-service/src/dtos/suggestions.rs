use crate::models::MatchSuggestion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub suggestion_id: Uuid,
    pub tenant_id: Uuid,
    pub document_id: Uuid,
    pub transaction_id: Uuid,
    pub embedding_score: Option<f64>,
    pub amount_score: Option<f64>,
    pub currency_score: Option<f64>,
    pub date_score: Option<f64>,
    pub name_score: Option<f64>,
    pub confidence: f64,
    pub match_kind: String,
    pub status: String,
    pub decided_by: Option<String>,
    pub decided_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<MatchSuggestion> for SuggestionResponse {
    fn from(s: MatchSuggestion) -> Self {
        Self {
            suggestion_id: s.suggestion_id,
            tenant_id: s.tenant_id,
            document_id: s.document_id,
            transaction_id: s.transaction_id,
            embedding_score: s.embedding_score,
            amount_score: s.amount_score,
            currency_score: s.currency_score,
            date_score: s.date_score,
            name_score: s.name_score,
            confidence: s.confidence,
            match_kind: s.match_kind,
            status: s.status,
            decided_by: s.decided_by,
            decided_utc: s.decided_utc,
            created_utc: s.created_utc,
            updated_utc: s.updated_utc,
        }
    }
}

/// Suggestions for a document, ordered by confidence descending; the first
/// entry is the leading suggestion.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionListResponse {
    pub suggestions: Vec<SuggestionResponse>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ConfirmRequest {
    pub transaction_id: Uuid,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeclineRequest {
    pub suggestion_id: Uuid,
}
