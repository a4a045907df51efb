//! Domain models for matching-service.

#![allow(clippy::should_implement_trait)]

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Document Models
// ============================================================================

/// Lifecycle status of an inbox document.
///
/// `done` is reached only through a confirmed match; `archived` and `deleted`
/// are user-driven exits independent of the matching outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    New,
    Processing,
    Analyzing,
    Pending,
    SuggestedMatch,
    NoMatch,
    Done,
    Archived,
    Deleted,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Processing => "processing",
            Self::Analyzing => "analyzing",
            Self::Pending => "pending",
            Self::SuggestedMatch => "suggested_match",
            Self::NoMatch => "no_match",
            Self::Done => "done",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "new" => Self::New,
            "processing" => Self::Processing,
            "analyzing" => Self::Analyzing,
            "pending" => Self::Pending,
            "suggested_match" => Self::SuggestedMatch,
            "no_match" => Self::NoMatch,
            "done" => Self::Done,
            "archived" => Self::Archived,
            "deleted" => Self::Deleted,
            _ => Self::New,
        }
    }

    /// Statuses a scoring run may start from. Terminal or user-exited
    /// documents are never rescored.
    pub fn is_scorable(&self) -> bool {
        matches!(
            self,
            Self::New
                | Self::Processing
                | Self::Analyzing
                | Self::Pending
                | Self::SuggestedMatch
                | Self::NoMatch
        )
    }
}

/// An ingested financial artifact (receipt, invoice, upload) awaiting
/// reconciliation. Extracted fields may be partially absent.
#[derive(Debug, Clone, FromRow)]
pub struct InboxDocument {
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

impl InboxDocument {
    /// The free text an embedding is derived from. Empty when no usable
    /// text was extracted.
    pub fn embedding_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.display_name.as_str()];
        if let Some(name) = self.counterparty_name.as_deref() {
            parts.push(name);
        }
        if let Some(desc) = self.description.as_deref() {
            parts.push(desc);
        }
        parts
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Transaction Models
// ============================================================================

/// An existing ledger entry. Owned by the accounting subsystem; the engine
/// reads it and writes a link back on the document side only.
#[derive(Debug, Clone, FromRow)]
pub struct LedgerTransaction {
    pub transaction_id: Uuid,
    pub tenant_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub transaction_date: NaiveDate,
    pub counterparty_name: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl LedgerTransaction {
    pub fn embedding_text(&self) -> String {
        self.counterparty_name.clone().unwrap_or_default()
    }
}

// ============================================================================
// Embedding Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerType {
    Document,
    Transaction,
}

impl OwnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Transaction => "transaction",
        }
    }
}

/// One vector per owner entity, replaced wholesale on regeneration.
#[derive(Debug, Clone, FromRow)]
pub struct Embedding {
    pub embedding_id: Uuid,
    pub owner_type: String,
    pub owner_id: Uuid,
    pub tenant_id: Uuid,
    pub vector: Vec<f32>,
    pub source_text: String,
    pub model: String,
    pub created_utc: DateTime<Utc>,
}

// ============================================================================
// Suggestion Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Pending,
    Confirmed,
    Declined,
    Expired,
    Unmatched,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Declined => "declined",
            Self::Expired => "expired",
            Self::Unmatched => "unmatched",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "confirmed" => Self::Confirmed,
            "declined" => Self::Declined,
            "expired" => Self::Expired,
            "unmatched" => Self::Unmatched,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    AutoMatched,
    HighConfidence,
    Suggested,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoMatched => "auto_matched",
            Self::HighConfidence => "high_confidence",
            Self::Suggested => "suggested",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "auto_matched" => Self::AutoMatched,
            "high_confidence" => Self::HighConfidence,
            "suggested" => Self::Suggested,
            _ => Self::Suggested,
        }
    }
}

/// A persisted, scored candidate pairing between a document and a
/// transaction. Unique per (document_id, transaction_id); score fields are
/// derived data and overwritten on every rescore while the row is pending.
#[derive(Debug, Clone, FromRow)]
pub struct MatchSuggestion {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_status_roundtrip() {
        for status in [
            DocumentStatus::New,
            DocumentStatus::Processing,
            DocumentStatus::Analyzing,
            DocumentStatus::Pending,
            DocumentStatus::SuggestedMatch,
            DocumentStatus::NoMatch,
            DocumentStatus::Done,
            DocumentStatus::Archived,
            DocumentStatus::Deleted,
        ] {
            assert_eq!(DocumentStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn done_and_user_exits_are_not_scorable() {
        assert!(!DocumentStatus::Done.is_scorable());
        assert!(!DocumentStatus::Archived.is_scorable());
        assert!(!DocumentStatus::Deleted.is_scorable());
        assert!(DocumentStatus::NoMatch.is_scorable());
    }

    #[test]
    fn suggestion_status_roundtrip() {
        for status in [
            SuggestionStatus::Pending,
            SuggestionStatus::Confirmed,
            SuggestionStatus::Declined,
            SuggestionStatus::Expired,
            SuggestionStatus::Unmatched,
        ] {
            assert_eq!(SuggestionStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn embedding_text_skips_absent_fields() {
        let doc = InboxDocument {
            document_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            display_name: "Receipt".to_string(),
            amount: None,
            currency: None,
            document_date: None,
            description: None,
            counterparty_name: Some("Acme GmbH".to_string()),
            status: "new".to_string(),
            matched_transaction_id: None,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        };
        assert_eq!(doc.embedding_text(), "Receipt Acme GmbH");
    }
}
