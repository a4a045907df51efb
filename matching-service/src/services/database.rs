//! Database service for matching-service.

#![allow(clippy::too_many_arguments)]

use crate::models::{
    DocumentStatus, Embedding, InboxDocument, LedgerTransaction, MatchKind, MatchSuggestion,
    OwnerType, SuggestionStatus,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::scoring::SubScores;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const DOCUMENT_COLUMNS: &str = "document_id, tenant_id, display_name, amount, currency, \
     document_date, description, counterparty_name, status, matched_transaction_id, \
     created_utc, updated_utc";

const TRANSACTION_COLUMNS: &str =
    "transaction_id, tenant_id, amount, currency, transaction_date, counterparty_name, created_utc";

const SUGGESTION_COLUMNS: &str = "suggestion_id, tenant_id, document_id, transaction_id, \
     embedding_score, amount_score, currency_score, date_score, name_score, confidence, \
     match_kind, status, decided_by, decided_utc, created_utc, updated_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "matching-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    #[instrument(skip(self, description), fields(tenant_id = %tenant_id))]
    pub async fn create_document(
        &self,
        tenant_id: Uuid,
        display_name: &str,
        amount: Option<Decimal>,
        currency: Option<&str>,
        document_date: Option<NaiveDate>,
        description: Option<&str>,
        counterparty_name: Option<&str>,
    ) -> Result<InboxDocument, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_document"])
            .start_timer();

        let document = sqlx::query_as::<_, InboxDocument>(&format!(
            r#"
            INSERT INTO inbox_documents (document_id, tenant_id, display_name, amount, currency, document_date, description, counterparty_name, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {DOCUMENT_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(display_name)
        .bind(amount)
        .bind(currency)
        .bind(document_date)
        .bind(description)
        .bind(counterparty_name)
        .bind(DocumentStatus::New.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create document: {}", e)))?;

        timer.observe_duration();
        info!(document_id = %document.document_id, "Inbox document created");

        Ok(document)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, document_id = %document_id))]
    pub async fn get_document(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<InboxDocument>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_document"])
            .start_timer();

        let document = sqlx::query_as::<_, InboxDocument>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM inbox_documents WHERE tenant_id = $1 AND document_id = $2",
        ))
        .bind(tenant_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get document: {}", e)))?;

        timer.observe_duration();

        Ok(document)
    }

    /// Unconditional status write, used by the scoring pipeline for its own
    /// transitions (processing, analyzing, scored outcomes).
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn set_document_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_document_status"])
            .start_timer();

        sqlx::query(
            "UPDATE inbox_documents SET status = $2, updated_utc = NOW() WHERE document_id = $1",
        )
        .bind(document_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to set document status: {}", e))
        })?;

        timer.observe_duration();
        Ok(())
    }

    /// Guarded status transition: only fires when the current status is one
    /// of `allowed_from`. Returns the updated row, or None when the document
    /// does not exist or is not in an allowed status.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, document_id = %document_id))]
    pub async fn transition_document(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
        allowed_from: &[DocumentStatus],
        to: DocumentStatus,
    ) -> Result<Option<InboxDocument>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["transition_document"])
            .start_timer();

        let from: Vec<String> = allowed_from.iter().map(|s| s.as_str().to_string()).collect();

        let document = sqlx::query_as::<_, InboxDocument>(&format!(
            r#"
            UPDATE inbox_documents
            SET status = $4, updated_utc = NOW()
            WHERE tenant_id = $1 AND document_id = $2 AND status = ANY($3)
            RETURNING {DOCUMENT_COLUMNS}
            "#,
        ))
        .bind(tenant_id)
        .bind(document_id)
        .bind(&from)
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to transition document: {}", e))
        })?;

        timer.observe_duration();

        Ok(document)
    }

    /// Document ids of a tenant that a bulk rescore should re-enqueue.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn list_scorable_documents(&self, tenant_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_scorable_documents"])
            .start_timer();

        let scorable: Vec<String> = [
            DocumentStatus::New,
            DocumentStatus::Processing,
            DocumentStatus::Analyzing,
            DocumentStatus::Pending,
            DocumentStatus::SuggestedMatch,
            DocumentStatus::NoMatch,
        ]
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();

        let ids: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT document_id FROM inbox_documents WHERE tenant_id = $1 AND status = ANY($2) ORDER BY created_utc",
        )
        .bind(tenant_id)
        .bind(&scorable)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list scorable documents: {}", e))
        })?;

        timer.observe_duration();

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn create_transaction(
        &self,
        tenant_id: Uuid,
        amount: Decimal,
        currency: &str,
        transaction_date: NaiveDate,
        counterparty_name: Option<&str>,
    ) -> Result<LedgerTransaction, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_transaction"])
            .start_timer();

        let transaction = sqlx::query_as::<_, LedgerTransaction>(&format!(
            r#"
            INSERT INTO ledger_transactions (transaction_id, tenant_id, amount, currency, transaction_date, counterparty_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TRANSACTION_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(amount)
        .bind(currency)
        .bind(transaction_date)
        .bind(counterparty_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create transaction: {}", e))
        })?;

        timer.observe_duration();
        info!(transaction_id = %transaction.transaction_id, "Ledger transaction registered");

        Ok(transaction)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, transaction_id = %transaction_id))]
    pub async fn get_transaction(
        &self,
        tenant_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Option<LedgerTransaction>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_transaction"])
            .start_timer();

        let transaction = sqlx::query_as::<_, LedgerTransaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM ledger_transactions WHERE tenant_id = $1 AND transaction_id = $2",
        ))
        .bind(tenant_id)
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get transaction: {}", e)))?;

        timer.observe_duration();

        Ok(transaction)
    }

    /// Deterministic candidate pre-filter: same tenant, date within the
    /// window, currency equal when the document's currency is known.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn find_candidates_by_window(
        &self,
        tenant_id: Uuid,
        document_date: NaiveDate,
        window_days: i32,
        currency: Option<&str>,
        limit: i64,
    ) -> Result<Vec<LedgerTransaction>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_candidates_by_window"])
            .start_timer();

        let transactions = sqlx::query_as::<_, LedgerTransaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM ledger_transactions
            WHERE tenant_id = $1
              AND transaction_date BETWEEN $2::date - $3 AND $2::date + $3
              AND ($4::text IS NULL OR UPPER(currency) = UPPER($4))
            ORDER BY transaction_date, transaction_id
            LIMIT $5
            "#,
        ))
        .bind(tenant_id)
        .bind(document_date)
        .bind(window_days)
        .bind(currency)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to find candidates: {}", e))
        })?;

        timer.observe_duration();

        Ok(transactions)
    }

    #[instrument(skip(self, transaction_ids), fields(tenant_id = %tenant_id, count = transaction_ids.len()))]
    pub async fn get_transactions_by_ids(
        &self,
        tenant_id: Uuid,
        transaction_ids: &[Uuid],
    ) -> Result<Vec<LedgerTransaction>, AppError> {
        if transaction_ids.is_empty() {
            return Ok(Vec::new());
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_transactions_by_ids"])
            .start_timer();

        let transactions = sqlx::query_as::<_, LedgerTransaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM ledger_transactions WHERE tenant_id = $1 AND transaction_id = ANY($2)",
        ))
        .bind(tenant_id)
        .bind(transaction_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get transactions by ids: {}", e))
        })?;

        timer.observe_duration();

        Ok(transactions)
    }

    // =========================================================================
    // Embedding Operations
    // =========================================================================

    /// Exactly one embedding per owner: a rewrite replaces the previous
    /// vector (model regeneration), it never appends.
    #[instrument(skip(self, vector, source_text), fields(owner_id = %owner_id))]
    pub async fn upsert_embedding(
        &self,
        owner_type: OwnerType,
        owner_id: Uuid,
        tenant_id: Uuid,
        vector: &[f32],
        source_text: &str,
        model: &str,
    ) -> Result<Embedding, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_embedding"])
            .start_timer();

        let embedding = sqlx::query_as::<_, Embedding>(
            r#"
            INSERT INTO embeddings (embedding_id, owner_type, owner_id, tenant_id, vector, source_text, model)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (owner_type, owner_id) DO UPDATE
            SET vector = EXCLUDED.vector,
                source_text = EXCLUDED.source_text,
                model = EXCLUDED.model,
                created_utc = NOW()
            RETURNING embedding_id, owner_type, owner_id, tenant_id, vector, source_text, model, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_type.as_str())
        .bind(owner_id)
        .bind(tenant_id)
        .bind(vector)
        .bind(source_text)
        .bind(model)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to upsert embedding: {}", e))
        })?;

        timer.observe_duration();

        Ok(embedding)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    pub async fn get_embedding(
        &self,
        owner_type: OwnerType,
        owner_id: Uuid,
    ) -> Result<Option<Embedding>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_embedding"])
            .start_timer();

        let embedding = sqlx::query_as::<_, Embedding>(
            r#"
            SELECT embedding_id, owner_type, owner_id, tenant_id, vector, source_text, model, created_utc
            FROM embeddings
            WHERE owner_type = $1 AND owner_id = $2
            "#,
        )
        .bind(owner_type.as_str())
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get embedding: {}", e)))?;

        timer.observe_duration();

        Ok(embedding)
    }

    /// All transaction vectors of a tenant, for the brute-force index scan.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn load_transaction_vectors(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<(Uuid, Vec<f32>)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["load_transaction_vectors"])
            .start_timer();

        let vectors: Vec<(Uuid, Vec<f32>)> = sqlx::query_as(
            "SELECT owner_id, vector FROM embeddings WHERE tenant_id = $1 AND owner_type = 'transaction'",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load transaction vectors: {}", e))
        })?;

        timer.observe_duration();

        Ok(vectors)
    }

    // =========================================================================
    // Suggestion Operations
    // =========================================================================

    /// Idempotent write of a scored pair, unique on (document_id,
    /// transaction_id). Open rows (pending, and the system-resolved expired/
    /// unmatched states) are overwritten and revived to pending; rows a
    /// human already decided (confirmed, declined) are left untouched and
    /// None is returned.
    #[instrument(skip(self, scores), fields(document_id = %document_id, transaction_id = %transaction_id))]
    pub async fn upsert_suggestion(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
        transaction_id: Uuid,
        scores: &SubScores,
        confidence: f64,
        match_kind: MatchKind,
    ) -> Result<Option<MatchSuggestion>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_suggestion"])
            .start_timer();

        let suggestion = sqlx::query_as::<_, MatchSuggestion>(&format!(
            r#"
            INSERT INTO match_suggestions (suggestion_id, tenant_id, document_id, transaction_id,
                embedding_score, amount_score, currency_score, date_score, name_score,
                confidence, match_kind, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending')
            ON CONFLICT (document_id, transaction_id) DO UPDATE
            SET embedding_score = EXCLUDED.embedding_score,
                amount_score = EXCLUDED.amount_score,
                currency_score = EXCLUDED.currency_score,
                date_score = EXCLUDED.date_score,
                name_score = EXCLUDED.name_score,
                confidence = EXCLUDED.confidence,
                match_kind = EXCLUDED.match_kind,
                status = 'pending',
                updated_utc = NOW()
            WHERE match_suggestions.status IN ('pending', 'expired', 'unmatched')
            RETURNING {SUGGESTION_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(document_id)
        .bind(transaction_id)
        .bind(scores.embedding)
        .bind(scores.amount)
        .bind(scores.currency)
        .bind(scores.date)
        .bind(scores.name)
        .bind(confidence)
        .bind(match_kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to upsert suggestion: {}", e))
        })?;

        timer.observe_duration();

        Ok(suggestion)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, document_id = %document_id))]
    pub async fn list_suggestions_for_document(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<Vec<MatchSuggestion>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_suggestions_for_document"])
            .start_timer();

        let suggestions = sqlx::query_as::<_, MatchSuggestion>(&format!(
            r#"
            SELECT {SUGGESTION_COLUMNS}
            FROM match_suggestions
            WHERE tenant_id = $1 AND document_id = $2
            ORDER BY confidence DESC, transaction_id
            "#,
        ))
        .bind(tenant_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list suggestions: {}", e))
        })?;

        timer.observe_duration();

        Ok(suggestions)
    }

    /// Retire the open suggestion for a pair the latest scoring run
    /// classified below the suggestion threshold. Kept for audit, dropped
    /// from the active set.
    #[instrument(skip(self), fields(document_id = %document_id, transaction_id = %transaction_id))]
    pub async fn mark_pair_unmatched(
        &self,
        document_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_pair_unmatched"])
            .start_timer();

        sqlx::query(
            r#"
            UPDATE match_suggestions
            SET status = $3, updated_utc = NOW()
            WHERE document_id = $1 AND transaction_id = $2 AND status = 'pending'
            "#,
        )
        .bind(document_id)
        .bind(transaction_id)
        .bind(SuggestionStatus::Unmatched.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark pair unmatched: {}", e))
        })?;

        timer.observe_duration();
        Ok(())
    }

    /// Retire pending suggestions of a document whose transaction dropped
    /// out of the latest candidate set, so repeated rescoring converges on
    /// the same active set.
    #[instrument(skip(self, keep), fields(document_id = %document_id, kept = keep.len()))]
    pub async fn mark_stale_suggestions_unmatched(
        &self,
        document_id: Uuid,
        keep: &[Uuid],
    ) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_stale_suggestions_unmatched"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE match_suggestions
            SET status = $3, updated_utc = NOW()
            WHERE document_id = $1 AND status = 'pending' AND transaction_id <> ALL($2)
            "#,
        )
        .bind(document_id)
        .bind(keep)
        .bind(SuggestionStatus::Unmatched.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark stale suggestions: {}", e))
        })?;

        timer.observe_duration();
        Ok(result.rows_affected())
    }

    /// Bulk-transition stale pending suggestions to expired.
    #[instrument(skip(self))]
    pub async fn expire_suggestions(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["expire_suggestions"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE match_suggestions
            SET status = $2, updated_utc = NOW()
            WHERE status = 'pending' AND updated_utc < $1
            "#,
        )
        .bind(older_than)
        .bind(SuggestionStatus::Expired.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to expire suggestions: {}", e))
        })?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Reconciliation Operations
    // =========================================================================

    /// Confirm a suggestion: one transaction that links the document, marks
    /// the chosen suggestion confirmed, and supersedes every competitor.
    /// The document row is locked first so concurrent confirmations
    /// serialize; the loser surfaces as a Conflict.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, document_id = %document_id, transaction_id = %transaction_id))]
    pub async fn confirm_match(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
        transaction_id: Uuid,
        actor: &str,
    ) -> Result<MatchSuggestion, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["confirm_match"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let document = sqlx::query_as::<_, InboxDocument>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM inbox_documents WHERE tenant_id = $1 AND document_id = $2 FOR UPDATE",
        ))
        .bind(tenant_id)
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock document: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;

        if document.matched_transaction_id.is_some()
            || DocumentStatus::from_str(&document.status) == DocumentStatus::Done
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Document is already reconciled"
            )));
        }

        let suggestion = sqlx::query_as::<_, MatchSuggestion>(&format!(
            r#"
            UPDATE match_suggestions
            SET status = 'confirmed', decided_by = $4, decided_utc = NOW(), updated_utc = NOW()
            WHERE tenant_id = $1 AND document_id = $2 AND transaction_id = $3 AND status = 'pending'
            RETURNING {SUGGESTION_COLUMNS}
            "#,
        ))
        .bind(tenant_id)
        .bind(document_id)
        .bind(transaction_id)
        .bind(actor)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to confirm suggestion: {}", e))
        })?;

        let suggestion = match suggestion {
            Some(s) => s,
            None => {
                let existing: Option<(String,)> = sqlx::query_as(
                    "SELECT status FROM match_suggestions WHERE tenant_id = $1 AND document_id = $2 AND transaction_id = $3",
                )
                .bind(tenant_id)
                .bind(document_id)
                .bind(transaction_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to inspect suggestion: {}", e))
                })?;

                return Err(match existing {
                    Some((status,)) => AppError::Conflict(anyhow::anyhow!(
                        "Suggestion already resolved (status: {})",
                        status
                    )),
                    None => AppError::NotFound(anyhow::anyhow!("Suggestion not found")),
                });
            }
        };

        sqlx::query(
            r#"
            UPDATE match_suggestions
            SET status = 'unmatched', updated_utc = NOW()
            WHERE document_id = $1 AND transaction_id <> $2 AND status = 'pending'
            "#,
        )
        .bind(document_id)
        .bind(transaction_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to supersede suggestions: {}", e))
        })?;

        sqlx::query(
            r#"
            UPDATE inbox_documents
            SET matched_transaction_id = $2, status = $3, updated_utc = NOW()
            WHERE document_id = $1
            "#,
        )
        .bind(document_id)
        .bind(transaction_id)
        .bind(DocumentStatus::Done.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to link document: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit confirmation: {}", e))
        })?;

        timer.observe_duration();
        info!(
            document_id = %document_id,
            transaction_id = %transaction_id,
            actor = %actor,
            "Match confirmed"
        );

        Ok(suggestion)
    }

    /// Decline one suggestion. The document and its other suggestions are
    /// left untouched so remaining candidates stay actionable.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, document_id = %document_id, suggestion_id = %suggestion_id))]
    pub async fn decline_suggestion(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
        suggestion_id: Uuid,
        actor: &str,
    ) -> Result<MatchSuggestion, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["decline_suggestion"])
            .start_timer();

        let suggestion = sqlx::query_as::<_, MatchSuggestion>(&format!(
            r#"
            UPDATE match_suggestions
            SET status = 'declined', decided_by = $4, decided_utc = NOW(), updated_utc = NOW()
            WHERE tenant_id = $1 AND document_id = $2 AND suggestion_id = $3 AND status = 'pending'
            RETURNING {SUGGESTION_COLUMNS}
            "#,
        ))
        .bind(tenant_id)
        .bind(document_id)
        .bind(suggestion_id)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to decline suggestion: {}", e))
        })?;

        timer.observe_duration();

        match suggestion {
            Some(s) => {
                info!(suggestion_id = %suggestion_id, actor = %actor, "Suggestion declined");
                Ok(s)
            }
            None => {
                let existing: Option<(String,)> = sqlx::query_as(
                    "SELECT status FROM match_suggestions WHERE tenant_id = $1 AND document_id = $2 AND suggestion_id = $3",
                )
                .bind(tenant_id)
                .bind(document_id)
                .bind(suggestion_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to inspect suggestion: {}", e))
                })?;

                Err(match existing {
                    Some((status,)) => AppError::Conflict(anyhow::anyhow!(
                        "Suggestion already resolved (status: {})",
                        status
                    )),
                    None => AppError::NotFound(anyhow::anyhow!("Suggestion not found")),
                })
            }
        }
    }
}
