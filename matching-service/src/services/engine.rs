//! The matching pipeline: embed, retrieve, score, decide, persist.
//!
//! A scoring run reads its own candidate set and writes only suggestion
//! rows scoped to its own document, so runs for different documents never
//! contend. Re-running a document with unchanged inputs converges on the
//! same rows via the idempotent suggestion upsert.

use crate::config::{EmbeddingConfig, ScoringConfig};
use crate::models::{
    DocumentStatus, InboxDocument, LedgerTransaction, MatchKind, OwnerType,
};
use crate::services::database::Database;
use crate::services::embeddings::EmbeddingProvider;
use crate::services::metrics::{
    record_embedding_request, record_match_decision, record_reconcile_action, record_scoring_run,
};
use crate::services::policy::{self, MatchClass};
use crate::services::retriever::CandidateRetriever;
use crate::services::scoring::{self, SubScores};
use crate::services::vector_index::VectorIndex;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Actor recorded on suggestions the system confirmed without a human.
pub const AUTO_MATCH_ACTOR: &str = "system:auto";

struct ScoredCandidate {
    transaction_id: Uuid,
    scores: SubScores,
    confidence: f64,
    class: MatchClass,
}

pub struct MatchingEngine {
    db: Arc<Database>,
    index: Arc<dyn VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
    retriever: CandidateRetriever,
    scoring: ScoringConfig,
    embedding: EmbeddingConfig,
}

impl MatchingEngine {
    pub fn new(
        db: Arc<Database>,
        index: Arc<dyn VectorIndex>,
        provider: Arc<dyn EmbeddingProvider>,
        retriever: CandidateRetriever,
        scoring: ScoringConfig,
        embedding: EmbeddingConfig,
    ) -> Self {
        Self {
            db,
            index,
            provider,
            retriever,
            scoring,
            embedding,
        }
    }

    /// Run one scoring pass over a document: retrieval, per-candidate
    /// scoring, classification, suggestion upsert, and auto-match when the
    /// leading candidate qualifies.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, document_id = %document_id))]
    pub async fn score_document(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<(), AppError> {
        let Some(document) = self.db.get_document(tenant_id, document_id).await? else {
            warn!("Document disappeared before scoring");
            record_scoring_run("missing");
            return Ok(());
        };

        if !DocumentStatus::from_str(&document.status).is_scorable() {
            info!(status = %document.status, "Document is not scorable, skipping");
            record_scoring_run("skipped");
            return Ok(());
        }

        self.db
            .set_document_status(document_id, DocumentStatus::Analyzing)
            .await?;

        let document_vector = self.document_vector(&document).await;
        let candidates = self
            .retriever
            .retrieve(&document, document_vector.as_deref())
            .await?;

        if candidates.is_empty() {
            self.db
                .mark_stale_suggestions_unmatched(document_id, &[])
                .await?;
            self.db
                .set_document_status(document_id, DocumentStatus::NoMatch)
                .await?;
            record_scoring_run("no_candidates");
            info!("No candidates found, document classified no_match");
            return Ok(());
        }

        let mut qualified: Vec<ScoredCandidate> = Vec::new();
        for transaction in &candidates {
            let transaction_vector = self.transaction_vector(transaction).await;
            let scores = scoring::compute(
                &document,
                transaction,
                document_vector.as_deref(),
                transaction_vector.as_deref(),
                self.scoring.date_decay_days,
            );
            let confidence = policy::combine(&scores, &self.scoring.weights);
            let class = policy::classify(&scores, confidence, &self.scoring.thresholds);

            match class {
                MatchClass::NoMatch => {
                    self.db
                        .mark_pair_unmatched(document_id, transaction.transaction_id)
                        .await?;
                    record_match_decision("no_match");
                }
                _ => qualified.push(ScoredCandidate {
                    transaction_id: transaction.transaction_id,
                    scores,
                    // classify() only qualifies a pair when a confidence exists
                    confidence: confidence.unwrap_or_default(),
                    class,
                }),
            }
        }

        // Highest confidence leads; only the leader may auto-match, the rest
        // stay pending so a user can override.
        qualified.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let leader_id = qualified.first().map(|c| c.transaction_id);

        let mut kept: Vec<Uuid> = Vec::new();
        let mut any_high = false;
        for candidate in &qualified {
            let kind = match candidate.class {
                MatchClass::AutoMatched if Some(candidate.transaction_id) != leader_id => {
                    MatchKind::HighConfidence
                }
                MatchClass::AutoMatched => MatchKind::AutoMatched,
                MatchClass::HighConfidence => MatchKind::HighConfidence,
                MatchClass::Suggested => MatchKind::Suggested,
                MatchClass::NoMatch => unreachable!("no_match candidates are filtered above"),
            };
            if matches!(kind, MatchKind::AutoMatched | MatchKind::HighConfidence) {
                any_high = true;
            }
            record_match_decision(kind.as_str());

            self.db
                .upsert_suggestion(
                    tenant_id,
                    document_id,
                    candidate.transaction_id,
                    &candidate.scores,
                    candidate.confidence,
                    kind,
                )
                .await?;
            kept.push(candidate.transaction_id);
        }

        self.db
            .mark_stale_suggestions_unmatched(document_id, &kept)
            .await?;

        let Some(leader) = qualified.first() else {
            self.db
                .set_document_status(document_id, DocumentStatus::NoMatch)
                .await?;
            record_scoring_run("no_match");
            return Ok(());
        };

        if leader.class == MatchClass::AutoMatched {
            match self
                .db
                .confirm_match(
                    tenant_id,
                    document_id,
                    leader.transaction_id,
                    AUTO_MATCH_ACTOR,
                )
                .await
            {
                Ok(_) => {
                    record_reconcile_action("auto_confirm", "ok");
                    record_scoring_run("auto_matched");
                    info!(
                        transaction_id = %leader.transaction_id,
                        confidence = leader.confidence,
                        "Document auto-matched"
                    );
                    return Ok(());
                }
                // A user beat the engine to it; their decision stands.
                Err(AppError::Conflict(e)) => {
                    record_reconcile_action("auto_confirm", "conflict");
                    info!(error = %e, "Auto-match lost to a concurrent resolution");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }

        let outcome = if any_high {
            DocumentStatus::SuggestedMatch
        } else {
            DocumentStatus::Pending
        };
        self.db.set_document_status(document_id, outcome).await?;
        record_scoring_run("suggested");
        info!(
            suggestions = qualified.len(),
            leading_confidence = leader.confidence,
            "Scoring run persisted suggestions"
        );

        Ok(())
    }

    /// Embed a newly registered transaction, best-effort. A transaction
    /// without usable text simply has no vector; that is a designed state,
    /// not an error.
    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.transaction_id))]
    pub async fn embed_transaction(&self, transaction: &LedgerTransaction) {
        let text = transaction.embedding_text();
        if text.trim().is_empty() {
            return;
        }

        match self.provider.embed(&text, &self.embedding.model).await {
            Ok(vector) => {
                record_embedding_request(self.provider.name(), "ok");
                if let Err(e) = self
                    .db
                    .upsert_embedding(
                        OwnerType::Transaction,
                        transaction.transaction_id,
                        transaction.tenant_id,
                        &vector,
                        &text,
                        &self.embedding.model,
                    )
                    .await
                {
                    warn!(error = %e, "Failed to persist transaction embedding");
                    return;
                }
                if let Err(e) = self
                    .index
                    .upsert(transaction.tenant_id, transaction.transaction_id, &vector)
                    .await
                {
                    warn!(error = %e, "Failed to index transaction embedding");
                }
            }
            Err(e) => {
                record_embedding_request(self.provider.name(), "error");
                warn!(error = %e, "Transaction embedding failed, will retry on next rescore");
            }
        }
    }

    /// Current vector for the document, re-embedding when the source text or
    /// model changed. Provider failure degrades to the last stored vector,
    /// or to no vector at all.
    async fn document_vector(&self, document: &InboxDocument) -> Option<Vec<f32>> {
        let text = document.embedding_text();
        if text.trim().is_empty() {
            return None;
        }

        let existing = self
            .db
            .get_embedding(OwnerType::Document, document.document_id)
            .await
            .ok()
            .flatten();

        if let Some(embedding) = &existing {
            if embedding.source_text == text && embedding.model == self.embedding.model {
                return Some(embedding.vector.clone());
            }
        }

        match self.provider.embed(&text, &self.embedding.model).await {
            Ok(vector) => {
                record_embedding_request(self.provider.name(), "ok");
                if let Err(e) = self
                    .db
                    .upsert_embedding(
                        OwnerType::Document,
                        document.document_id,
                        document.tenant_id,
                        &vector,
                        &text,
                        &self.embedding.model,
                    )
                    .await
                {
                    warn!(error = %e, "Failed to persist document embedding");
                }
                Some(vector)
            }
            Err(e) => {
                record_embedding_request(self.provider.name(), "error");
                warn!(error = %e, "Document embedding failed, degrading to stored vector");
                existing.map(|embedding| embedding.vector)
            }
        }
    }

    /// Vector for a candidate transaction, lazily re-embedding when the
    /// stored one is missing or was produced by an older model.
    async fn transaction_vector(&self, transaction: &LedgerTransaction) -> Option<Vec<f32>> {
        let stored = self
            .db
            .get_embedding(OwnerType::Transaction, transaction.transaction_id)
            .await
            .ok()
            .flatten();

        if let Some(embedding) = &stored {
            if embedding.model == self.embedding.model {
                return Some(embedding.vector.clone());
            }
        }

        let text = transaction.embedding_text();
        if text.trim().is_empty() {
            return stored.map(|embedding| embedding.vector);
        }

        match self.provider.embed(&text, &self.embedding.model).await {
            Ok(vector) => {
                record_embedding_request(self.provider.name(), "ok");
                if let Err(e) = self
                    .db
                    .upsert_embedding(
                        OwnerType::Transaction,
                        transaction.transaction_id,
                        transaction.tenant_id,
                        &vector,
                        &text,
                        &self.embedding.model,
                    )
                    .await
                {
                    warn!(error = %e, "Failed to persist transaction embedding");
                }
                Some(vector)
            }
            Err(e) => {
                record_embedding_request(self.provider.name(), "error");
                warn!(error = %e, "Transaction re-embedding failed, using stored vector");
                stored.map(|embedding| embedding.vector)
            }
        }
    }
}
