//! Candidate retrieval: nearest-neighbor shortlist unioned with a
//! deterministic date/currency pre-filter.
//!
//! The vector path is best-effort. A slow or failing index degrades the run
//! to the deterministic filter instead of stalling document processing; an
//! empty result is a valid outcome, not an error.

use crate::config::RetrievalConfig;
use crate::models::{InboxDocument, LedgerTransaction};
use crate::services::database::Database;
use crate::services::metrics::record_retrieval_fallback;
use crate::services::vector_index::VectorIndex;
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

pub struct CandidateRetriever {
    db: Arc<Database>,
    index: Arc<dyn VectorIndex>,
    config: RetrievalConfig,
}

impl CandidateRetriever {
    pub fn new(db: Arc<Database>, index: Arc<dyn VectorIndex>, config: RetrievalConfig) -> Self {
        Self { db, index, config }
    }

    /// Return the scoring shortlist for a document: up to `candidate_cap`
    /// same-tenant transactions, nearest-neighbor hits first.
    #[instrument(skip(self, document, document_vector), fields(document_id = %document.document_id))]
    pub async fn retrieve(
        &self,
        document: &InboxDocument,
        document_vector: Option<&[f32]>,
    ) -> Result<Vec<LedgerTransaction>, AppError> {
        let tenant_id = document.tenant_id;
        let mut ordered: Vec<Uuid> = Vec::new();
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut loaded: HashMap<Uuid, LedgerTransaction> = HashMap::new();

        if let Some(vector) = document_vector {
            let query = self.index.query(tenant_id, vector, self.config.top_k);
            match tokio::time::timeout(self.config.index_timeout(), query).await {
                Ok(Ok(hits)) => {
                    for hit in hits {
                        if seen.insert(hit.owner_id) {
                            ordered.push(hit.owner_id);
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "Vector index query failed, using deterministic filter only");
                    record_retrieval_fallback("index_error");
                }
                Err(_) => {
                    warn!(
                        timeout_secs = self.config.index_timeout_secs,
                        "Vector index query timed out, using deterministic filter only"
                    );
                    record_retrieval_fallback("index_timeout");
                }
            }
        }

        if let Some(document_date) = document.document_date {
            let window = self
                .db
                .find_candidates_by_window(
                    tenant_id,
                    document_date,
                    self.config.date_window_days,
                    document.currency.as_deref(),
                    self.config.candidate_cap as i64,
                )
                .await?;

            for transaction in window {
                if seen.insert(transaction.transaction_id) {
                    ordered.push(transaction.transaction_id);
                }
                loaded.insert(transaction.transaction_id, transaction);
            }
        }

        // Resolve the vector-only hits; the tenant-scoped lookup also drops
        // hits whose transaction no longer exists.
        let missing: Vec<Uuid> = ordered
            .iter()
            .filter(|id| !loaded.contains_key(id))
            .copied()
            .collect();
        for transaction in self.db.get_transactions_by_ids(tenant_id, &missing).await? {
            loaded.insert(transaction.transaction_id, transaction);
        }

        Ok(ordered
            .into_iter()
            .filter_map(|id| loaded.remove(&id))
            .take(self.config.candidate_cap)
            .collect())
    }
}
