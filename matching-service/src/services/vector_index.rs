//! Vector index abstraction for nearest-neighbor candidate lookup.
//!
//! The scoring pipeline only speaks to the `VectorIndex` trait, so the
//! backing implementation can be swapped (an ANN library, an external
//! index, or the brute-force scan below) without touching scoring logic.
//! Queries are always tenant-filtered; a hit can never cross tenants.

use crate::services::database::Database;
use crate::services::scoring::cosine_similarity;
use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub owner_id: Uuid,
    pub similarity: f64,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Register or replace the vector for an owner entity.
    async fn upsert(&self, tenant_id: Uuid, owner_id: Uuid, vector: &[f32])
        -> Result<(), AppError>;

    /// Return up to `top_k` owners of the given tenant by cosine similarity,
    /// most similar first.
    async fn query(
        &self,
        tenant_id: Uuid,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>, AppError>;
}

fn rank_hits(
    candidates: impl IntoIterator<Item = (Uuid, Vec<f32>)>,
    vector: &[f32],
    top_k: usize,
) -> Vec<VectorHit> {
    let mut hits: Vec<VectorHit> = candidates
        .into_iter()
        .filter_map(|(owner_id, candidate)| {
            cosine_similarity(vector, &candidate).map(|similarity| VectorHit {
                owner_id,
                similarity,
            })
        })
        .collect();

    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    hits.truncate(top_k);
    hits
}

/// Brute-force scan over the tenant's transaction vectors in Postgres.
///
/// Linear in the tenant's transaction count, which is adequate for small and
/// medium tenants; larger deployments slot an ANN-backed implementation in
/// behind the same trait.
pub struct BruteForceIndex {
    db: Arc<Database>,
}

impl BruteForceIndex {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VectorIndex for BruteForceIndex {
    async fn upsert(
        &self,
        _tenant_id: Uuid,
        _owner_id: Uuid,
        _vector: &[f32],
    ) -> Result<(), AppError> {
        // The scan reads the embeddings table directly; persistence in the
        // embedding store is the registration.
        Ok(())
    }

    async fn query(
        &self,
        tenant_id: Uuid,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>, AppError> {
        let candidates = self.db.load_transaction_vectors(tenant_id).await?;
        Ok(rank_hits(candidates, vector, top_k))
    }
}

/// In-memory index over owned vectors. Backs unit tests and single-process
/// setups without a database round-trip per query.
#[derive(Default)]
pub struct InMemoryIndex {
    entries: RwLock<HashMap<Uuid, (Uuid, Vec<f32>)>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(
        &self,
        tenant_id: Uuid,
        owner_id: Uuid,
        vector: &[f32],
    ) -> Result<(), AppError> {
        self.entries
            .write()
            .await
            .insert(owner_id, (tenant_id, vector.to_vec()));
        Ok(())
    }

    async fn query(
        &self,
        tenant_id: Uuid,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>, AppError> {
        let entries = self.entries.read().await;
        let candidates: Vec<(Uuid, Vec<f32>)> = entries
            .iter()
            .filter(|(_, (owner_tenant, _))| *owner_tenant == tenant_id)
            .map(|(owner_id, (_, v))| (*owner_id, v.clone()))
            .collect();
        Ok(rank_hits(candidates, vector, top_k))
    }
}
