//! Vector store adapter: Postgres + pgvector behind a narrow contract.
//!
//! The adapter owns schema verification, connection pooling, idempotent
//! upserts and the two-path hybrid recall (cosine ANN + full-text) fused
//! with Reciprocal Rank Fusion. Callers never see SQL; they see
//! [`VectorStore`].

pub mod error;
pub mod fusion;
pub mod model;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod postgres;
pub mod schema;

pub use error::StoreError;
pub use fusion::rrf_fuse;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockVectorStore;
pub use model::{CandidateDocument, DocumentFields, EmbeddingRecord, RecallOutcome};
pub use postgres::PgVectorStore;

use async_trait::async_trait;

/// Chunk type stored for whole-profile embeddings. Additional chunk types
/// (summary-only, skills-only) share the same unique-key scheme.
pub const CHUNK_TYPE_PROFILE: &str = "profile";

/// Pool sizes for the two recall paths.
#[derive(Debug, Clone, Copy)]
pub struct RecallLimits {
    /// Rows requested from each recall path before fusion.
    pub per_method_limit: usize,
}

impl Default for RecallLimits {
    fn default() -> Self {
        Self {
            per_method_limit: crate::constants::DEFAULT_PER_METHOD_LIMIT,
        }
    }
}

/// Optional request-level predicates applied during recall.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub locations: Vec<String>,
    pub seniority: Vec<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty() && self.seniority.is_empty()
    }
}

/// Health classification for the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

impl StoreHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreHealth::Healthy => "healthy",
            StoreHealth::Degraded => "degraded",
            StoreHealth::Unhealthy => "unhealthy",
        }
    }
}

/// The store contract consumed by the embed path and the search
/// orchestrator.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent upsert keyed by `(tenant_id, entity_id, chunk_type)`.
    async fn upsert(&self, record: &EmbeddingRecord) -> Result<(), StoreError>;

    /// Stored text hash for a key, if the record exists. Drives the embed
    /// path's unchanged-content short circuit.
    async fn get_text_hash(
        &self,
        tenant_id: &str,
        entity_id: &str,
        chunk_type: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Two-path hybrid recall fused with RRF (k = 60), deduplicated by
    /// candidate id. `tenant_id` of [`crate::context::TENANT_WILDCARD`]
    /// drops the tenant predicate (bypass identity only).
    ///
    /// A `query_vector` of `None` (embedding unavailable) runs text-only
    /// recall; a failed vector path likewise degrades to text-only rather
    /// than failing the call. Both paths failing is an error.
    async fn hybrid_search(
        &self,
        tenant_id: &str,
        query_vector: Option<&[f32]>,
        query_text: &str,
        limits: RecallLimits,
        filters: &SearchFilters,
    ) -> Result<RecallOutcome, StoreError>;

    /// Pings the store and spot-checks schema invariants.
    async fn health_check(&self) -> StoreHealth;

    /// The fixed embedding dimension the schema was verified against.
    fn dimensions(&self) -> usize;
}
