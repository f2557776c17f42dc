//! In-memory [`VectorStore`] for tests and examples.
//!
//! Vector recall is brute-force cosine similarity; text recall is token
//! overlap against the stored search text. Both paths can be forced to fail
//! to exercise degraded branches.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::StoreError;
use super::fusion::{RankedRow, rrf_fuse};
use super::model::{EmbeddingRecord, RecallOutcome};
use super::{RecallLimits, SearchFilters, StoreHealth, VectorStore};
use crate::context::TENANT_WILDCARD;

/// Test double with controllable failure modes.
pub struct MockVectorStore {
    dim: usize,
    records: Mutex<Vec<EmbeddingRecord>>,
    fail_vector_path: AtomicBool,
    fail_text_path: AtomicBool,
    health: Mutex<StoreHealth>,
}

impl MockVectorStore {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            records: Mutex::new(Vec::new()),
            fail_vector_path: AtomicBool::new(false),
            fail_text_path: AtomicBool::new(false),
            health: Mutex::new(StoreHealth::Healthy),
        }
    }

    /// Forces the vector recall path to fail (text-only degraded mode).
    pub fn fail_vector_path(&self, fail: bool) {
        self.fail_vector_path.store(fail, Ordering::SeqCst);
    }

    /// Forces the text recall path to fail.
    pub fn fail_text_path(&self, fail: bool) {
        self.fail_text_path.store(fail, Ordering::SeqCst);
    }

    pub fn set_health(&self, health: StoreHealth) {
        *self.health.lock() = health;
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns the stored record for a key, if any.
    pub fn get(&self, tenant_id: &str, entity_id: &str, chunk_type: &str) -> Option<EmbeddingRecord> {
        self.records
            .lock()
            .iter()
            .find(|r| {
                r.tenant_id == tenant_id && r.entity_id == entity_id && r.chunk_type == chunk_type
            })
            .cloned()
    }

    fn matches_filters(record: &EmbeddingRecord, filters: &SearchFilters) -> bool {
        if !filters.seniority.is_empty() {
            let Some(seniority) = record.metadata.seniority.as_deref() else {
                return false;
            };
            if !filters.seniority.iter().any(|s| s == seniority) {
                return false;
            }
        }
        if !filters.locations.is_empty() {
            let Some(location) = record.metadata.location.as_deref() else {
                return false;
            };
            if !filters.locations.iter().any(|l| l == location) {
                return false;
            }
        }
        true
    }

    fn visible_records(&self, tenant_id: &str, filters: &SearchFilters) -> Vec<EmbeddingRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| tenant_id == TENANT_WILDCARD || r.tenant_id == tenant_id)
            .filter(|r| Self::matches_filters(r, filters))
            .cloned()
            .collect()
    }
}

/// Plain cosine similarity; used by the mock's vector path.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a < f64::EPSILON || norm_b < f64::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn token_overlap(query: &str, text: &str) -> f64 {
    let tokenize = |s: &str| -> std::collections::HashSet<String> {
        s.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect()
    };
    let tokens = tokenize(text);
    tokenize(query).iter().filter(|t| tokens.contains(*t)).count() as f64
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn upsert(&self, record: &EmbeddingRecord) -> Result<(), StoreError> {
        if record.vector.len() != self.dim {
            return Err(StoreError::SchemaMismatch {
                detail: format!(
                    "vector has {} dims, schema expects {}",
                    record.vector.len(),
                    self.dim
                ),
            });
        }
        let mut records = self.records.lock();
        if let Some(existing) = records.iter_mut().find(|r| {
            r.tenant_id == record.tenant_id
                && r.entity_id == record.entity_id
                && r.chunk_type == record.chunk_type
        }) {
            *existing = record.clone();
        } else {
            records.push(record.clone());
        }
        Ok(())
    }

    async fn get_text_hash(
        &self,
        tenant_id: &str,
        entity_id: &str,
        chunk_type: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(self
            .get(tenant_id, entity_id, chunk_type)
            .map(|r| r.text_hash))
    }

    async fn hybrid_search(
        &self,
        tenant_id: &str,
        query_vector: Option<&[f32]>,
        query_text: &str,
        limits: RecallLimits,
        filters: &SearchFilters,
    ) -> Result<RecallOutcome, StoreError> {
        let vector_failed = self.fail_vector_path.load(Ordering::SeqCst);
        let text_failed = self.fail_text_path.load(Ordering::SeqCst);
        if vector_failed && text_failed {
            return Err(StoreError::Unavailable {
                message: "both recall paths failed".to_string(),
            });
        }

        let visible = self.visible_records(tenant_id, filters);

        let vector_rows: Vec<RankedRow> = match (query_vector, vector_failed) {
            (Some(query), false) => {
                let mut rows: Vec<RankedRow> = visible
                    .iter()
                    .map(|r| RankedRow {
                        candidate_id: r.entity_id.clone(),
                        tenant_id: r.tenant_id.clone(),
                        score: cosine_similarity(query, &r.vector),
                        fields: r.metadata.clone(),
                    })
                    .collect();
                rows.sort_by(|a, b| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                rows.truncate(limits.per_method_limit);
                rows
            }
            _ => Vec::new(),
        };

        let text_rows: Vec<RankedRow> = if text_failed {
            Vec::new()
        } else {
            let mut rows: Vec<RankedRow> = visible
                .iter()
                .filter_map(|r| {
                    let score = token_overlap(query_text, &r.metadata.search_text);
                    (score > 0.0).then(|| RankedRow {
                        candidate_id: r.entity_id.clone(),
                        tenant_id: r.tenant_id.clone(),
                        score,
                        fields: r.metadata.clone(),
                    })
                })
                .collect();
            rows.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            rows.truncate(limits.per_method_limit);
            rows
        };

        let vector_path_ok = query_vector.is_some() && !vector_failed;
        Ok(RecallOutcome {
            documents: rrf_fuse(&vector_rows, &text_rows),
            vector_path_ok,
            text_path_ok: !text_failed,
        })
    }

    async fn health_check(&self) -> StoreHealth {
        *self.health.lock()
    }

    fn dimensions(&self) -> usize {
        self.dim
    }
}

impl std::fmt::Debug for MockVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockVectorStore")
            .field("dim", &self.dim)
            .field("records", &self.records.lock().len())
            .finish()
    }
}
