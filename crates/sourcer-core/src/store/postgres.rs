//! Postgres + pgvector implementation of [`VectorStore`].

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};

use super::error::StoreError;
use super::fusion::{RankedRow, rrf_fuse};
use super::model::{DocumentFields, EmbeddingRecord, RecallOutcome};
use super::schema::{self, TABLE};
use super::{RecallLimits, SearchFilters, StoreHealth, VectorStore};
use crate::context::TENANT_WILDCARD;
use crate::resilience::{RetryPolicy, retry_with_backoff};

/// Connection-pooled store handle. Cheap to clone.
#[derive(Clone)]
pub struct PgVectorStore {
    pool: PgPool,
    dim: usize,
    retry: RetryPolicy,
}

impl PgVectorStore {
    /// Opens the pool, optionally migrates, and verifies the schema. A
    /// schema mismatch (including dimension) fails initialization; callers
    /// treat that as startup-fatal.
    pub async fn initialize(
        database_url: &str,
        pool_max: u32,
        dim: usize,
        auto_migrate: bool,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(pool_max)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::ConnectionFailed {
                message: e.to_string(),
            })?;

        if auto_migrate {
            schema::run_migration(&pool, dim).await?;
        }
        schema::verify_schema(&pool, dim).await?;

        Ok(Self {
            pool,
            dim,
            retry: RetryPolicy::default(),
        })
    }

    /// Wraps an existing pool; used by tests that manage their own schema.
    pub fn from_pool(pool: PgPool, dim: usize) -> Self {
        Self {
            pool,
            dim,
            retry: RetryPolicy::default(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn vector_recall(
        &self,
        tenant_id: &str,
        query_vector: &[f32],
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<RankedRow>, StoreError> {
        let literal = vector_literal(query_vector);

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT entity_id, tenant_id, 1 - (embedding <=> ");
        builder.push_bind(&literal);
        builder.push(format!(
            "::vector) AS score, metadata FROM {TABLE} WHERE chunk_type = "
        ));
        builder.push_bind(super::CHUNK_TYPE_PROFILE);
        push_predicates(&mut builder, tenant_id, filters);
        builder.push(" ORDER BY embedding <=> ");
        builder.push_bind(&literal);
        builder.push("::vector LIMIT ");
        builder.push_bind(limit as i64);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        Ok(decode_rows(rows))
    }

    async fn text_recall(
        &self,
        tenant_id: &str,
        query_text: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<RankedRow>, StoreError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT entity_id, tenant_id, \
             ts_rank_cd(to_tsvector('english', metadata->>'search_text'), plainto_tsquery('english', ",
        );
        builder.push_bind(query_text);
        builder.push(format!(
            "), 32)::float8 AS score, metadata FROM {TABLE} \
             WHERE to_tsvector('english', metadata->>'search_text') @@ plainto_tsquery('english', "
        ));
        builder.push_bind(query_text);
        builder.push(") AND chunk_type = ");
        builder.push_bind(super::CHUNK_TYPE_PROFILE);
        push_predicates(&mut builder, tenant_id, filters);
        builder.push(" ORDER BY score DESC LIMIT ");
        builder.push_bind(limit as i64);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        Ok(decode_rows(rows))
    }
}

fn push_predicates(
    builder: &mut QueryBuilder<'_, Postgres>,
    tenant_id: &str,
    filters: &SearchFilters,
) {
    if tenant_id != TENANT_WILDCARD {
        builder.push(" AND tenant_id = ");
        builder.push_bind(tenant_id.to_string());
    }
    if !filters.seniority.is_empty() {
        builder.push(" AND metadata->>'seniority' = ANY(");
        builder.push_bind(filters.seniority.clone());
        builder.push(")");
    }
    if !filters.locations.is_empty() {
        builder.push(" AND metadata->>'location' = ANY(");
        builder.push_bind(filters.locations.clone());
        builder.push(")");
    }
}

fn decode_rows(rows: Vec<PgRow>) -> Vec<RankedRow> {
    rows.into_iter()
        .filter_map(|row| {
            let candidate_id: String = row.try_get("entity_id").ok()?;
            let tenant_id: String = row.try_get("tenant_id").ok()?;
            let score: f64 = row.try_get("score").ok()?;
            let metadata: serde_json::Value = row.try_get("metadata").ok()?;
            let fields: DocumentFields = match serde_json::from_value(metadata) {
                Ok(fields) => fields,
                Err(error) => {
                    tracing::warn!(candidate_id = %candidate_id, error = %error,
                        "skipping row with undecodable metadata");
                    return None;
                }
            };
            Some(RankedRow {
                candidate_id,
                tenant_id,
                score,
                fields,
            })
        })
        .collect()
}

/// pgvector's text input format: `[v1,v2,...]`.
fn vector_literal(vector: &[f32]) -> String {
    let mut out = String::with_capacity(vector.len() * 10 + 2);
    out.push('[');
    for (i, v) in vector.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!("{v}"));
    }
    out.push(']');
    out
}

#[async_trait]
impl VectorStore for PgVectorStore {
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

        let literal = vector_literal(&record.vector);
        let metadata =
            serde_json::to_value(&record.metadata).map_err(|e| StoreError::QueryFailed {
                message: format!("metadata encode failed: {e}"),
            })?;

        let sql = format!(
            "INSERT INTO {TABLE} \
             (tenant_id, entity_id, chunk_type, embedding, text_hash, model_version, provider, metadata) \
             VALUES ($1, $2, $3, $4::vector, $5, $6, $7, $8) \
             ON CONFLICT (tenant_id, entity_id, chunk_type) DO UPDATE SET \
             embedding = EXCLUDED.embedding, \
             text_hash = EXCLUDED.text_hash, \
             model_version = EXCLUDED.model_version, \
             provider = EXCLUDED.provider, \
             metadata = EXCLUDED.metadata, \
             updated_at = now()"
        );

        retry_with_backoff(&self.retry, StoreError::is_retryable, || async {
            sqlx::query(&sql)
                .bind(&record.tenant_id)
                .bind(&record.entity_id)
                .bind(&record.chunk_type)
                .bind(&literal)
                .bind(&record.text_hash)
                .bind(&record.model_version)
                .bind(&record.provider)
                .bind(&metadata)
                .execute(&self.pool)
                .await
                .map_err(StoreError::from_sqlx)?;
            Ok(())
        })
        .await
    }

    async fn get_text_hash(
        &self,
        tenant_id: &str,
        entity_id: &str,
        chunk_type: &str,
    ) -> Result<Option<String>, StoreError> {
        let sql = format!(
            "SELECT text_hash FROM {TABLE} \
             WHERE tenant_id = $1 AND entity_id = $2 AND chunk_type = $3"
        );
        let row = sqlx::query(&sql)
            .bind(tenant_id)
            .bind(entity_id)
            .bind(chunk_type)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        row.map(|r| r.try_get("text_hash").map_err(StoreError::from_sqlx))
            .transpose()
    }

    async fn hybrid_search(
        &self,
        tenant_id: &str,
        query_vector: Option<&[f32]>,
        query_text: &str,
        limits: RecallLimits,
        filters: &SearchFilters,
    ) -> Result<RecallOutcome, StoreError> {
        let per_method = limits.per_method_limit;

        let vector_fut = async {
            match query_vector {
                Some(vector) => {
                    retry_with_backoff(&self.retry, StoreError::is_retryable, || {
                        self.vector_recall(tenant_id, vector, per_method, filters)
                    })
                    .await
                    .map(Some)
                }
                None => Ok(None),
            }
        };
        let text_fut = retry_with_backoff(&self.retry, StoreError::is_retryable, || {
            self.text_recall(tenant_id, query_text, per_method, filters)
        });

        let (vector_result, text_result) = tokio::join!(vector_fut, text_fut);

        let (vector_rows, vector_path_ok) = match vector_result {
            Ok(Some(rows)) => (rows, true),
            Ok(None) => (Vec::new(), false),
            Err(error) => {
                tracing::warn!(error = %error, "vector recall failed, continuing text-only");
                (Vec::new(), false)
            }
        };
        let (text_rows, text_path_ok) = match text_result {
            Err(error) if vector_path_ok => {
                tracing::warn!(error = %error, "text recall failed, continuing vector-only");
                (Vec::new(), false)
            }
            Err(error) => {
                return Err(StoreError::Unavailable {
                    message: format!("both recall paths failed: {error}"),
                });
            }
            Ok(rows) => (rows, true),
        };

        Ok(RecallOutcome {
            documents: rrf_fuse(&vector_rows, &text_rows),
            vector_path_ok,
            text_path_ok,
        })
    }

    async fn health_check(&self) -> StoreHealth {
        if let Err(error) = sqlx::query("SELECT 1").execute(&self.pool).await {
            tracing::warn!(error = %error, "store ping failed");
            return StoreHealth::Degraded;
        }
        match schema::verify_schema(&self.pool, self.dim).await {
            Ok(()) => StoreHealth::Healthy,
            Err(StoreError::SchemaMismatch { detail }) => {
                tracing::error!(detail = %detail, "schema invariant violated");
                StoreHealth::Unhealthy
            }
            Err(error) => {
                tracing::warn!(error = %error, "schema re-check failed");
                StoreHealth::Degraded
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.dim
    }
}

impl std::fmt::Debug for PgVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgVectorStore")
            .field("dim", &self.dim)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_literal_format() {
        assert_eq!(vector_literal(&[0.5, -1.0, 2.0]), "[0.5,-1,2]");
        assert_eq!(vector_literal(&[]), "[]");
    }
}
