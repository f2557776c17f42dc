//! Schema DDL and verification for the embeddings table.
//!
//! Verification is strict: required columns, the composite unique
//! constraint, the vector dimension and both ANN indexes must all match or
//! the service refuses to start. Auto-migration is idempotent DDL and runs
//! only when explicitly enabled.

use sqlx::{PgPool, Row};

use super::error::StoreError;

/// The embeddings table name.
pub const TABLE: &str = "candidate_embeddings";

/// Columns verification requires, with their expected Postgres types.
const REQUIRED_COLUMNS: &[(&str, &str)] = &[
    ("tenant_id", "text"),
    ("entity_id", "text"),
    ("chunk_type", "text"),
    ("embedding", "vector"),
    ("text_hash", "text"),
    ("updated_at", "timestamptz"),
    ("metadata", "jsonb"),
];

/// Builds the idempotent migration statements for dimension `dim`.
pub fn migration_statements(dim: usize) -> Vec<String> {
    vec![
        "CREATE EXTENSION IF NOT EXISTS vector".to_string(),
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (
                tenant_id     TEXT NOT NULL,
                entity_id     TEXT NOT NULL,
                chunk_type    TEXT NOT NULL,
                embedding     vector({dim}) NOT NULL,
                text_hash     TEXT NOT NULL,
                model_version TEXT NOT NULL,
                provider      TEXT NOT NULL,
                metadata      JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
                CONSTRAINT {TABLE}_identity UNIQUE (tenant_id, entity_id, chunk_type)
            )"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {TABLE}_embedding_hnsw \
             ON {TABLE} USING hnsw (embedding vector_cosine_ops)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {TABLE}_embedding_ivfflat \
             ON {TABLE} USING ivfflat (embedding vector_cosine_ops)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {TABLE}_search_text_fts \
             ON {TABLE} USING gin (to_tsvector('english', metadata->>'search_text'))"
        ),
    ]
}

/// Runs the idempotent migration.
pub async fn run_migration(pool: &PgPool, dim: usize) -> Result<(), StoreError> {
    for statement in migration_statements(dim) {
        sqlx::query(&statement)
            .execute(pool)
            .await
            .map_err(StoreError::from_sqlx)?;
    }
    tracing::info!(table = TABLE, dim, "schema migration applied");
    Ok(())
}

/// Verifies the full schema contract. Every check failure is a
/// [`StoreError::SchemaMismatch`].
pub async fn verify_schema(pool: &PgPool, expected_dim: usize) -> Result<(), StoreError> {
    verify_columns(pool).await?;
    verify_dimension(pool, expected_dim).await?;
    verify_unique_constraint(pool).await?;
    verify_ann_indexes(pool).await?;
    tracing::info!(table = TABLE, dim = expected_dim, "schema verified");
    Ok(())
}

async fn verify_columns(pool: &PgPool) -> Result<(), StoreError> {
    let rows = sqlx::query(
        "SELECT column_name, udt_name FROM information_schema.columns \
         WHERE table_name = $1",
    )
    .bind(TABLE)
    .fetch_all(pool)
    .await
    .map_err(StoreError::from_sqlx)?;

    if rows.is_empty() {
        return Err(StoreError::SchemaMismatch {
            detail: format!("table {TABLE} does not exist"),
        });
    }

    let present: Vec<(String, String)> = rows
        .iter()
        .map(|row| {
            Ok::<_, sqlx::Error>((
                row.try_get::<String, _>("column_name")?,
                row.try_get::<String, _>("udt_name")?,
            ))
        })
        .collect::<Result<_, _>>()
        .map_err(StoreError::from_sqlx)?;

    for (name, expected_type) in REQUIRED_COLUMNS {
        match present.iter().find(|(n, _)| n == name) {
            None => {
                return Err(StoreError::SchemaMismatch {
                    detail: format!("missing column {name}"),
                });
            }
            Some((_, actual)) if actual != expected_type => {
                return Err(StoreError::SchemaMismatch {
                    detail: format!("column {name} has type {actual}, expected {expected_type}"),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}

async fn verify_dimension(pool: &PgPool, expected_dim: usize) -> Result<(), StoreError> {
    // pgvector stores the declared dimension as the attribute typmod.
    let row = sqlx::query(
        "SELECT a.atttypmod AS dim FROM pg_attribute a \
         JOIN pg_class c ON a.attrelid = c.oid \
         WHERE c.relname = $1 AND a.attname = 'embedding'",
    )
    .bind(TABLE)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::from_sqlx)?;

    let dim: i32 = row
        .ok_or_else(|| StoreError::SchemaMismatch {
            detail: "embedding column not found".to_string(),
        })?
        .try_get("dim")
        .map_err(StoreError::from_sqlx)?;

    if dim != expected_dim as i32 {
        return Err(StoreError::SchemaMismatch {
            detail: format!("embedding dimension is {dim}, deployment expects {expected_dim}"),
        });
    }
    Ok(())
}

async fn verify_unique_constraint(pool: &PgPool) -> Result<(), StoreError> {
    let rows = sqlx::query(
        "SELECT indexdef FROM pg_indexes WHERE tablename = $1 AND indexdef ILIKE '%UNIQUE%'",
    )
    .bind(TABLE)
    .fetch_all(pool)
    .await
    .map_err(StoreError::from_sqlx)?;

    let found = rows.iter().any(|row| {
        row.try_get::<String, _>("indexdef")
            .map(|def| {
                let def = def.to_lowercase();
                def.contains("tenant_id") && def.contains("entity_id") && def.contains("chunk_type")
            })
            .unwrap_or(false)
    });

    if !found {
        return Err(StoreError::SchemaMismatch {
            detail: "unique constraint on (tenant_id, entity_id, chunk_type) missing".to_string(),
        });
    }
    Ok(())
}

async fn verify_ann_indexes(pool: &PgPool) -> Result<(), StoreError> {
    let rows = sqlx::query("SELECT indexdef FROM pg_indexes WHERE tablename = $1")
        .bind(TABLE)
        .fetch_all(pool)
        .await
        .map_err(StoreError::from_sqlx)?;

    let defs: Vec<String> = rows
        .iter()
        .filter_map(|row| row.try_get::<String, _>("indexdef").ok())
        .map(|d| d.to_lowercase())
        .collect();

    for method in ["hnsw", "ivfflat"] {
        let found = defs
            .iter()
            .any(|d| d.contains(method) && d.contains("vector_cosine_ops"));
        if !found {
            return Err(StoreError::SchemaMismatch {
                detail: format!("{method} cosine index missing on {TABLE}.embedding"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_carries_dimension_and_indexes() {
        let statements = migration_statements(768);
        let ddl = statements.join("\n");
        assert!(ddl.contains("vector(768)"));
        assert!(ddl.contains("USING hnsw"));
        assert!(ddl.contains("USING ivfflat"));
        assert!(ddl.contains("UNIQUE (tenant_id, entity_id, chunk_type)"));
        assert!(ddl.contains("IF NOT EXISTS"));
    }
}
