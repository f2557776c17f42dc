//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants from primary ones to avoid drift.
//!
//! # Dimension Invariants
//!
//! The embedding dimension is a deployment-wide invariant shared by the
//! embedding providers and the vector store schema. A mismatch anywhere is a
//! startup-fatal condition, never a silently-degraded one:
//!
//! 1. Use [`DimConfig`] to pass the dimension through initialization
//! 2. Use [`validate_embedding_dim`] at module boundaries to catch mismatches
//!    early

pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Label of the active signal-weight table, exposed in responses and baked
/// into rerank cache keys so that weight changes invalidate cached orderings.
pub const DEFAULT_WEIGHTS_VERSION: &str = "wv-2025-10";

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Stage-1 pool size requested from each recall path before fusion.
pub const DEFAULT_PER_METHOD_LIMIT: usize = 300;

/// Reciprocal Rank Fusion constant.
pub const RRF_K: f64 = 60.0;

/// Candidates carried from Stage 1 into signal scoring.
pub const STAGE2_KEEP: usize = 100;

/// Candidates handed to the reranker.
pub const STAGE3_KEEP: usize = 50;

/// Hard cap on a rerank docset.
pub const MAX_RERANK_DOCSET: usize = 200;

/// Largest `limit` a search request may ask for.
pub const MAX_RESULT_LIMIT: usize = 50;

/// Runtime dimension configuration for modules that agree on vector sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimConfig {
    /// The embedding vector dimension (number of floats).
    pub embedding_dim: usize,
}

impl Default for DimConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl DimConfig {
    /// Creates a new dimension configuration.
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }

    /// Validates that this configuration is usable.
    pub fn validate(&self) -> Result<(), DimValidationError> {
        if self.embedding_dim == 0 {
            return Err(DimValidationError::ZeroDimension);
        }
        Ok(())
    }
}

/// Error returned when dimension validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Runtime dimension does not match the expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {}, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the expected one.
///
/// Use this at module boundaries (provider responses, store rows) rather than
/// letting a mismatched vector travel deeper into the pipeline.
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dim_config_default() {
        let config = DimConfig::default();
        assert_eq!(config.embedding_dim, DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn dim_config_rejects_zero() {
        let config = DimConfig::new(0);
        assert_eq!(config.validate(), Err(DimValidationError::ZeroDimension));
    }

    #[test]
    fn validate_dim_match() {
        assert!(validate_embedding_dim(768, 768).is_ok());
    }

    #[test]
    fn validate_dim_mismatch() {
        assert_eq!(
            validate_embedding_dim(384, 768),
            Err(DimValidationError::DimensionMismatch {
                expected: 768,
                actual: 384
            })
        );
    }

    #[test]
    fn error_display() {
        let err = DimValidationError::DimensionMismatch {
            expected: 768,
            actual: 384,
        };
        assert!(err.to_string().contains("768"));
        assert!(err.to_string().contains("384"));
    }
}
