use thiserror::Error;

use crate::constants::DimValidationError;

/// Embedding provider failures, classified for the resilience layer.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("provider rate limited")]
    RateLimited,

    #[error("provider timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("invalid embedding input: {reason}")]
    InvalidInput { reason: String },

    #[error("provider unavailable: {message}")]
    Unavailable { message: String },

    #[error("embedding dimension mismatch: {0}")]
    DimensionMismatch(#[from] DimValidationError),
}

impl EmbeddingError {
    /// Transient failures are worth a retry or a fallback provider; bad
    /// input is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EmbeddingError::RateLimited
                | EmbeddingError::Timeout { .. }
                | EmbeddingError::Unavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(EmbeddingError::RateLimited.is_retryable());
        assert!(EmbeddingError::Timeout { timeout_ms: 150 }.is_retryable());
        assert!(
            EmbeddingError::Unavailable {
                message: "502".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn input_and_dimension_errors_are_not() {
        assert!(
            !EmbeddingError::InvalidInput {
                reason: "empty".to_string()
            }
            .is_retryable()
        );
        let err: EmbeddingError = DimValidationError::DimensionMismatch {
            expected: 768,
            actual: 384,
        }
        .into();
        assert!(!err.is_retryable());
    }
}
