use thiserror::Error;

/// Rerank provider failures.
#[derive(Debug, Error)]
pub enum RerankError {
    #[error("rerank provider timed out after {timeout_ms}ms")]
    ProviderTimeout { timeout_ms: u64 },

    #[error("rerank provider rate limited")]
    ProviderRateLimited,

    #[error("rerank response unparseable: {reason}")]
    ParseFailure { reason: String },

    #[error("rerank upstream failure: {message}")]
    Upstream { message: String },

    #[error("rerank docset invalid: {reason}")]
    InvalidDocset { reason: String },
}

impl RerankError {
    /// Whether the secondary provider is worth attempting. Parse failures
    /// are: a different model may produce well-formed output. An invalid
    /// docset fails everywhere.
    pub fn is_fallback_worthy(&self) -> bool {
        !matches!(self, RerankError::InvalidDocset { .. })
    }
}
