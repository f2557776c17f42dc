use thiserror::Error;

/// Vector store failures.
///
/// `SchemaMismatch` is startup-fatal and is never retried or masked; the
/// remaining variants classify runtime connectivity and query problems.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("schema mismatch: {detail}")]
    SchemaMismatch { detail: String },

    #[error("store connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("store query failed: {message}")]
    QueryFailed { message: String },

    #[error("no recall path available: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    /// Transient errors worth a bounded retry inside the adapter. A schema
    /// mismatch is permanent by definition.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionFailed { .. } | StoreError::QueryFailed { .. }
        )
    }

    pub(crate) fn from_sqlx(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::ConnectionFailed {
                    message: error.to_string(),
                }
            }
            _ => StoreError::QueryFailed {
                message: error.to_string(),
            },
        }
    }
}
