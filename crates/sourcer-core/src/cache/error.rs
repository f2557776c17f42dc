use thiserror::Error;

/// Backend-level cache failures. The typed layer converts all of these into
/// misses (reads) or dropped writes; they never reach a request handler.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("cache operation failed: {message}")]
    OperationFailed { message: String },
}
