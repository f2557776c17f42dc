use thiserror::Error;

/// Search pipeline failures that reach the gateway. Partial dependency
/// outages do not appear here; they surface as `degraded = true` on a
/// successful response.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search request: {reason}")]
    BadInput { reason: String },

    #[error("no viable recall path: {message}")]
    ServiceUnavailable { message: String },

    #[error("request deadline exceeded in {stage}")]
    Timeout { stage: &'static str },

    #[error("internal search failure: {message}")]
    Internal { message: String },
}
