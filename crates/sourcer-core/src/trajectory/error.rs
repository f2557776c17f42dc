use thiserror::Error;

/// ML trajectory client failures. These are logged and swallowed by the
/// orchestrator; search never fails because of ML.
#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("trajectory service timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("trajectory service unavailable: {message}")]
    Unavailable { message: String },

    #[error("trajectory circuit open")]
    CircuitOpen,

    #[error("trajectory response malformed: {reason}")]
    Malformed { reason: String },
}
