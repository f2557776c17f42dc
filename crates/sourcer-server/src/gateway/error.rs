//! Gateway error taxonomy and HTTP mapping.
//!
//! Every lower-level error converts into the nearest kind here before it
//! reaches a client. Messages are stable strings; details stay in the
//! structured logs keyed by request id.

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use sourcer::search::SearchError;
use sourcer::{EmbeddingError, StoreError};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    BadInput(String),

    #[error("missing or invalid tenant")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unprocessable entity: {0}")]
    Unprocessable(String),

    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("request timed out")]
    Timeout,

    #[error("internal error")]
    Internal(String),
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::BadInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal details are logged, never serialized.
        let message = match &self {
            GatewayError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal gateway error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let mut headers = HeaderMap::new();
        if let GatewayError::RateLimited { retry_after_secs } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                headers.insert("retry-after", value);
            }
        }

        let body = Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        });
        (status, headers, body).into_response()
    }
}

impl From<SearchError> for GatewayError {
    fn from(error: SearchError) -> Self {
        match error {
            SearchError::BadInput { reason } => GatewayError::BadInput(reason),
            SearchError::ServiceUnavailable { message } => {
                GatewayError::ServiceUnavailable(message)
            }
            SearchError::Timeout { .. } => GatewayError::Timeout,
            SearchError::Internal { message } => GatewayError::Internal(message),
        }
    }
}

impl From<EmbeddingError> for GatewayError {
    fn from(error: EmbeddingError) -> Self {
        match error {
            EmbeddingError::InvalidInput { reason } => GatewayError::BadInput(reason),
            EmbeddingError::RateLimited => GatewayError::RateLimited {
                retry_after_secs: 1,
            },
            EmbeddingError::Timeout { .. } => GatewayError::Timeout,
            EmbeddingError::Unavailable { message } => GatewayError::ServiceUnavailable(message),
            EmbeddingError::DimensionMismatch(err) => GatewayError::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable { message } | StoreError::ConnectionFailed { message } => {
                GatewayError::ServiceUnavailable(message)
            }
            StoreError::SchemaMismatch { detail } => GatewayError::Internal(detail),
            StoreError::QueryFailed { message } => GatewayError::Internal(message),
        }
    }
}
