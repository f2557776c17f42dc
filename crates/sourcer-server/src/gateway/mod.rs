//! Axum routers for the three services.

pub mod bootstrap;
pub mod embed;
pub mod error;
pub mod rerank;
pub mod search;
pub mod state;
pub mod tenant;

#[cfg(test)]
mod handler_tests;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, extract::State};
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use state::{EmbedDeps, EmbedState, RerankState, SearchState, Shared};
pub use tenant::{TenantRateLimiter, tenant_context};

use sourcer::readiness::ReadyState;

/// Routes shared by every service: liveness, readiness, metrics.
pub fn base_router(shared: Arc<Shared>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(shared)
}

/// Router for the embed service.
pub fn embed_router(state: EmbedState) -> Router {
    let shared = Arc::clone(&state.shared);
    Router::new()
        .route("/embed/upsert", post(embed::upsert_handler))
        .route("/embed/query", post(embed::query_handler))
        .with_state(state)
        .merge(base_router(shared))
        .layer(TraceLayer::new_for_http())
}

/// Router for the search service.
pub fn search_router(state: SearchState) -> Router {
    let shared = Arc::clone(&state.shared);
    Router::new()
        .route("/search/hybrid", post(search::hybrid_handler))
        .with_state(state)
        .merge(base_router(shared))
        .layer(TraceLayer::new_for_http())
}

/// Router for the rerank service.
pub fn rerank_router(state: RerankState) -> Router {
    let shared = Arc::clone(&state.shared);
    Router::new()
        .route("/rerank", post(rerank::rerank_handler))
        .with_state(state)
        .merge(base_router(shared))
        .layer(TraceLayer::new_for_http())
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    dependencies: std::collections::BTreeMap<String, String>,
}

/// Liveness plus the per-dependency status map. Always 200: a listening
/// socket is alive even while dependencies are coming up.
async fn health_handler(State(shared): State<Arc<Shared>>) -> Response {
    let status = if shared.readiness.has_fatal() {
        "unhealthy"
    } else {
        match shared.readiness.state() {
            ReadyState::Ok => "healthy",
            ReadyState::Initializing => "initializing",
            ReadyState::Degraded => "degraded",
        }
    };
    Json(HealthResponse {
        status,
        dependencies: shared.readiness.snapshot(),
    })
    .into_response()
}

#[derive(serde::Serialize)]
struct ReadyResponse {
    status: &'static str,
    dependencies: std::collections::BTreeMap<String, String>,
}

/// Readiness gate: 200 only when every dependency initialized.
async fn ready_handler(State(shared): State<Arc<Shared>>) -> Response {
    let state = shared.readiness.state();
    let body = Json(ReadyResponse {
        status: state.as_str(),
        dependencies: shared.readiness.snapshot(),
    });
    match state {
        ReadyState::Ok => (StatusCode::OK, body).into_response(),
        _ => (StatusCode::SERVICE_UNAVAILABLE, body).into_response(),
    }
}

/// Resolves on Ctrl-C or SIGTERM; drives graceful shutdown in the binaries.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}

/// Prometheus exposition.
async fn metrics_handler(State(shared): State<Arc<Shared>>) -> Response {
    let rendered = shared
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();
    ([("content-type", "text/plain; version=0.0.4")], rendered).into_response()
}
