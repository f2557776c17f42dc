//! Shared and per-service handler state.
//!
//! Dependency handles live behind `OnceLock`s so the socket can open before
//! initialization finishes; handlers answer 503 until the background init
//! fills them in.

use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::PrometheusHandle;

use sourcer::config::Config;
use sourcer::embedding::EmbeddingProvider;
use sourcer::readiness::Readiness;
use sourcer::rerank::RerankEngine;
use sourcer::search::SearchOrchestrator;
use sourcer::store::VectorStore;

use super::tenant::TenantRateLimiter;

/// State common to every service router.
pub struct Shared {
    pub config: Arc<Config>,
    pub readiness: Arc<Readiness>,
    /// `None` when no Prometheus recorder is installed (tests).
    pub metrics: Option<PrometheusHandle>,
    pub limiter: Arc<TenantRateLimiter>,
}

impl Shared {
    pub fn new(
        config: Arc<Config>,
        readiness: Arc<Readiness>,
        metrics: Option<PrometheusHandle>,
        limiter: Arc<TenantRateLimiter>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            readiness,
            metrics,
            limiter,
        })
    }
}

/// Dependencies of the embed service, set once initialization succeeds.
pub struct EmbedDeps {
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

#[derive(Clone)]
pub struct EmbedState {
    pub shared: Arc<Shared>,
    pub deps: Arc<OnceLock<EmbedDeps>>,
}

impl EmbedState {
    pub fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            deps: Arc::new(OnceLock::new()),
        }
    }
}

#[derive(Clone)]
pub struct SearchState {
    pub shared: Arc<Shared>,
    pub orchestrator: Arc<OnceLock<Arc<SearchOrchestrator>>>,
}

impl SearchState {
    pub fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            orchestrator: Arc::new(OnceLock::new()),
        }
    }
}

#[derive(Clone)]
pub struct RerankState {
    pub shared: Arc<Shared>,
    pub engine: Arc<OnceLock<Arc<RerankEngine>>>,
}

impl RerankState {
    pub fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            engine: Arc::new(OnceLock::new()),
        }
    }
}
