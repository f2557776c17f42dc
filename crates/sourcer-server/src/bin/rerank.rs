//! Rerank service entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;

use sourcer::config::Config;
use sourcer::readiness::{InitRetrySchedule, Readiness, init_with_retries};
use sourcer::rerank::{LlmReranker, RerankEngine, RerankProvider};
use sourcer_server::gateway::{
    RerankState, Shared, TenantRateLimiter, bootstrap, rerank_router, shutdown_signal,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Arc::new(Config::from_env()?);
    let addr: SocketAddr = config.socket_addr().parse()?;

    let readiness = Readiness::new(&["cache"]);
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .ok();
    let limiter = Arc::new(TenantRateLimiter::new(config.rerank_rps, config.tenant_burst));
    let shared = Shared::new(
        Arc::clone(&config),
        Arc::clone(&readiness),
        metrics_handle,
        limiter,
    );

    let state = RerankState::new(Arc::clone(&shared));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "rerank service listening");

    tokio::spawn(initialize(
        Arc::clone(&config),
        Arc::clone(&readiness),
        state.clone(),
    ));

    axum::serve(listener, rerank_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("rerank service shutdown complete");
    Ok(())
}

async fn initialize(config: Arc<Config>, readiness: Arc<Readiness>, state: RerankState) {
    let schedule = InitRetrySchedule::default();

    let cache_cell: Arc<std::sync::OnceLock<Arc<sourcer::cache::TenantCache>>> =
        Arc::new(Default::default());
    {
        let cell = Arc::clone(&cache_cell);
        let config = Arc::clone(&config);
        init_with_retries(Arc::clone(&readiness), "cache", schedule, move || {
            let cell = Arc::clone(&cell);
            let config = Arc::clone(&config);
            async move {
                let cache = bootstrap::build_cache(&config).await?;
                let _ = cell.set(cache);
                Ok(())
            }
        })
        .await;
    }
    let Some(cache) = cache_cell.get().cloned() else {
        tracing::error!("cache unavailable after retries, rerank stays not-ready");
        return;
    };

    // The rerank binary IS the rerank service; ENABLE_RERANK only gates
    // Stage 3 inside search.
    let primary: Arc<dyn RerankProvider> =
        Arc::new(LlmReranker::new(config.rerank_primary_model.clone()));
    let secondary: Option<Arc<dyn RerankProvider>> = config
        .rerank_secondary_model
        .clone()
        .map(|model| Arc::new(LlmReranker::new(model)) as Arc<dyn RerankProvider>);
    let engine = Arc::new(RerankEngine::new(
        primary,
        secondary,
        cache,
        config.rerank_breaker,
        config.rerank_timeout,
        config.weights_version.clone(),
    ));

    let _ = state.engine.set(engine);
    tracing::info!("rerank service initialized");
}
