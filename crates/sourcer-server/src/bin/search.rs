//! Search service entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;

use sourcer::cache::{MemoryCache, TenantCache};
use sourcer::config::Config;
use sourcer::readiness::{InitRetrySchedule, Readiness, init_with_retries};
use sourcer::search::{SearchDeps, SearchOrchestrator, SearchSettings};
use sourcer::trajectory::ShadowRecorder;
use sourcer_server::gateway::{
    SearchState, Shared, TenantRateLimiter, bootstrap, search_router, shutdown_signal,
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

    let readiness = Readiness::new(&["store", "cache", "embedder"]);
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .ok();
    let limiter = Arc::new(TenantRateLimiter::new(config.hybrid_rps, config.tenant_burst));
    let shared = Shared::new(
        Arc::clone(&config),
        Arc::clone(&readiness),
        metrics_handle,
        limiter,
    );

    let state = SearchState::new(Arc::clone(&shared));

    // Listen first; dependencies come up in the background.
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "search service listening");

    tokio::spawn(initialize(
        Arc::clone(&config),
        Arc::clone(&readiness),
        state.clone(),
    ));

    axum::serve(listener, search_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("search service shutdown complete");
    Ok(())
}

async fn initialize(config: Arc<Config>, readiness: Arc<Readiness>, state: SearchState) {
    let schedule = InitRetrySchedule::default();

    // Cache: a dead Redis degrades to the in-process backend.
    let cache_cell: Arc<std::sync::OnceLock<Arc<TenantCache>>> = Arc::new(Default::default());
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
    let cache = cache_cell.get().cloned().unwrap_or_else(|| {
        Arc::new(TenantCache::new(
            Arc::new(MemoryCache::default()),
            config.cache_ttls,
            config.cache_compression_threshold,
        ))
    });

    // Store: schema mismatch is fatal.
    let store_cell: Arc<std::sync::OnceLock<Arc<dyn sourcer::store::VectorStore>>> =
        Arc::new(Default::default());
    {
        let cell = Arc::clone(&store_cell);
        let config = Arc::clone(&config);
        init_with_retries(Arc::clone(&readiness), "store", schedule, move || {
            let cell = Arc::clone(&cell);
            let config = Arc::clone(&config);
            async move {
                let store = bootstrap::build_store(&config).await?;
                let _ = cell.set(store);
                Ok(())
            }
        })
        .await;
    }
    exit_on_fatal(&readiness);
    let Some(store) = store_cell.get().cloned() else {
        tracing::error!("store unavailable after retries, search stays not-ready");
        return;
    };

    // Embedder: built synchronously, probed with retries.
    let embedder = match bootstrap::build_embedder(&config) {
        Ok(embedder) => embedder,
        Err(error) => {
            readiness.set(
                "embedder",
                sourcer::readiness::DependencyStatus::Failed {
                    reason: error.reason,
                },
            );
            exit_on_fatal(&readiness);
            return;
        }
    };
    {
        let embedder = Arc::clone(&embedder);
        let store_dim = store.dimensions();
        init_with_retries(Arc::clone(&readiness), "embedder", schedule, move || {
            let embedder = Arc::clone(&embedder);
            async move { bootstrap::probe_embedder(&embedder, store_dim).await }
        })
        .await;
    }
    exit_on_fatal(&readiness);

    let deps = SearchDeps {
        store,
        embedder,
        rerank: bootstrap::build_rerank_engine(&config, Arc::clone(&cache)),
        ml: bootstrap::build_ml_client(&config),
        shadow: Arc::new(ShadowRecorder::default()),
        cache,
    };
    let orchestrator = Arc::new(SearchOrchestrator::new(
        deps,
        SearchSettings::from_config(&config),
    ));
    let _ = state.orchestrator.set(orchestrator);
    tracing::info!("search pipeline initialized");
}

fn exit_on_fatal(readiness: &Readiness) {
    if readiness.has_fatal() {
        tracing::error!("fatal initialization failure, exiting");
        std::process::exit(1);
    }
}
