//! Embed service entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;

use sourcer::config::Config;
use sourcer::readiness::{InitRetrySchedule, Readiness, init_with_retries};
use sourcer_server::gateway::{
    EmbedDeps, EmbedState, Shared, TenantRateLimiter, bootstrap, embed_router, shutdown_signal,
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

    let readiness = Readiness::new(&["store", "embedder"]);
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

    let state = EmbedState::new(Arc::clone(&shared));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "embed service listening");

    tokio::spawn(initialize(
        Arc::clone(&config),
        Arc::clone(&readiness),
        state.clone(),
    ));

    axum::serve(listener, embed_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("embed service shutdown complete");
    Ok(())
}

async fn initialize(config: Arc<Config>, readiness: Arc<Readiness>, state: EmbedState) {
    let schedule = InitRetrySchedule::default();

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
        tracing::error!("store unavailable after retries, embed stays not-ready");
        return;
    };

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

    let _ = state.deps.set(EmbedDeps { store, embedder });
    tracing::info!("embed service initialized");
}

fn exit_on_fatal(readiness: &Readiness) {
    if readiness.has_fatal() {
        tracing::error!("fatal initialization failure, exiting");
        std::process::exit(1);
    }
}
