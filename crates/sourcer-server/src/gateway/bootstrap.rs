//! Dependency construction from configuration.
//!
//! Shared by the three binaries. Everything here runs inside the background
//! init task; a fatal result (schema mismatch) aborts the process after the
//! readiness tracker records it.

use std::sync::Arc;

use sourcer::cache::{CacheBackend, MemoryCache, RedisCache, TenantCache};
use sourcer::config::{Config, Environment, ProviderKind};
use sourcer::embedding::{
    EmbeddingProvider, LocalEmbedder, RemoteEmbedder, RemoteEmbedderConfig, ResilientEmbedder,
};
use sourcer::readiness::InitError;
use sourcer::rerank::{LlmReranker, RerankEngine, RerankProvider};
use sourcer::resilience::RetryPolicy;
use sourcer::store::{PgVectorStore, StoreError, VectorStore};
use sourcer::trajectory::{HttpTrajectoryClient, TrajectoryApi};

/// Opens the store pool, optionally migrates, verifies the schema.
pub async fn build_store(config: &Config) -> Result<Arc<dyn VectorStore>, InitError> {
    let store = PgVectorStore::initialize(
        &config.database_url,
        config.database_pool_max,
        config.embedding_dim.embedding_dim,
        config.enable_auto_migrate,
    )
    .await
    .map_err(|error| match &error {
        StoreError::SchemaMismatch { .. } => InitError::fatal(error.to_string()),
        _ => InitError::transient(error.to_string()),
    })?;
    Ok(Arc::new(store))
}

/// Connects the cache backend: Redis when configured, in-process otherwise.
pub async fn build_cache(config: &Config) -> Result<Arc<TenantCache>, InitError> {
    let backend: Arc<dyn CacheBackend> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisCache::connect(url)
                .await
                .map_err(|e| InitError::transient(e.to_string()))?,
        ),
        None => {
            tracing::warn!("no redis url configured, using in-process cache");
            Arc::new(MemoryCache::default())
        }
    };
    Ok(Arc::new(TenantCache::new(
        backend,
        config.cache_ttls,
        config.cache_compression_threshold,
    )))
}

/// Builds the configured embedding provider chain.
pub fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>, InitError> {
    let dim = config.embedding_dim.embedding_dim;

    match config.embedding_provider {
        ProviderKind::Local => {
            if config.environment == Environment::Production {
                return Err(InitError::fatal(
                    "local embedding provider forbidden in production",
                ));
            }
            Ok(Arc::new(LocalEmbedder::new(
                dim,
                config.embedding_max_input_chars,
            )))
        }
        ProviderKind::Primary => {
            let primary = remote(config, "primary")?;
            let secondary = match config.embedding_secondary_url.is_some() {
                true => Some(remote(config, "secondary")?),
                false => None,
            };
            Ok(Arc::new(ResilientEmbedder::new(
                primary,
                secondary,
                config.embedding_breaker,
                RetryPolicy::default(),
                dim,
            )))
        }
        ProviderKind::Secondary => {
            let secondary = remote(config, "secondary")?;
            Ok(Arc::new(ResilientEmbedder::new(
                secondary,
                None,
                config.embedding_breaker,
                RetryPolicy::default(),
                dim,
            )))
        }
    }
}

fn remote(config: &Config, which: &'static str) -> Result<Arc<dyn EmbeddingProvider>, InitError> {
    let (url, model) = match which {
        "primary" => (
            config.embedding_primary_url.clone(),
            config.embedding_primary_model.clone(),
        ),
        _ => (
            config.embedding_secondary_url.clone(),
            config.embedding_secondary_model.clone(),
        ),
    };
    let base_url = url.ok_or_else(|| {
        InitError::fatal(format!("{which} embedding provider has no base url"))
    })?;
    let embedder = RemoteEmbedder::new(RemoteEmbedderConfig {
        name: which,
        base_url,
        model,
        api_key: config.embedding_api_key.clone(),
        dimensions: config.embedding_dim.embedding_dim,
        timeout: config.embedding_timeout,
        max_input_chars: config.embedding_max_input_chars,
    })
    .map_err(|e| InitError::transient(e.to_string()))?;
    Ok(Arc::new(embedder))
}

/// Probes the embedder with a canary string and checks the dimension
/// contract against the store.
pub async fn probe_embedder(
    embedder: &Arc<dyn EmbeddingProvider>,
    store_dim: usize,
) -> Result<(), InitError> {
    if embedder.dimensions() != store_dim {
        return Err(InitError::fatal(format!(
            "embedder dimension {} does not match store dimension {}",
            embedder.dimensions(),
            store_dim
        )));
    }
    let canary = embedder
        .embed("dimension probe")
        .await
        .map_err(|e| InitError::transient(format!("embedder probe failed: {e}")))?;
    if canary.vector.len() != store_dim {
        return Err(InitError::fatal(format!(
            "embedder produced {} dims, store expects {}",
            canary.vector.len(),
            store_dim
        )));
    }
    Ok(())
}

/// Builds the Stage-3 engine when reranking is enabled.
pub fn build_rerank_engine(config: &Config, cache: Arc<TenantCache>) -> Option<Arc<RerankEngine>> {
    if !config.enable_rerank {
        return None;
    }
    let primary: Arc<dyn RerankProvider> =
        Arc::new(LlmReranker::new(config.rerank_primary_model.clone()));
    let secondary: Option<Arc<dyn RerankProvider>> = config
        .rerank_secondary_model
        .clone()
        .map(|model| Arc::new(LlmReranker::new(model)) as Arc<dyn RerankProvider>);
    Some(Arc::new(RerankEngine::new(
        primary,
        secondary,
        cache,
        config.rerank_breaker,
        config.rerank_timeout,
        config.weights_version.clone(),
    )))
}

/// Builds the ML trajectory client when enabled.
pub fn build_ml_client(config: &Config) -> Option<Arc<dyn TrajectoryApi>> {
    if !config.ml_trajectory_enabled {
        return None;
    }
    let url = config.ml_trajectory_url.as_ref()?;
    match HttpTrajectoryClient::new(url.clone(), config.ml_trajectory_timeout, config.ml_breaker) {
        Ok(client) => Some(Arc::new(client)),
        Err(error) => {
            tracing::error!(error = %error, "failed to build ML trajectory client, disabling");
            None
        }
    }
}
