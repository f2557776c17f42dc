//! Tenant-scoped, namespaced key-value cache.
//!
//! Two backends sit behind [`CacheBackend`]: Redis for deployments and an
//! in-process store for development and tests. The typed layer
//! ([`TenantCache`]) owns serialization, optional zstd compression over a
//! size threshold, and the miss-on-error contract: a cache problem is never
//! a request problem.

pub mod backend;
pub mod error;
pub mod keys;
pub mod memory;
pub mod redis;

pub use backend::CacheBackend;
pub use error::CacheError;
pub use keys::{CACHE_SCHEMA_VERSION, Namespace};
pub use memory::MemoryCache;
pub use redis::RedisCache;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::CacheTtls;

const MARKER_PLAIN: u8 = 0x00;
const MARKER_ZSTD: u8 = 0x01;
const ZSTD_LEVEL: i32 = 1;

/// Health classification reported by [`TenantCache::health_check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheHealth {
    Healthy,
    Degraded,
    /// The in-process backend: functional, but not a shared cache.
    Disabled,
}

impl CacheHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheHealth::Healthy => "healthy",
            CacheHealth::Degraded => "degraded",
            CacheHealth::Disabled => "disabled",
        }
    }
}

/// Typed cache facade over a backend.
pub struct TenantCache {
    backend: Arc<dyn CacheBackend>,
    ttls: CacheTtls,
    compression_threshold: usize,
    /// Keys whose decode failure was already logged, to keep a poisoned hot
    /// key from flooding the logs.
    logged_decode_failures: moka::sync::Cache<String, ()>,
}

impl TenantCache {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        ttls: CacheTtls,
        compression_threshold: usize,
    ) -> Self {
        Self {
            backend,
            ttls,
            compression_threshold,
            logged_decode_failures: moka::sync::Cache::builder()
                .max_capacity(4096)
                .time_to_live(Duration::from_secs(3600))
                .build(),
        }
    }

    /// TTL configured for `namespace`.
    pub fn ttl(&self, namespace: Namespace) -> Duration {
        match namespace {
            Namespace::Embed => self.ttls.embed,
            Namespace::Hybrid => self.ttls.hybrid,
            Namespace::Rerank => self.ttls.rerank,
            Namespace::Evidence => self.ttls.evidence,
            Namespace::Msgs => self.ttls.msgs,
        }
    }

    /// Fetches and deserializes. Backend and decode failures are misses.
    pub async fn get<T: DeserializeOwned>(
        &self,
        namespace: Namespace,
        tenant_id: &str,
        suffix: &str,
    ) -> Option<T> {
        let key = keys::cache_key(namespace, tenant_id, suffix);

        let raw = match self.backend.get_raw(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "cache read failed, treating as miss");
                metrics::counter!("cache_errors_total", "op" => "get").increment(1);
                return None;
            }
        };

        match decode(&raw) {
            Ok(value) => Some(value),
            Err(reason) => {
                if self.logged_decode_failures.get(&key).is_none() {
                    self.logged_decode_failures.insert(key.clone(), ());
                    tracing::warn!(key = %key, reason = %reason, "cache entry undecodable, treating as miss");
                }
                metrics::counter!("cache_errors_total", "op" => "decode").increment(1);
                None
            }
        }
    }

    /// Serializes and stores with the namespace TTL. Best-effort: failures
    /// are logged and counted, never surfaced.
    pub async fn set<T: Serialize>(
        &self,
        namespace: Namespace,
        tenant_id: &str,
        suffix: &str,
        value: &T,
    ) {
        let key = keys::cache_key(namespace, tenant_id, suffix);
        let ttl = self.ttl(namespace);

        let encoded = match encode(value, self.compression_threshold) {
            Ok(encoded) => encoded,
            Err(reason) => {
                tracing::warn!(key = %key, reason = %reason, "cache encode failed, skipping write");
                metrics::counter!("cache_errors_total", "op" => "encode").increment(1);
                return;
            }
        };

        if let Err(error) = self.backend.set_raw(&key, encoded, ttl).await {
            tracing::warn!(key = %key, error = %error, "cache write failed");
            metrics::counter!("cache_errors_total", "op" => "set").increment(1);
        }
    }

    /// Pings the backend with a short round-trip write/read.
    pub async fn health_check(&self) -> CacheHealth {
        if self.backend.kind() == "memory" {
            return CacheHealth::Disabled;
        }
        match self.backend.ping().await {
            Ok(()) => CacheHealth::Healthy,
            Err(error) => {
                tracing::warn!(error = %error, "cache ping failed");
                CacheHealth::Degraded
            }
        }
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }
}

impl std::fmt::Debug for TenantCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantCache")
            .field("backend", &self.backend.kind())
            .field("compression_threshold", &self.compression_threshold)
            .finish()
    }
}

fn encode<T: Serialize>(value: &T, threshold: usize) -> Result<Vec<u8>, String> {
    let json = serde_json::to_vec(value).map_err(|e| e.to_string())?;
    if json.len() >= threshold {
        let compressed = zstd::encode_all(json.as_slice(), ZSTD_LEVEL).map_err(|e| e.to_string())?;
        let mut out = Vec::with_capacity(compressed.len() + 1);
        out.push(MARKER_ZSTD);
        out.extend_from_slice(&compressed);
        Ok(out)
    } else {
        let mut out = Vec::with_capacity(json.len() + 1);
        out.push(MARKER_PLAIN);
        out.extend_from_slice(&json);
        Ok(out)
    }
}

fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T, String> {
    let (marker, payload) = raw.split_first().ok_or("empty cache payload")?;
    let json = match *marker {
        MARKER_PLAIN => payload.to_vec(),
        MARKER_ZSTD => zstd::decode_all(payload).map_err(|e| e.to_string())?,
        other => return Err(format!("unknown payload marker {other:#x}")),
    };
    serde_json::from_slice(&json).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(threshold: usize) -> TenantCache {
        TenantCache::new(
            Arc::new(MemoryCache::new(1024)),
            CacheTtls::default(),
            threshold,
        )
    }

    #[tokio::test]
    async fn round_trips_small_values() {
        let cache = cache(4096);
        cache
            .set(Namespace::Hybrid, "t1", "jd1:wv1", &vec![1, 2, 3])
            .await;
        let got: Option<Vec<i32>> = cache.get(Namespace::Hybrid, "t1", "jd1:wv1").await;
        assert_eq!(got, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn round_trips_compressed_values() {
        let cache = cache(16);
        let value: Vec<String> = (0..100).map(|i| format!("candidate-{i}")).collect();
        cache.set(Namespace::Rerank, "t1", "big", &value).await;
        let got: Option<Vec<String>> = cache.get(Namespace::Rerank, "t1", "big").await;
        assert_eq!(got, Some(value));
    }

    #[tokio::test]
    async fn tenants_are_isolated() {
        let cache = cache(4096);
        cache.set(Namespace::Hybrid, "t1", "k", &"one").await;
        let other: Option<String> = cache.get(Namespace::Hybrid, "t2", "k").await;
        assert_eq!(other, None);
    }

    #[tokio::test]
    async fn undecodable_entry_is_a_miss() {
        let backend = Arc::new(MemoryCache::new(64));
        let cache = TenantCache::new(backend.clone(), CacheTtls::default(), 4096);

        let key = keys::cache_key(Namespace::Embed, "t1", "bad");
        backend
            .set_raw(&key, vec![MARKER_PLAIN, b'{'], Duration::from_secs(60))
            .await
            .unwrap();

        let got: Option<String> = cache.get(Namespace::Embed, "t1", "bad").await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn memory_backend_reports_disabled() {
        let cache = cache(4096);
        assert_eq!(cache.health_check().await, CacheHealth::Disabled);
    }

    #[test]
    fn encode_decode_markers() {
        let small = encode(&"x", 4096).unwrap();
        assert_eq!(small[0], MARKER_PLAIN);

        let big_value = "y".repeat(8192);
        let big = encode(&big_value, 16).unwrap();
        assert_eq!(big[0], MARKER_ZSTD);
        let decoded: String = decode(&big).unwrap();
        assert_eq!(decoded, big_value);
    }
}
