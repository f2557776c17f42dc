use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheError;

/// Raw byte-level cache operations. Key construction, serialization and
/// compression live above this trait.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetches a value. `Ok(None)` is an ordinary miss.
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores a value with a TTL (SETEX semantics).
    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Connectivity probe with a short round trip.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Backend label (`redis` or `memory`).
    fn kind(&self) -> &'static str;
}
