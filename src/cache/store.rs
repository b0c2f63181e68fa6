use async_trait::async_trait;
use thiserror::Error;

/// Failures of a cache backend. These never reach HTTP callers: the cache
/// logs them and behaves as if the entry were absent.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Keyed byte storage behind [`ExpiringCache`](super::ExpiringCache).
///
/// Stores know nothing about expiry; each value they hold is a serialized
/// entry carrying its own write time.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Replace whatever is stored under `key`.
    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    fn backend_name(&self) -> &'static str;
}
