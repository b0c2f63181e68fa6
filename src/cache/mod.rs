pub mod expiring;
pub mod file;
pub mod key;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use expiring::ExpiringCache;
pub use file::FileStore;
pub use key::CacheKey;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{CacheError, CacheStore};

use crate::config::{CacheBackend, CacheConfig};
use crate::errors::{AppError, Result};
use std::sync::Arc;

/// Open the backend selected in the configuration.
pub async fn open_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryStore::new()),
        CacheBackend::File => Arc::new(
            FileStore::open(&config.directory)
                .await
                .map_err(|e| AppError::Configuration(format!("Cache directory: {}", e)))?,
        ),
        CacheBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                AppError::Configuration("Redis URL is required for the redis cache backend".to_string())
            })?;
            let store = RedisStore::connect(url)
                .await
                .map_err(|e| AppError::Configuration(format!("Cache redis: {}", e)))?;
            store
                .ping()
                .await
                .map_err(|e| AppError::Configuration(format!("Cache redis ping: {}", e)))?;
            Arc::new(store)
        }
    };

    Ok(store)
}
