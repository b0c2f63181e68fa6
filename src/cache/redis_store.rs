use crate::cache::store::{CacheError, CacheStore};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};

const CACHE_PREFIX: &str = "cache:";

/// One Redis string per entry under the `cache:` prefix.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Create a Redis client and connection manager
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        tracing::info!("Creating Redis client");

        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;

        tracing::info!("Redis client connected");

        Ok(Self { manager })
    }

    /// Health check for the Redis connection
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn redis_key(key: &str) -> String {
        format!("{}{}", CACHE_PREFIX, key)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = conn.get(Self::redis_key(key)).await?;
        Ok(value)
    }

    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: () = conn.set(Self::redis_key(key), bytes).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: i64 = conn.del(Self::redis_key(key)).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_redis_store_round_trip() {
        let store = RedisStore::connect("redis://localhost:6379").await.unwrap();
        store.ping().await.unwrap();

        let key = "test:redis_store";
        store.save(key, b"{\"a\":1}".to_vec()).await.unwrap();
        assert_eq!(
            store.load(key).await.unwrap().as_deref(),
            Some(&b"{\"a\":1}"[..])
        );

        store.remove(key).await.unwrap();
        assert!(store.load(key).await.unwrap().is_none());
    }
}
