use crate::cache::store::CacheStore;
use crate::clock::Clock;
use crate::errors::{AppError, Result};
use crate::observability::MetricsRecorder;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Serialize)]
struct EntryRef<'a, T> {
    stored_at: DateTime<Utc>,
    value: &'a T,
}

#[derive(Deserialize)]
struct Entry<T> {
    stored_at: DateTime<Utc>,
    value: T,
}

/// Response cache with a fixed time-to-live.
///
/// Entries record their own write time. An entry older than the TTL is
/// deleted by the first read that finds it; nothing sweeps in the
/// background and the number of entries is not bounded.
///
/// Backend failures never escape: reads degrade to a miss and writes are
/// dropped, both with a warning.
///
/// Expiry is load, check, then remove with no lock in between, so a `set`
/// landing after the load of an expired entry can be deleted along with it.
/// The next read is then a miss and recomputes.
pub struct ExpiringCache {
    store: Arc<dyn CacheStore>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl ExpiringCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if ttl.is_zero() {
            return Err(AppError::Configuration(
                "Cache TTL must be greater than zero".to_string(),
            ));
        }

        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::Configuration(format!("Cache TTL: {}", e)))?;

        tracing::info!(
            backend = store.backend_name(),
            ttl_seconds = ttl.num_seconds(),
            "Response cache initialized"
        );

        Ok(Self { store, ttl, clock })
    }

    /// Fetch a live entry, deleting it instead if it has expired.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.load(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read error");
                MetricsRecorder::record_cache_error("read");
                return None;
            }
        };

        let entry: Entry<T> = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Unreadable cache entry");
                MetricsRecorder::record_cache_error("decode");
                return None;
            }
        };

        if self.clock.now() - entry.stored_at > self.ttl {
            tracing::debug!(key = %key, "Cache entry expired");
            if let Err(e) = self.store.remove(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to remove expired cache entry");
                MetricsRecorder::record_cache_error("remove");
            }
            return None;
        }

        Some(entry.value)
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let entry = EntryRef {
            stored_at: self.clock.now(),
            value,
        };

        let bytes = match serde_json::to_vec(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache encode error");
                MetricsRecorder::record_cache_error("encode");
                return;
            }
        };

        if let Err(e) = self.store.save(key, bytes).await {
            tracing::warn!(key = %key, error = %e, "Cache write error");
            MetricsRecorder::record_cache_error("write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::file::FileStore;
    use crate::cache::memory::MemoryStore;
    use crate::cache::store::CacheError;
    use crate::clock::ManualClock;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    fn cache_with(store: Arc<dyn CacheStore>, ttl_seconds: u64) -> (ExpiringCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = ExpiringCache::new(store, Duration::from_secs(ttl_seconds), clock.clone()).unwrap();
        (cache, clock)
    }

    #[tokio::test]
    async fn test_ttl_scenario() {
        let store = Arc::new(MemoryStore::new());
        let (cache, clock) = cache_with(store.clone(), 5);

        let value = json!({"decades": ["1920s"]});
        cache.set("decades_list", &value).await; // t=0

        clock.advance(Duration::from_secs(4));
        assert_eq!(cache.get::<Value>("decades_list").await, Some(value));

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get::<Value>("decades_list").await, None);

        // The expired entry was physically removed
        assert!(store.is_empty());
        assert_eq!(cache.get::<Value>("decades_list").await, None);
    }

    #[tokio::test]
    async fn test_entry_valid_at_exactly_ttl() {
        let (cache, clock) = cache_with(Arc::new(MemoryStore::new()), 5);

        cache.set("k", &1u32).await;
        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.get::<u32>("k").await, Some(1));
    }

    #[tokio::test]
    async fn test_set_overwrites_and_restarts_age() {
        let (cache, clock) = cache_with(Arc::new(MemoryStore::new()), 5);

        cache.set("k", &"old").await;
        clock.advance(Duration::from_secs(4));
        cache.set("k", &"new").await;
        clock.advance(Duration::from_secs(4));

        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_keys_expire_independently() {
        let (cache, clock) = cache_with(Arc::new(MemoryStore::new()), 5);

        cache.set("market:market=NYSE:decade=1920s", &"twenties").await;
        clock.advance(Duration::from_secs(3));
        cache.set("market:market=NYSE:decade=1930s", &"thirties").await;
        clock.advance(Duration::from_secs(3));

        assert_eq!(cache.get::<String>("market:market=NYSE:decade=1920s").await, None);
        assert_eq!(
            cache.get::<String>("market:market=NYSE:decade=1930s").await.as_deref(),
            Some("thirties")
        );
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        let (cache, _clock) = cache_with(store.clone(), 60);

        store.save("k", b"{not json".to_vec()).await.unwrap();
        assert_eq!(cache.get::<Value>("k").await, None);

        // Wrong shape for the requested type
        cache.set("n", &"text").await;
        assert_eq!(cache.get::<u64>("n").await, None);
    }

    #[tokio::test]
    async fn test_file_store_backed_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let (cache, clock) = cache_with(store, 5);

        cache.set("statistics:decade=*:market=*", &json!({"total_stocks": 3})).await;
        assert_eq!(
            cache.get::<Value>("statistics:decade=*:market=*").await,
            Some(json!({"total_stocks": 3}))
        );

        clock.advance(Duration::from_secs(6));
        assert_eq!(cache.get::<Value>("statistics:decade=*:market=*").await, None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn load(&self, _key: &str) -> std::result::Result<Option<Vec<u8>>, CacheError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into())
        }

        async fn save(&self, _key: &str, _bytes: Vec<u8>) -> std::result::Result<(), CacheError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into())
        }

        async fn remove(&self, _key: &str) -> std::result::Result<(), CacheError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into())
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    /// Reads and writes work; deletes always fail.
    struct UndeletableStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl CacheStore for UndeletableStore {
        async fn load(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, CacheError> {
            self.inner.load(key).await
        }

        async fn save(&self, key: &str, bytes: Vec<u8>) -> std::result::Result<(), CacheError> {
            self.inner.save(key, bytes).await
        }

        async fn remove(&self, _key: &str) -> std::result::Result<(), CacheError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn backend_name(&self) -> &'static str {
            "undeletable"
        }
    }

    #[tokio::test]
    async fn test_failed_removal_of_expired_entry_is_still_a_miss() {
        let store = Arc::new(UndeletableStore {
            inner: MemoryStore::new(),
        });
        let (cache, clock) = cache_with(store.clone(), 5);

        cache.set("decades", &json!(["1920s"])).await;
        clock.advance(Duration::from_secs(6));

        assert_eq!(cache.get::<Value>("decades").await, None);
        // The stale entry is still there and keeps reading as expired
        assert_eq!(store.inner.len(), 1);
        assert_eq!(cache.get::<Value>("decades").await, None);

        cache.set("decades", &json!(["1930s"])).await;
        assert_eq!(cache.get::<Value>("decades").await, Some(json!(["1930s"])));
    }

    /// Hands out a previously captured entry on the next load, as if a
    /// concurrent `set` landed right after that load.
    struct LateWriteStore {
        inner: MemoryStore,
        captured: parking_lot::Mutex<Option<Vec<u8>>>,
    }

    #[async_trait]
    impl CacheStore for LateWriteStore {
        async fn load(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, CacheError> {
            let captured = self.captured.lock().take();
            match captured {
                Some(bytes) => Ok(Some(bytes)),
                None => self.inner.load(key).await,
            }
        }

        async fn save(&self, key: &str, bytes: Vec<u8>) -> std::result::Result<(), CacheError> {
            self.inner.save(key, bytes).await
        }

        async fn remove(&self, key: &str) -> std::result::Result<(), CacheError> {
            self.inner.remove(key).await
        }

        fn backend_name(&self) -> &'static str {
            "late-write"
        }
    }

    #[tokio::test]
    async fn test_write_racing_lazy_expiry_is_dropped() {
        let store = Arc::new(LateWriteStore {
            inner: MemoryStore::new(),
            captured: parking_lot::Mutex::new(None),
        });
        let (cache, clock) = cache_with(store.clone(), 5);

        cache.set("decades", &"old").await;
        let stale = store.inner.load("decades").await.unwrap();

        clock.advance(Duration::from_secs(6));
        cache.set("decades", &"new").await;
        *store.captured.lock() = stale;

        // The expired copy is read, so the fresh write is removed with it
        assert_eq!(cache.get::<String>("decades").await, None);
        assert!(store.inner.is_empty());
        assert_eq!(cache.get::<String>("decades").await, None);
    }

    #[tokio::test]
    async fn test_storage_faults_degrade_to_miss() {
        let (cache, _clock) = cache_with(Arc::new(BrokenStore), 5);

        cache.set("k", &1u32).await;
        assert_eq!(cache.get::<u32>("k").await, None);
    }

    #[test]
    fn test_zero_ttl_is_configuration_error() {
        let result = ExpiringCache::new(
            Arc::new(MemoryStore::new()),
            Duration::ZERO,
            Arc::new(ManualClock::at_epoch()),
        );
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
