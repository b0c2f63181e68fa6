use crate::cache::store::{CacheError, CacheStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-process store; entries live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        self.entries.write().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_remove() {
        let store = MemoryStore::new();
        assert!(store.load("k").await.unwrap().is_none());

        store.save("k", b"one".to_vec()).await.unwrap();
        store.save("k", b"two".to_vec()).await.unwrap();
        assert_eq!(store.load("k").await.unwrap().as_deref(), Some(&b"two"[..]));
        assert_eq!(store.len(), 1);

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.is_empty());
    }
}
