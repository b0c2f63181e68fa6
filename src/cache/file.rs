use crate::cache::store::{CacheError, CacheStore};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// One JSON file per entry inside a cache directory.
///
/// File names are the SHA-256 of the key, so request-derived keys can never
/// escape the directory. Writes land in a temporary file that is renamed over
/// the target, so readers see either the old entry or the new one.
#[derive(Debug)]
pub struct FileStore {
    directory: PathBuf,
    write_seq: AtomicU64,
}

impl FileStore {
    /// Create the store, creating `directory` if it does not exist.
    pub async fn open(directory: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await?;

        tracing::info!(directory = %directory.display(), "File cache store opened");

        Ok(Self {
            directory,
            write_seq: AtomicU64::new(0),
        })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.directory.join(format!("{:x}.json", digest))
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match tokio::fs::read(self.entry_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        let target = self.entry_path(key);
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = target.with_extension(format!("{}.{}.tmp", std::process::id(), seq));

        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
