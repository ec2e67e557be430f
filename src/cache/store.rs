//! Content store for persisting cache records to disk
//!
//! Provides the `ContentStore` trait, an opaque key to bytes map with a size
//! measurement, and `DiskStore`, which keeps one file per key under a root
//! directory (`~/.cache/phraseapp/` on Linux by default).

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Errors that can occur when accessing a content store
#[derive(Debug, Error)]
pub enum StoreError {
    /// No value is stored under the key
    #[error("No cache entry for key: {0}")]
    NotFound(String),

    /// The key cannot be used as a storage name
    #[error("Invalid cache key: '{0}'")]
    InvalidKey(String),

    /// Filesystem access failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable key to bytes storage shared by every request going through a
/// caching transport.
///
/// Implementations must make `put` atomic per key: a concurrent reader sees
/// either the old value or the new one, never a mix.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Read the value stored under `key`
    ///
    /// Returns `StoreError::NotFound` if nothing is stored for the key.
    async fn get(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Total number of bytes currently used by the store
    async fn total_size(&self) -> StoreResult<u64>;

    /// Delete every stored value
    async fn clear(&self) -> StoreResult<()>;
}

/// Distinguishes temp files of concurrent writers within one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Filesystem-backed content store
///
/// Each key maps to `<root>/<key>`. Values are written to a temp file in the
/// same directory and renamed into place, so a key is never observed half
/// written.
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Directory where cache files are stored
    root: PathBuf,
}

impl DiskStore {
    /// Creates a store rooted at `root`
    ///
    /// The directory is created lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the cache files
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path to the file for the given key
    fn entry_path(&self, key: &str) -> StoreResult<PathBuf> {
        if !is_valid_key(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!(".{}.{}.{}.tmp", key, std::process::id(), seq))
    }
}

/// Keys become file names, so only ASCII alphanumerics, `-` and `_` are allowed.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[async_trait]
impl ContentStore for DiskStore {
    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.entry_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let path = self.entry_path(key)?;
        fs::create_dir_all(&self.root).await?;

        let temp_path = self.temp_path(key);
        if let Err(e) = fs::write(&temp_path, value).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(key, bytes = value.len(), "wrote cache entry");
        Ok(())
    }

    async fn total_size(&self) -> StoreResult<u64> {
        dir_size(&self.root).await
    }

    async fn clear(&self) -> StoreResult<()> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sum of the sizes of all files below `root`. A missing root counts as empty.
async fn dir_size(root: &Path) -> StoreResult<u64> {
    let mut total = 0u64;
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // Removed by a concurrent clear or rename
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if metadata.is_dir() {
                pending.push(entry.path());
            } else {
                total += metadata.len();
            }
        }
    }

    Ok(total)
}
