//! Size-bounded eviction
//!
//! Eviction is all or nothing: once the store grows past its ceiling every
//! entry is dropped. There is no per-entry expiry and no LRU bookkeeping.

use tracing::debug;

use super::store::{ContentStore, StoreResult};

/// Default ceiling for the on-disk cache (100 MiB)
pub const DEFAULT_CACHE_SIZE_MAX: u64 = 100 * 1024 * 1024;

/// Clears the whole store once it holds more than `max_bytes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeCeiling {
    max_bytes: u64,
}

impl Default for SizeCeiling {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE_MAX)
    }
}

impl SizeCeiling {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Check the store size and clear it if the ceiling is exceeded
    ///
    /// Meant to run right before a write, so the new record lands in an
    /// emptied store.
    ///
    /// # Returns
    /// * `Ok(true)` if the store was cleared
    /// * `Ok(false)` if the store is within the ceiling
    /// * `Err` if measuring or clearing the store failed
    pub async fn enforce<S>(&self, store: &S) -> StoreResult<bool>
    where
        S: ContentStore + ?Sized,
    {
        let used = store.total_size().await?;
        if used <= self.max_bytes {
            return Ok(false);
        }

        debug!(used, max = self.max_bytes, "cache size ceiling exceeded, clearing");
        store.clear().await?;
        Ok(true)
    }
}
