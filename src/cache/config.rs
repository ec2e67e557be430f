//! Cache configuration

use std::path::PathBuf;

use directories::ProjectDirs;
use thiserror::Error;

use super::eviction::DEFAULT_CACHE_SIZE_MAX;

/// Errors that can occur when resolving the cache configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No cache directory was given and the platform has none (e.g., no home directory)
    #[error("Could not determine a cache directory; pass one explicitly")]
    NoCacheDir,
}

/// Where the response cache lives and how large it may grow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Cache directory; `None` uses the platform cache directory
    pub cache_dir: Option<PathBuf>,
    /// Store size in bytes above which the whole cache is cleared; 0 uses the default
    pub cache_size_max: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache_size_max: DEFAULT_CACHE_SIZE_MAX,
        }
    }
}

impl CacheConfig {
    /// Creates a config with a custom cache directory and the default size ceiling
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: Some(cache_dir.into()),
            ..Self::default()
        }
    }

    /// Returns a copy with the given size ceiling
    pub fn with_size_max(mut self, cache_size_max: u64) -> Self {
        self.cache_size_max = cache_size_max;
        self
    }

    /// Directory the store is rooted at
    ///
    /// An explicit `cache_dir` gets a `phraseapp` subdirectory, so the store
    /// never clears files it does not own. Without one, the XDG-compliant
    /// `~/.cache/phraseapp/` (or platform equivalent) is used.
    pub fn resolve_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.join("phraseapp")),
            None => ProjectDirs::from("", "", "phraseapp")
                .map(|dirs| dirs.cache_dir().to_path_buf())
                .ok_or(ConfigError::NoCacheDir),
        }
    }

    /// Effective size ceiling in bytes
    pub fn resolve_size_max(&self) -> u64 {
        if self.cache_size_max == 0 {
            DEFAULT_CACHE_SIZE_MAX
        } else {
            self.cache_size_max
        }
    }
}
