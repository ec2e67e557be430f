//! HTTP response cache
//!
//! Persists GET responses to disk keyed by URL and revalidates them with
//! `If-None-Match`. Everything in here is best effort: any failure degrades
//! to a cache miss and is never surfaced to the caller of the transport.

pub mod codec;
pub mod config;
pub mod eviction;
pub mod key;
pub mod store;

pub use codec::{CacheRecord, CodecError};
pub use config::{CacheConfig, ConfigError};
pub use eviction::{SizeCeiling, DEFAULT_CACHE_SIZE_MAX};
pub use key::{cache_key, is_cacheable};
pub use store::{ContentStore, DiskStore, StoreError};
