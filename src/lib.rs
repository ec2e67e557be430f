//! PhraseApp API client library
//!
//! The interesting part is the HTTP response cache: `transport::CachingTransport`
//! wraps any `Transport` and makes repeated GET requests cheap by storing
//! responses on disk and revalidating them with ETags.

pub mod cache;
pub mod cli;
pub mod client;
pub mod transport;

pub use cache::{CacheConfig, ContentStore, DiskStore};
pub use client::{ApiError, Client, Credentials};
pub use transport::{CachingTransport, Transport, TransportError};
