//! HTTP transports
//!
//! A `Transport` sends one fully-formed request and returns one response.
//! `reqwest::Client` is the real transport; `CachingTransport` decorates any
//! other transport with an ETag-revalidating disk cache.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ETAG, IF_NONE_MATCH};
use reqwest::{Request, Response, ResponseBuilderExt, StatusCode, Url, Version};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::codec::{self, CacheRecord, CodecError};
use crate::cache::config::{CacheConfig, ConfigError};
use crate::cache::eviction::SizeCeiling;
use crate::cache::key::{cache_key, is_cacheable};
use crate::cache::store::{ContentStore, DiskStore, StoreError};

/// Errors a transport hands back to its caller
#[derive(Debug, Error)]
pub enum TransportError {
    /// The network call failed (connection, TLS, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A response could not be assembled from its parts
    #[error("Failed to build response: {0}")]
    Response(#[from] http::Error),
}

/// Send one request, get one response
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, request: Request) -> Result<Response, TransportError>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn round_trip(&self, request: Request) -> Result<Response, TransportError> {
        Ok(self.execute(request).await?)
    }
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn round_trip(&self, request: Request) -> Result<Response, TransportError> {
        (**self).round_trip(request).await
    }
}

/// A response read back from the store, already validated so it can be
/// turned into a `Response` without further checks
struct CachedResponse {
    etag: String,
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl CachedResponse {
    fn from_record(record: CacheRecord) -> Result<Self, CodecError> {
        Ok(Self {
            status: record.status()?,
            version: record.version()?,
            headers: record.header_map()?,
            etag: record.etag,
            body: Bytes::from(record.body),
        })
    }
}

/// Transport decorator that caches GET responses on disk
///
/// Every GET is first looked up by its URL. A hit turns the request into a
/// conditional one (`If-None-Match`); a `304 Not Modified` answer is replaced
/// by the stored response. `200 OK` responses carrying an `ETag` are
/// stored, replacing any earlier entry for the same URL.
///
/// Failures of the cache itself (I/O, corrupt entries, a full disk) are
/// logged and otherwise ignored. Network errors from the inner transport are
/// returned unchanged.
pub struct CachingTransport<T, S = DiskStore> {
    inner: T,
    store: S,
    ceiling: SizeCeiling,
}

impl<T> CachingTransport<T, DiskStore> {
    /// Creates a disk-backed caching transport from configuration
    pub fn from_config(inner: T, config: &CacheConfig) -> Result<Self, ConfigError> {
        let store = DiskStore::new(config.resolve_dir()?);
        Ok(Self::new(inner, store, SizeCeiling::new(config.resolve_size_max())))
    }
}

impl<T, S> CachingTransport<T, S> {
    pub fn new(inner: T, store: S, ceiling: SizeCeiling) -> Self {
        Self {
            inner,
            store,
            ceiling,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T, S> fmt::Debug for CachingTransport<T, S>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingTransport")
            .field("store", &self.store)
            .field("ceiling", &self.ceiling)
            .finish_non_exhaustive()
    }
}

impl<T, S> CachingTransport<T, S>
where
    T: Transport,
    S: ContentStore,
{
    /// Read and decode the entry for `key`. Anything short of a usable
    /// record counts as a miss.
    async fn lookup(&self, key: &str, url: &Url) -> Option<CachedResponse> {
        let bytes = match self.store.get(key).await {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound(_)) => {
                debug!(%url, "no cache entry, doing request without etag");
                return None;
            }
            Err(e) => {
                warn!(%url, error = %e, "failed to read cache entry");
                return None;
            }
        };

        let cached = codec::decode(&bytes).and_then(CachedResponse::from_record);
        match cached {
            Ok(cached) if !cached.etag.is_empty() => {
                debug!(%url, etag = %cached.etag, "found etag for request");
                Some(cached)
            }
            Ok(_) => {
                warn!(%url, "ignoring cache entry without etag");
                None
            }
            Err(e) => {
                warn!(%url, error = %e, "ignoring corrupt cache entry");
                None
            }
        }
    }

    /// Persist a record, evicting first if the store is over its ceiling.
    /// Failures only cost future hits.
    async fn persist(&self, key: &str, url: &Url, record: &CacheRecord) {
        if let Err(e) = self.ceiling.enforce(&self.store).await {
            warn!(%url, error = %e, "failed to enforce cache size ceiling");
        }

        let encoded = match codec::encode(record) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(%url, error = %e, "failed to encode cache record");
                return;
            }
        };

        match self.store.put(key, &encoded).await {
            Ok(()) => debug!(%url, etag = %record.etag, "stored response in cache"),
            Err(e) => warn!(%url, error = %e, "failed to write cache entry"),
        }
    }
}

#[async_trait]
impl<T, S> Transport for CachingTransport<T, S>
where
    T: Transport,
    S: ContentStore,
{
    async fn round_trip(&self, mut request: Request) -> Result<Response, TransportError> {
        if !is_cacheable(request.method()) {
            return self.inner.round_trip(request).await;
        }

        let url = request.url().clone();
        let key = cache_key(&url);

        let cached = self.lookup(&key, &url).await;
        let cached = cached.and_then(|cached| match HeaderValue::from_str(&cached.etag) {
            Ok(etag) => {
                request.headers_mut().insert(IF_NONE_MATCH, etag);
                Some(cached)
            }
            Err(_) => {
                warn!(%url, "cached etag is not a valid header value");
                None
            }
        });

        let response = self.inner.round_trip(request).await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            return match cached {
                Some(cached) => {
                    debug!(%url, "not modified, returning cached body");
                    let response_url = response.url().clone();
                    build_response(
                        cached.status,
                        cached.version,
                        cached.headers,
                        response_url,
                        cached.body,
                    )
                }
                None => {
                    warn!(%url, "got 304 without a cached entry, returning it unchanged");
                    Ok(response)
                }
            };
        }

        // Partial and other non-200 successes must never be served for a
        // plain GET later on
        if status != StatusCode::OK {
            if status.is_success() {
                debug!(%url, %status, "not caching non-200 response");
            }
            return Ok(response);
        }

        let version = response.version();
        let headers = response.headers().clone();
        let response_url = response.url().clone();
        let body = response.bytes().await?;

        let etag = headers
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if etag.is_empty() {
            debug!(%url, "response has no etag, not caching");
        } else {
            let record = CacheRecord::from_parts(etag, status, version, &headers, body.to_vec());
            self.persist(&key, &url, &record).await;
        }

        build_response(status, version, headers, response_url, body)
    }
}

/// Assemble a response with a fully buffered, re-readable body
fn build_response(
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    url: Url,
    body: Bytes,
) -> Result<Response, TransportError> {
    let mut builder = http::Response::builder()
        .status(status)
        .version(version)
        .url(url);
    if let Some(map) = builder.headers_mut() {
        *map = headers;
    }
    Ok(Response::from(builder.body(body)?))
}
