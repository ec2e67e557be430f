//! Cache key derivation

use md5::{Digest, Md5};
use reqwest::{Method, Url};

/// Only GET responses are cached. Every other method goes straight to the
/// network.
pub fn is_cacheable(method: &Method) -> bool {
    method == Method::GET
}

/// Derive the storage key for a request URL
///
/// The key is the hex-encoded MD5 digest of the URL exactly as it is sent,
/// including the query string.
pub fn cache_key(url: &Url) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
