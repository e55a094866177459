//! Provenance signals carried by HTTP response headers.

use serde::{Deserialize, Serialize};

use crate::config::{
    HEADER_AGE, HEADER_CACHE_CONTROL, HEADER_CONTENT_LENGTH, HEADER_CONTENT_TYPE, HEADER_ETAG,
    HEADER_LAST_MODIFIED, HEADER_SERVER, HEADER_VIA, HEADER_X_CACHE,
};
use crate::fetch::ResponseHeaders;

/// Where an image came from and how it was cached on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// ETag observed
    pub etag: Option<String>,
    /// Last-Modified observed
    pub last_modified: Option<String>,
    /// Declared media type
    pub content_type: Option<String>,
    /// Declared length; the actual size is in `ByteStats`
    pub content_length: Option<u64>,
    /// Server header
    pub server: Option<String>,
    /// Cache-Control header
    pub cache_control: Option<String>,
    /// Age header (seconds in a shared cache)
    pub age: Option<String>,
    /// X-Cache header (CDN hit/miss)
    pub x_cache: Option<String>,
    /// Via header (proxies on the path)
    pub via: Option<String>,
}

impl Provenance {
    /// Picks the provenance headers out of a response.
    pub fn from_headers(headers: &ResponseHeaders) -> Self {
        let get = |name: &str| headers.get(name).map(str::to_string);
        Provenance {
            etag: get(HEADER_ETAG),
            last_modified: get(HEADER_LAST_MODIFIED),
            content_type: get(HEADER_CONTENT_TYPE),
            content_length: headers
                .get(HEADER_CONTENT_LENGTH)
                .and_then(|v| v.trim().parse().ok()),
            server: get(HEADER_SERVER),
            cache_control: get(HEADER_CACHE_CONTROL),
            age: get(HEADER_AGE),
            x_cache: get(HEADER_X_CACHE),
            via: get(HEADER_VIA),
        }
    }

    /// True when the response passed through a cache or CDN.
    pub fn served_by_cache(&self) -> bool {
        self.age.is_some()
            || self.via.is_some()
            || self
                .x_cache
                .as_deref()
                .is_some_and(|v| v.to_ascii_lowercase().contains("hit"))
    }
}
