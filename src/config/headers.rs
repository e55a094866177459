//! HTTP header name constants.
//!
//! Header names are lower-case: `ResponseHeaders` normalizes keys on insert,
//! so lookups with these constants are exact matches.

// Provenance headers compared by the change detector
/// Entity tag
pub const HEADER_ETAG: &str = "etag";
/// Last modification date as reported by the origin
pub const HEADER_LAST_MODIFIED: &str = "last-modified";

// Gating headers
/// Declared media type
pub const HEADER_CONTENT_TYPE: &str = "content-type";
/// Declared body length
pub const HEADER_CONTENT_LENGTH: &str = "content-length";
/// Redirect target
pub const HEADER_LOCATION: &str = "location";

// Infrastructure/CDN identification
/// Server software
pub const HEADER_SERVER: &str = "server";
/// Caching policy
pub const HEADER_CACHE_CONTROL: &str = "cache-control";
/// Seconds the object has spent in a shared cache
pub const HEADER_AGE: &str = "age";
/// Cache status
pub const HEADER_X_CACHE: &str = "x-cache";
/// Proxy chain information
pub const HEADER_VIA: &str = "via";

/// Media types accepted in addition to `image/*`
pub const GENERIC_BINARY_CONTENT_TYPE: &str = "application/octet-stream";
/// Prefix accepted for image media types
pub const IMAGE_CONTENT_TYPE_PREFIX: &str = "image/";
/// Media type a profile page must declare for markup extraction
pub const HTML_CONTENT_TYPE: &str = "text/html";

/// Accept header sent when probing or downloading an image
pub const ACCEPT_IMAGE: &str =
    "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8";
/// Accept header sent when loading a profile page
pub const ACCEPT_DOCUMENT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
/// Accept-Language header sent with every request
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
