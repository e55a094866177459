//! Configuration constants.
//!
//! This module defines the defaults and hard limits used throughout the crate:
//! fetch budgets, resolver limits, rate limiting, and request identity.

use std::time::Duration;

// Fetch budgets (defaults for `FetchConfig`)
/// Maximum accepted image size in megabytes
pub const DEFAULT_MAX_SIZE_MB: u64 = 15;
/// Per-phase network timeout in milliseconds (probe and transfer each get their own)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Maximum number of redirect hops followed during a single fetch
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
/// Bytes per megabyte used for size budgets
pub const BYTES_PER_MB: u64 = 1024 * 1024;

// Profile page resolution
/// Fixed timeout for fetching a profile page, independent of the image budget
pub const PROFILE_PAGE_TIMEOUT: Duration = Duration::from_secs(5);
/// Maximum HTML body size read while looking for an image reference (2MB)
pub const MAX_PROFILE_PAGE_SIZE: usize = 2 * 1024 * 1024;
/// Redirect hops allowed while fetching a profile page
pub const PROFILE_PAGE_MAX_REDIRECTS: usize = 5;

/// Path suffixes treated as direct image references (no page resolution needed)
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "svg", "avif", "tif", "tiff", "ico", "heic",
    "heif",
];

// Rate limiting
/// Requests allowed per client per window
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 10;
/// Length of a rate-limit window
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

// Response limits
/// Maximum number of response headers kept per response.
/// Excess headers are dropped (header bomb protection).
pub const MAX_HEADER_COUNT: usize = 100;
/// Maximum length in bytes of a header value in the persisted header list
pub const MAX_HEADER_VALUE_LENGTH: usize = 1000;

/// Default database path (SQLite file)
pub const DB_PATH: &str = "./image_provenance.db";

/// Default User-Agent string for HTTP requests.
///
/// Mirrors a current desktop Chrome build. Several image CDNs reject requests
/// whose User-Agent does not look like a browser.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// HTTP status codes (for clarity and consistency)
/// Probe rejected: the server does not support HEAD
pub const HTTP_STATUS_METHOD_NOT_ALLOWED: u16 = 405;
/// Probe rejected: HEAD not implemented
pub const HTTP_STATUS_NOT_IMPLEMENTED: u16 = 501;
/// Statuses treated as redirects by the manual redirect walker
pub const REDIRECT_STATUSES: &[u16] = &[301, 302, 303, 307, 308];
