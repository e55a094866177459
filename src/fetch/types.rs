//! Fetch result types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use super::error::FetchError;
use crate::config::{MAX_HEADER_COUNT, MAX_HEADER_VALUE_LENGTH};

/// Case-insensitive, insertion-ordered response header map.
///
/// Keys are lower-cased on insert, so lookups ignore case. Repeated headers
/// keep every value; `get` returns the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseHeaders(Vec<(String, String)>);

impl ResponseHeaders {
    /// Empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header. The value is kept intact.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0.push((name.as_ref().to_ascii_lowercase(), value.into()));
    }

    /// Copy for persistence with each value cut to `MAX_HEADER_VALUE_LENGTH`
    /// bytes (on a char boundary).
    ///
    /// Only for storing the full header list. Redirects, gates and change
    /// detection read the untruncated values.
    pub fn truncated_for_storage(&self) -> Self {
        ResponseHeaders(
            self.0
                .iter()
                .map(|(name, value)| (name.clone(), truncate_value(value).to_string()))
                .collect(),
        )
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// True if at least one value exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates `(name, value)` pairs in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of stored header values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no headers are stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copies a reqwest header map, keeping at most `MAX_HEADER_COUNT` entries.
    ///
    /// Values that are not valid visible ASCII are stored as an empty string.
    pub fn from_header_map(headers: &reqwest::header::HeaderMap) -> Self {
        if headers.len() > MAX_HEADER_COUNT {
            log::warn!(
                "Response has {} headers (limit: {}), ignoring excess headers",
                headers.len(),
                MAX_HEADER_COUNT
            );
        }
        let mut map = ResponseHeaders::new();
        for (name, value) in headers.iter().take(MAX_HEADER_COUNT) {
            map.insert(name.as_str(), value.to_str().unwrap_or_default());
        }
        map
    }
}

fn truncate_value(value: &str) -> &str {
    if value.len() <= MAX_HEADER_VALUE_LENGTH {
        return value;
    }
    let mut cut = MAX_HEADER_VALUE_LENGTH;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    &value[..cut]
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ResponseHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ResponseHeaders::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// Ordered list of URLs visited during one fetch, original first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedirectChain(Vec<String>);

impl RedirectChain {
    /// Starts a chain at the originally requested URL.
    pub fn starting_at(url: impl Into<String>) -> Self {
        RedirectChain(vec![url.into()])
    }

    pub(crate) fn push(&mut self, url: impl Into<String>) {
        self.0.push(url.into());
    }

    /// Redirects followed so far.
    pub fn hops(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// All URLs in visiting order.
    pub fn urls(&self) -> &[String] {
        &self.0
    }

    /// Last URL reached, if any request was attempted.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Number of URLs in the chain.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when validation failed before any URL was accepted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the chain.
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// A successfully downloaded image payload.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// Full body, bounded by the configured size budget
    pub bytes: Bytes,
    /// Headers of the final response (keys lower-cased)
    pub headers: ResponseHeaders,
    /// URL the body was read from
    pub final_url: Url,
    /// HTTP status of the final response
    pub status: u16,
}

/// Outcome of one `fetch_safely` call.
///
/// The redirect chain is kept on failure so callers can show where the fetch
/// stopped.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URLs visited, original first
    pub redirect_chain: RedirectChain,
    /// Payload or the reason the fetch stopped
    pub outcome: Result<FetchedImage, FetchError>,
}

impl FetchResult {
    /// True if an image body was retrieved.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// User-facing failure message.
    pub fn error_message(&self) -> Option<String> {
        self.outcome.as_ref().err().map(ToString::to_string)
    }

    /// Borrow the payload on success.
    pub fn image(&self) -> Option<&FetchedImage> {
        self.outcome.as_ref().ok()
    }

    /// Borrow the error on failure.
    pub fn error(&self) -> Option<&FetchError> {
        self.outcome.as_ref().err()
    }
}
