//! Browser-like request headers.
//!
//! Several image CDNs and social networks reject requests that do not look
//! like they come from a browser. Every outbound request carries the headers
//! a desktop Chrome would send for the same kind of load. The User-Agent is a
//! client default set by the transport.

use crate::config::{ACCEPT_DOCUMENT, ACCEPT_IMAGE, ACCEPT_LANGUAGE};

/// What the request is loading, which decides the `Accept` and `Sec-Fetch-*` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// An `<img>` subresource load
    Image,
    /// A top-level page navigation
    Document,
}

/// Realistic browser request headers.
///
/// - **Accept**: content negotiation matching the load type
/// - **Accept-Language**: common English default
/// - **Sec-Fetch-***: fetch metadata Chrome attaches to every request
/// - **Upgrade-Insecure-Requests**: only sent for navigations
pub(crate) struct RequestHeaders;

impl RequestHeaders {
    /// Returns headers as `(name, value)` pairs for the given load type.
    pub(crate) fn as_vec(kind: RequestKind) -> Vec<(String, String)> {
        let pairs: &[(&str, &str)] = match kind {
            RequestKind::Image => &[
                ("accept", ACCEPT_IMAGE),
                ("accept-language", ACCEPT_LANGUAGE),
                ("sec-fetch-dest", "image"),
                ("sec-fetch-mode", "no-cors"),
                ("sec-fetch-site", "cross-site"),
            ],
            RequestKind::Document => &[
                ("accept", ACCEPT_DOCUMENT),
                ("accept-language", ACCEPT_LANGUAGE),
                ("sec-fetch-dest", "document"),
                ("sec-fetch-mode", "navigate"),
                ("sec-fetch-site", "none"),
                ("sec-fetch-user", "?1"),
                ("upgrade-insecure-requests", "1"),
            ],
        };
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }
}
