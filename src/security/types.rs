//! Validation types: the validated URL newtype and its failure taxonomy.

use std::fmt;

use thiserror::Error;
use url::Url;

/// Reasons a URL is refused before any network traffic happens.
///
/// The `Display` text is user-facing and is surfaced verbatim by callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The input could not be parsed as an absolute URL, or has no host.
    #[error("Invalid URL format: {reason}")]
    InvalidFormat {
        /// Parser or structural complaint
        reason: String,
    },

    /// Anything other than http:// or https://.
    #[error("Unsupported URL scheme '{scheme}' (only http and https are allowed)")]
    UnsupportedScheme {
        /// Scheme found in the input
        scheme: String,
    },

    /// The host is a loopback, private, link-local, or cloud metadata target.
    #[error("Hostname '{host}' is not allowed")]
    HostnameBlocked {
        /// Host as it appeared after parsing
        host: String,
    },

    /// `user:pass@` components are present.
    #[error("URLs with embedded credentials are not allowed")]
    CredentialsInUrl,
}

/// A URL that passed [`validate`](crate::security::validate).
///
/// The inner value is private: the only way to obtain a `SafeUrl` is through
/// the validator, so holding one is proof the checks ran.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafeUrl(Url);

impl SafeUrl {
    pub(super) fn new(url: Url) -> Self {
        SafeUrl(url)
    }

    /// Borrow the parsed URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// The serialized URL.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Host component (always present for a validated URL).
    pub fn host_str(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// Unwrap into the parsed URL.
    pub fn into_url(self) -> Url {
        self.0
    }
}

impl fmt::Display for SafeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for SafeUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
