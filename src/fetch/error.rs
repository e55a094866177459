//! Fetch failure taxonomy.

use std::fmt;

use thiserror::Error;

use super::transport::TransportError;
use crate::security::ValidationError;

/// Which network phase a timeout interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// HEAD probe, including its redirect hops
    Probe,
    /// GET transfer, including body streaming
    Transfer,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchPhase::Probe => f.write_str("Probe request"),
            FetchPhase::Transfer => f.write_str("Download"),
        }
    }
}

/// Reasons a safe fetch stops.
///
/// The `Display` text is user-facing; `code()` is a stable identifier for
/// storage and logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The requested URL failed validation; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A redirect pointed somewhere the validator refuses.
    #[error("Redirect to {url} was blocked: {reason}")]
    RedirectBlocked {
        /// Resolved redirect target (never contacted)
        url: String,
        /// Why the validator refused it
        reason: ValidationError,
    },

    /// A 3xx response without a Location header.
    #[error("Redirect response {status} from {url} has no Location header")]
    MissingLocationHeader {
        /// Redirect status received
        status: u16,
        /// URL that answered with the redirect
        url: String,
    },

    /// The redirect budget ran out before a final response.
    #[error("Too many redirects (limit is {max})")]
    TooManyRedirects {
        /// Configured hop budget
        max: usize,
    },

    /// The server declared something other than an image.
    #[error("Unsupported content type '{content_type}' (expected an image)")]
    InvalidContentType {
        /// Declared media type, or "(missing)"
        content_type: String,
    },

    /// Content-Length announced a body above the budget; no transfer happened.
    #[error("Declared size of {declared} bytes exceeds the {limit} byte limit")]
    DeclaredTooLarge {
        /// Content-Length value
        declared: u64,
        /// Budget in bytes
        limit: u64,
    },

    /// The streamed body crossed the budget; the download was aborted.
    #[error("Image exceeds the {limit} byte limit (aborted after {received} bytes)")]
    ActualTooLarge {
        /// Budget in bytes
        limit: u64,
        /// Bytes counted when the download was aborted
        received: u64,
    },

    /// Non-success final status.
    #[error("HTTP {status} {status_text}")]
    HttpError {
        /// Status code
        status: u16,
        /// Reason phrase
        status_text: String,
    },

    /// Connection, TLS, DNS or body read failure.
    #[error("Network error: {0}")]
    Network(String),

    /// A phase exceeded its time budget and was cancelled.
    #[error("{phase} timed out after {timeout_ms} ms")]
    Timeout {
        /// Interrupted phase
        phase: FetchPhase,
        /// Budget in milliseconds
        timeout_ms: u64,
    },
}

impl FetchError {
    /// Short code for the error kind (for database storage).
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::Validation(ValidationError::InvalidFormat { .. }) => "invalid_format",
            FetchError::Validation(ValidationError::UnsupportedScheme { .. }) => {
                "unsupported_scheme"
            }
            FetchError::Validation(ValidationError::HostnameBlocked { .. }) => "hostname_blocked",
            FetchError::Validation(ValidationError::CredentialsInUrl) => "credentials_in_url",
            FetchError::RedirectBlocked { .. } => "redirect_blocked",
            FetchError::MissingLocationHeader { .. } => "missing_location_header",
            FetchError::TooManyRedirects { .. } => "too_many_redirects",
            FetchError::InvalidContentType { .. } => "invalid_content_type",
            FetchError::DeclaredTooLarge { .. } => "declared_too_large",
            FetchError::ActualTooLarge { .. } => "actual_too_large",
            FetchError::HttpError { .. } => "http_error",
            FetchError::Network(_) => "network_error",
            FetchError::Timeout { .. } => "timeout",
        }
    }

    /// True for failures decided before any request was sent.
    pub fn is_preflight(&self) -> bool {
        matches!(self, FetchError::Validation(_))
    }
}

impl From<TransportError> for FetchError {
    fn from(e: TransportError) -> Self {
        FetchError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_blocked_message_names_target() {
        let err = FetchError::RedirectBlocked {
            url: "http://10.0.0.5/secret".to_string(),
            reason: ValidationError::HostnameBlocked {
                host: "10.0.0.5".to_string(),
            },
        };
        let message = err.to_string();
        assert!(message.contains("http://10.0.0.5/secret"));
        assert!(message.contains("10.0.0.5"));
        assert_eq!(err.code(), "redirect_blocked");
    }

    #[test]
    fn test_validation_errors_are_preflight() {
        let err = FetchError::from(ValidationError::CredentialsInUrl);
        assert!(err.is_preflight());
        assert_eq!(err.code(), "credentials_in_url");
        assert_eq!(err.to_string(), ValidationError::CredentialsInUrl.to_string());
        assert!(!FetchError::Network("reset".into()).is_preflight());
    }

    #[test]
    fn test_timeout_message_names_phase() {
        let err = FetchError::Timeout {
            phase: FetchPhase::Transfer,
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "Download timed out after 250 ms");
    }
}
