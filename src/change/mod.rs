//! Change detection between two observations of the same URL.
//!
//! Content is ground truth: a different digest is always `content_changed`.
//! Only when the bytes match do the validator headers (ETag, Last-Modified)
//! decide between `headers_changed` and `unchanged`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

use crate::config::{HEADER_ETAG, HEADER_LAST_MODIFIED};
use crate::fetch::ResponseHeaders;

/// Classification of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIterMacro)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// First observation, recorded when the report is created
    Initial,
    /// Same bytes, same validator headers
    Unchanged,
    /// Different bytes
    ContentChanged,
    /// Same bytes, different ETag or Last-Modified
    HeadersChanged,
}

impl ChangeType {
    /// Stable snake_case name (storage and JSON form).
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Initial => "initial",
            ChangeType::Unchanged => "unchanged",
            ChangeType::ContentChanged => "content_changed",
            ChangeType::HeadersChanged => "headers_changed",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown change type name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown change type '{0}'")]
pub struct ParseChangeTypeError(pub String);

impl FromStr for ChangeType {
    type Err = ParseChangeTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(ChangeType::Initial),
            "unchanged" => Ok(ChangeType::Unchanged),
            "content_changed" => Ok(ChangeType::ContentChanged),
            "headers_changed" => Ok(ChangeType::HeadersChanged),
            other => Err(ParseChangeTypeError(other.to_string())),
        }
    }
}

/// What one observation of a URL is compared on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fingerprint {
    /// Lower-case hex SHA-256 of the body
    pub content_hash: String,
    /// ETag header, if sent
    pub etag: Option<String>,
    /// Last-Modified header, if sent
    pub last_modified: Option<String>,
}

impl Fingerprint {
    /// Builds a fingerprint from a digest and the response headers.
    pub fn from_headers(content_hash: impl Into<String>, headers: &ResponseHeaders) -> Self {
        Fingerprint {
            content_hash: content_hash.into(),
            etag: headers.get(HEADER_ETAG).map(str::to_string),
            last_modified: headers.get(HEADER_LAST_MODIFIED).map(str::to_string),
        }
    }
}

/// Classifies the difference between two observations.
///
/// A header that is present on one side and absent on the other counts as a
/// difference.
pub fn classify(previous: &Fingerprint, current: &Fingerprint) -> ChangeType {
    if previous.content_hash != current.content_hash {
        ChangeType::ContentChanged
    } else if previous.etag != current.etag || previous.last_modified != current.last_modified {
        ChangeType::HeadersChanged
    } else {
        ChangeType::Unchanged
    }
}

/// Header-map form of [`classify`].
pub fn classify_change(
    previous_hash: &str,
    previous_headers: &ResponseHeaders,
    current_hash: &str,
    current_headers: &ResponseHeaders,
) -> ChangeType {
    classify(
        &Fingerprint::from_headers(previous_hash, previous_headers),
        &Fingerprint::from_headers(current_hash, current_headers),
    )
}

/// One entry in a report's check history. Events are appended, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Row id
    pub id: i64,
    /// Report this check belongs to
    pub report_id: i64,
    /// When the check completed
    pub checked_at: DateTime<Utc>,
    /// Body digest observed by this check
    pub content_hash: String,
    /// Classification against the previous observation
    pub change_type: ChangeType,
    /// ETag observed by this check
    pub etag: Option<String>,
    /// Last-Modified observed by this check
    pub last_modified: Option<String>,
}

impl ChangeEvent {
    /// The observation this event recorded, for comparison with the next one.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            content_hash: self.content_hash.clone(),
            etag: self.etag.clone(),
            last_modified: self.last_modified.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::headers;
    use strum::IntoEnumIterator;

    fn fp(hash: &str, etag: Option<&str>, last_modified: Option<&str>) -> Fingerprint {
        Fingerprint {
            content_hash: hash.to_string(),
            etag: etag.map(str::to_string),
            last_modified: last_modified.map(str::to_string),
        }
    }

    #[test]
    fn test_identical_observations_are_unchanged() {
        let a = fp("h1", Some("\"v1\""), Some("Mon, 01 Jan 2024 00:00:00 GMT"));
        assert_eq!(classify(&a, &a.clone()), ChangeType::Unchanged);
        assert_eq!(classify(&fp("h1", None, None), &fp("h1", None, None)), ChangeType::Unchanged);
    }

    #[test]
    fn test_content_wins_over_headers() {
        let previous = fp("h1", Some("\"v1\""), None);
        let current = fp("h2", Some("\"v1\""), None);
        assert_eq!(classify(&previous, &current), ChangeType::ContentChanged);

        let current = fp("h2", Some("\"v2\""), Some("later"));
        assert_eq!(classify(&previous, &current), ChangeType::ContentChanged);
    }

    #[test]
    fn test_header_differences() {
        let previous = fp("h1", Some("\"v1\""), Some("t1"));
        assert_eq!(
            classify(&previous, &fp("h1", Some("\"v2\""), Some("t1"))),
            ChangeType::HeadersChanged
        );
        assert_eq!(
            classify(&previous, &fp("h1", Some("\"v1\""), Some("t2"))),
            ChangeType::HeadersChanged
        );
        // Losing a header is a change too
        assert_eq!(
            classify(&previous, &fp("h1", None, Some("t1"))),
            ChangeType::HeadersChanged
        );
    }

    #[test]
    fn test_classify_change_reads_headers_case_insensitively() {
        let before = headers(&[("ETag", "\"a\""), ("Last-Modified", "t1")]);
        let same = headers(&[("etag", "\"a\""), ("last-modified", "t1")]);
        let newer = headers(&[("ETag", "\"b\""), ("Last-Modified", "t1")]);

        assert_eq!(classify_change("h", &before, "h", &same), ChangeType::Unchanged);
        assert_eq!(classify_change("h", &before, "h", &newer), ChangeType::HeadersChanged);
        assert_eq!(classify_change("h", &before, "x", &same), ChangeType::ContentChanged);
    }

    #[test]
    fn test_change_type_names_round_trip() {
        for change_type in ChangeType::iter() {
            assert_eq!(change_type.as_str().parse::<ChangeType>(), Ok(change_type));
            let json = serde_json::to_string(&change_type).unwrap();
            assert_eq!(json, format!("\"{}\"", change_type.as_str()));
        }
        assert!("modified".parse::<ChangeType>().is_err());
    }

    #[test]
    fn test_event_fingerprint() {
        let event = ChangeEvent {
            id: 1,
            report_id: 7,
            checked_at: Utc::now(),
            content_hash: "h".to_string(),
            change_type: ChangeType::Initial,
            etag: Some("\"e\"".to_string()),
            last_modified: None,
        };
        assert_eq!(event.fingerprint(), fp("h", Some("\"e\""), None));
    }
}
