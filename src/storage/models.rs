// storage/models.rs
// Report and change-event records

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::change::ChangeType;
use crate::fetch::{RedirectChain, ResponseHeaders};
use crate::forensics::{ImageFormat, Provenance};

/// Where the analyzed bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    /// Fetched from a remote URL (re-checkable)
    Url,
    /// Uploaded directly (no URL to re-check)
    Upload,
}

impl ReportSource {
    /// Stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportSource::Url => "url",
            ReportSource::Upload => "upload",
        }
    }
}

impl std::fmt::Display for ReportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown report source name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown report source '{0}'")]
pub struct ParseReportSourceError(pub String);

impl FromStr for ReportSource {
    type Err = ParseReportSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(ReportSource::Url),
            "upload" => Ok(ReportSource::Upload),
            other => Err(ParseReportSourceError(other.to_string())),
        }
    }
}

/// A report ready for insertion.
///
/// The `reports` table mirrors these fields; `created_at` is stored as
/// milliseconds since the Unix epoch and JSON columns hold the redirect chain,
/// provenance and header list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReport {
    /// URL or upload
    pub source: ReportSource,
    /// URL the caller submitted (URL reports only)
    pub source_url: Option<String>,
    /// Image URL found by profile resolution, when it differed from `source_url`
    pub resolved_url: Option<String>,
    /// URL the bytes were finally read from
    pub final_url: Option<String>,
    /// Client-supplied name (uploads only)
    pub filename: Option<String>,
    /// URLs visited, original first (empty for uploads)
    pub redirect_chain: RedirectChain,
    /// Status of the final response
    pub http_status: Option<u16>,
    /// Lower-case hex SHA-256
    pub content_hash: String,
    /// Body size in bytes
    pub byte_size: u64,
    /// Format recognized from magic bytes
    pub detected_format: Option<ImageFormat>,
    /// Shannon entropy, bits per byte
    pub entropy: f64,
    /// Provenance headers of the final response
    pub provenance: Provenance,
    /// Full header list of the final response
    pub headers: ResponseHeaders,
    /// When the report was created
    pub created_at: DateTime<Utc>,
}

/// A stored report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Row id
    pub id: i64,
    /// URL or upload
    pub source: ReportSource,
    /// URL the caller submitted
    pub source_url: Option<String>,
    /// Image URL found by profile resolution
    pub resolved_url: Option<String>,
    /// URL the bytes were read from
    pub final_url: Option<String>,
    /// Upload file name
    pub filename: Option<String>,
    /// URLs visited, original first (empty for uploads)
    pub redirect_chain: RedirectChain,
    /// Status of the final response
    pub http_status: Option<u16>,
    /// Lower-case hex SHA-256
    pub content_hash: String,
    /// Body size in bytes
    pub byte_size: u64,
    /// Format recognized from magic bytes
    pub detected_format: Option<ImageFormat>,
    /// Media type implied by `detected_format`
    pub mime_type: Option<String>,
    /// Shannon entropy, bits per byte
    pub entropy: f64,
    /// Provenance headers of the final response
    pub provenance: Provenance,
    /// Full header list of the final response
    pub headers: ResponseHeaders,
    /// When the report was created
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// URL a re-check should fetch: the resolved image when resolution
    /// happened, else the submitted URL. `None` for uploads.
    pub fn recheck_target(&self) -> Option<&str> {
        match self.source {
            ReportSource::Upload => None,
            ReportSource::Url => self
                .resolved_url
                .as_deref()
                .or(self.source_url.as_deref()),
        }
    }
}

/// A change event ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChangeEvent {
    /// Report the check belongs to
    pub report_id: i64,
    /// When the check completed
    pub checked_at: DateTime<Utc>,
    /// Lower-case hex SHA-256
    pub content_hash: String,
    /// Classification against the previous observation
    pub change_type: ChangeType,
    /// ETag observed
    pub etag: Option<String>,
    /// Last-Modified observed
    pub last_modified: Option<String>,
}
