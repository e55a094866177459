//! Orchestrator failures.

use thiserror::Error;

use crate::fetch::{FetchError, RedirectChain};

/// Reasons an analysis, re-check or history lookup fails.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The client used up its request budget for the current window.
    #[error("Rate limit exceeded for '{client}', try again later")]
    RateLimited {
        /// Client key that was refused
        client: String,
    },

    /// The image could not be fetched.
    #[error("{error}")]
    Fetch {
        /// Why the fetch stopped
        #[source]
        error: FetchError,
        /// URLs visited before it stopped
        redirect_chain: RedirectChain,
    },

    /// Uploaded bytes exceed the size budget.
    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    UploadTooLarge {
        /// Upload size
        size: u64,
        /// Budget in bytes
        limit: u64,
    },

    /// Uploaded file has no content.
    #[error("Upload is empty")]
    EmptyUpload,

    /// No report with this id.
    #[error("Report {0} not found")]
    ReportNotFound(i64),

    /// The report came from an upload and has no URL to fetch again.
    #[error("Report {0} was uploaded and cannot be re-checked")]
    NotRecheckable(i64),

    /// Database failure.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl AnalysisError {
    /// Stable identifier for the failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::RateLimited { .. } => "rate_limited",
            AnalysisError::Fetch { error, .. } => error.code(),
            AnalysisError::UploadTooLarge { .. } => "upload_too_large",
            AnalysisError::EmptyUpload => "empty_upload",
            AnalysisError::ReportNotFound(_) => "report_not_found",
            AnalysisError::NotRecheckable(_) => "not_recheckable",
            AnalysisError::Storage(_) => "storage_error",
        }
    }
}
