//! Error handling for initialization and storage setup.
//!
//! Library operations report failures as typed values (`FetchError`,
//! `ValidationError`, `AnalysisError`). The types here cover the plumbing
//! around them: logger, HTTP client and database startup.

mod types;

pub use types::{DatabaseError, InitializationError};
