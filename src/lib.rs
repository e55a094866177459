//! image_provenance library: safe image fetching and provenance tracking
//!
//! This library fetches images from caller-supplied URLs without exposing the
//! host to server-side request forgery, records forensic signals about the
//! bytes (digest, entropy, magic-byte format, provenance headers), and tracks
//! how an image changes across repeated checks.
//!
//! # Example
//!
//! ```no_run
//! use image_provenance::{init_analyzer, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let analyzer = init_analyzer(Config::default()).await?;
//!
//! let outcome = analyzer
//!     .analyze_url("cli", "https://example.com/photo.jpg")
//!     .await?;
//! println!("report {} sha256={}", outcome.report.id, outcome.report.content_hash);
//!
//! let event = analyzer.recheck("cli", outcome.report.id).await?;
//! println!("since last check: {}", event.change_type);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

#![warn(missing_docs)]

pub mod analysis;
pub mod change;
pub mod config;
pub mod error_handling;
pub mod fetch;
pub mod forensics;
pub mod initialization;
pub mod rate_limit;
pub mod resolve;
pub mod security;
pub mod storage;

// Re-export public API
pub use analysis::{AnalysisError, AnalysisOutcome, Analyzer};
pub use change::{classify, classify_change, ChangeEvent, ChangeType, Fingerprint};
pub use config::{Config, FetchConfig, LogFormat, LogLevel};
pub use fetch::{fetch_safely, FetchError, FetchResult, ReqwestTransport, Transport};
pub use initialization::init_analyzer;
pub use rate_limit::{FixedWindowLimiter, RateLimiter};
pub use resolve::{resolve_profile_image, ProfileImage};
pub use security::{validate, SafeUrl, ValidationError};
pub use storage::{ReportStore, SqliteStore};
