//! Application initialization and resource setup.
//!
//! This module provides functions to initialize all shared resources:
//! - Logger
//! - HTTP transport (redirects disabled, optional DNS pinning)
//! - Report database
//! - Rate limiter
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

use std::sync::Arc;

use crate::analysis::Analyzer;
use crate::config::Config;
use crate::error_handling::InitializationError;
use crate::rate_limit::FixedWindowLimiter;
use crate::storage::SqliteStore;

// Re-export public API
pub use client::init_transport;
pub use logger::init_logger_with;

/// Initializes the per-client rate limiter from `rate_limit_per_minute`.
pub fn init_rate_limiter(config: &Config) -> Arc<FixedWindowLimiter> {
    Arc::new(FixedWindowLimiter::per_minute(config.rate_limit_per_minute))
}

/// Builds an `Analyzer` backed by reqwest and the SQLite database at
/// `config.db_path`.
///
/// # Errors
///
/// Returns `InitializationError` if the HTTP client or the database cannot
/// be set up.
pub async fn init_analyzer(config: Config) -> Result<Analyzer, InitializationError> {
    let transport = init_transport(&config)?;
    let store = SqliteStore::open(&config.db_path).await?;
    let limiter = init_rate_limiter(&config);
    Ok(Analyzer::new(config, transport, Arc::new(store), limiter))
}
