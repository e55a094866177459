//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (budgets, timeouts, limits)
//! - HTTP header name constants
//! - Library configuration types

mod constants;
mod headers;
mod types;

// Re-export all constants
pub use constants::*;
pub use headers::*;
pub use types::{Config, FetchConfig, LogFormat, LogLevel};
