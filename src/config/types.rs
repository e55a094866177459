//! Configuration types.
//!
//! This module defines the library configuration and the enums shared with the
//! command-line front end.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::{
    BYTES_PER_MB, DB_PATH, DEFAULT_MAX_REDIRECTS, DEFAULT_MAX_SIZE_MB,
    DEFAULT_RATE_LIMIT_PER_MINUTE, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Resource budget for a single safe fetch.
///
/// Every counter derived from this budget (hops, bytes, elapsed time) is local
/// to one `fetch_safely` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Maximum payload size in megabytes
    pub max_size_mb: u64,
    /// Timeout applied independently to the probe and to the transfer
    pub timeout_ms: u64,
    /// Maximum redirect hops across the whole fetch
    pub max_redirects: usize,
}

impl FetchConfig {
    /// Size budget in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Per-phase timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use image_provenance::{Config, FetchConfig};
///
/// let config = Config {
///     fetch: FetchConfig {
///         max_size_mb: 5,
///         ..Default::default()
///     },
///     rate_limit_per_minute: 30,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Database path (SQLite file)
    pub db_path: PathBuf,

    /// Budget for image fetches
    pub fetch: FetchConfig,

    /// HTTP User-Agent header value
    pub user_agent: String,

    /// Requests allowed per client per minute (0 disables limiting)
    pub rate_limit_per_minute: u32,

    /// Try to upgrade page URLs (social profiles, articles) to their preview image
    pub resolve_profiles: bool,

    /// Drop private addresses returned by DNS before connecting
    pub pin_public_dns: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            db_path: PathBuf::from(DB_PATH),
            fetch: FetchConfig::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            resolve_profiles: true,
            pin_public_dns: true,
        }
    }
}
