//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `image_provenance` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - JSON output of reports, events and validation results
//!
//! All core functionality is implemented in the library crate.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use image_provenance::config::{
    DB_PATH, DEFAULT_MAX_REDIRECTS, DEFAULT_MAX_SIZE_MB, DEFAULT_RATE_LIMIT_PER_MINUTE,
    DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT,
};
use image_provenance::initialization::init_logger_with;
use image_provenance::{
    init_analyzer, validate, AnalysisError, Analyzer, Config, FetchConfig, LogFormat, LogLevel,
};

/// Command-line options.
///
/// # Examples
///
/// ```bash
/// # Analyze a remote image (or a profile page advertising one)
/// image_provenance analyze https://example.com/photo.jpg
///
/// # Analyze a local file
/// image_provenance upload ./photo.png
///
/// # Fetch a stored report's URL again and show its history
/// image_provenance recheck 1
/// image_provenance history 1
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "image_provenance",
    about = "Fetches images safely, records forensic signals and tracks changes over time."
)]
struct Cli {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,

    /// Database path (SQLite file)
    #[arg(long, global = true, env = "IMAGE_PROVENANCE_DB", default_value = DB_PATH)]
    db_path: PathBuf,

    /// Maximum image size in megabytes (also applies to uploads)
    #[arg(long, global = true, env = "MAX_SIZE_MB", default_value_t = DEFAULT_MAX_SIZE_MB)]
    max_size_mb: u64,

    /// Timeout in milliseconds, applied separately to the probe and the download
    #[arg(long, global = true, env = "TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Maximum redirect hops across one fetch
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_REDIRECTS)]
    max_redirects: usize,

    /// Requests per client per minute (0 disables limiting)
    #[arg(long, global = true, env = "RATE_LIMIT_PER_MINUTE", default_value_t = DEFAULT_RATE_LIMIT_PER_MINUTE)]
    rate_limit_per_minute: u32,

    /// HTTP User-Agent header value
    #[arg(long, global = true, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Fetch the URL as given instead of looking for a profile page's image
    #[arg(long, global = true)]
    no_resolve: bool,

    /// Do not filter private addresses out of DNS answers
    #[arg(long, global = true)]
    no_pin_dns: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch and analyze a remote image
    Analyze {
        /// Image URL or page URL
        url: String,
        /// Rate-limit key for this caller
        #[arg(long, default_value = "cli")]
        client: String,
    },
    /// Analyze a local image file
    Upload {
        /// File to read
        file: PathBuf,
        /// Rate-limit key for this caller
        #[arg(long, default_value = "cli")]
        client: String,
    },
    /// Fetch a stored report's URL again and record what changed
    Recheck {
        /// Report id
        id: i64,
        /// Rate-limit key for this caller
        #[arg(long, default_value = "cli")]
        client: String,
    },
    /// Show a report's change history, oldest first
    History {
        /// Report id
        id: i64,
    },
    /// Check whether a URL would be allowed, without contacting it
    Validate {
        /// URL to check
        url: String,
    },
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            db_path: self.db_path.clone(),
            fetch: FetchConfig {
                max_size_mb: self.max_size_mb,
                timeout_ms: self.timeout_ms,
                max_redirects: self.max_redirects,
            },
            user_agent: self.user_agent.clone(),
            rate_limit_per_minute: self.rate_limit_per_minute,
            resolve_profiles: !self.no_resolve,
            pin_public_dns: !self.no_pin_dns,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    match run(cli).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            let code = e
                .downcast_ref::<AnalysisError>()
                .map(AnalysisError::code)
                .unwrap_or("error");
            let body = json!({ "error": code, "message": format!("{e:#}") });
            println!("{}", serde_json::to_string_pretty(&body)?);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<serde_json::Value> {
    let config = cli.config();
    let output = match cli.command {
        Command::Validate { url } => match validate(&url) {
            Ok(safe) => json!({ "allowed": true, "url": safe.as_str() }),
            Err(e) => json!({ "allowed": false, "reason": e.to_string() }),
        },
        Command::Analyze { url, client } => {
            let analyzer = analyzer(config).await?;
            serde_json::to_value(analyzer.analyze_url(&client, &url).await?)?
        }
        Command::Upload { file, client } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file.file_name().map(|n| n.to_string_lossy().into_owned());
            let analyzer = analyzer(config).await?;
            serde_json::to_value(
                analyzer
                    .analyze_upload(&client, filename.as_deref(), &bytes)
                    .await?,
            )?
        }
        Command::Recheck { id, client } => {
            serde_json::to_value(analyzer(config).await?.recheck(&client, id).await?)?
        }
        Command::History { id } => {
            serde_json::to_value(analyzer(config).await?.history(id).await?)?
        }
    };
    Ok(output)
}

async fn analyzer(config: Config) -> Result<Analyzer> {
    init_analyzer(config)
        .await
        .context("Failed to initialize analyzer")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_match_library_defaults() {
        let cli =
            Cli::try_parse_from(["image_provenance", "validate", "https://a.example/"]).unwrap();
        let config = cli.config();
        let defaults = Config::default();
        assert_eq!(config.fetch, defaults.fetch);
        assert_eq!(config.db_path, defaults.db_path);
        assert!(config.resolve_profiles);
        assert!(config.pin_public_dns);
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "image_provenance",
            "analyze",
            "https://a.example/p",
            "--client",
            "alice",
            "--max-size-mb",
            "2",
            "--no-resolve",
        ])
        .unwrap();
        let config = cli.config();
        assert_eq!(config.fetch.max_size_mb, 2);
        assert!(!config.resolve_profiles);
        match cli.command {
            Command::Analyze { url, client } => {
                assert_eq!(url, "https://a.example/p");
                assert_eq!(client, "alice");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_recheck_requires_numeric_id() {
        assert!(Cli::try_parse_from(["image_provenance", "recheck", "abc"]).is_err());
    }

    #[test]
    fn test_recheck_client_key() {
        let cli = Cli::try_parse_from(["image_provenance", "recheck", "7"]).unwrap();
        match cli.command {
            Command::Recheck { id, client } => {
                assert_eq!(id, 7);
                assert_eq!(client, "cli");
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli =
            Cli::try_parse_from(["image_provenance", "recheck", "7", "--client", "bob"]).unwrap();
        assert!(matches!(cli.command, Command::Recheck { client, .. } if client == "bob"));
    }
}
