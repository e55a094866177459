//! HTTP transport initialization.

use std::sync::Arc;

use crate::config::Config;
use crate::error_handling::InitializationError;
use crate::fetch::ReqwestTransport;

/// Initializes the production transport.
///
/// The underlying `reqwest::Client` is configured with:
/// - User-Agent from the configuration
/// - Redirect following disabled (every hop is validated by the fetcher)
/// - Rustls TLS backend (no native TLS)
/// - Connect-time address filtering when `pin_public_dns` is set
///
/// No client-level timeout is set; each fetch phase carries its own.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_transport(config: &Config) -> Result<Arc<ReqwestTransport>, InitializationError> {
    let transport = ReqwestTransport::new(&config.user_agent, config.pin_public_dns)?;
    Ok(Arc::new(transport))
}
