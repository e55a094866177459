//! Connect-time DNS guard for reqwest.
//!
//! Implements `reqwest::dns::Resolve` by delegating to the system resolver and
//! dropping every address the validator's IP classifier blocks. A hostname
//! that passes `validate` but resolves only to private addresses fails before
//! reqwest opens a socket, which narrows the DNS-rebinding window left open by
//! name-based validation.

use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tokio::sync::Semaphore;

use super::url_validation::is_blocked_ip;

/// Concurrency limiter for DNS lookups (prevent resource exhaustion)
static DNS_SEMAPHORE: LazyLock<Arc<Semaphore>> = LazyLock::new(|| Arc::new(Semaphore::new(64)));

/// A DNS resolver that only hands public addresses to the connector.
#[derive(Debug, Clone, Default)]
pub struct SafeResolver;

impl Resolve for SafeResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let _permit = DNS_SEMAPHORE
                .acquire()
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?;

            let host = format!("{}:0", name.as_str());
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&host)
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?
                .collect();

            let safe_addrs = public_addrs(addrs);
            if safe_addrs.is_empty() {
                log::warn!(
                    "Refusing to connect to '{}': every resolved address is private or reserved",
                    name.as_str()
                );
                return Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    format!(
                        "all resolved addresses for '{}' are private or reserved",
                        name.as_str()
                    ),
                ))
                    as Box<dyn std::error::Error + Send + Sync>);
            }

            let addrs: Addrs = Box::new(safe_addrs.into_iter());
            Ok(addrs)
        })
    }
}

fn public_addrs(addrs: Vec<SocketAddr>) -> Vec<SocketAddr> {
    addrs
        .into_iter()
        .filter(|addr| !is_blocked_ip(addr.ip()))
        .collect()
}
