//! SSRF-safe image retrieval.
//!
//! `fetch_safely` validates the URL, probes it with HEAD, then downloads it
//! with GET. Redirects are walked by hand and every hop is re-validated. Size
//! is enforced twice: against the declared Content-Length before the
//! transfer, and against the running byte count while streaming.
//!
//! Failures never escape as panics or `Err`; they are carried in
//! `FetchResult::outcome` together with the redirect chain reached so far.

mod body;
mod error;
mod redirects;
mod request;
mod transport;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{FetchError, FetchPhase};
pub use request::RequestKind;
pub use transport::{
    BodyStream, HttpMethod, ReqwestTransport, Transport, TransportError, TransportRequest,
    TransportResponse,
};
pub use types::{FetchResult, FetchedImage, RedirectChain, ResponseHeaders};

pub(crate) use body::{read_body_with_limit, BodyError};
pub(crate) use redirects::send_following_redirects;

use log::{debug, warn};

use crate::config::{
    FetchConfig, GENERIC_BINARY_CONTENT_TYPE, HEADER_CONTENT_LENGTH, HEADER_CONTENT_TYPE,
    HTTP_STATUS_METHOD_NOT_ALLOWED, HTTP_STATUS_NOT_IMPLEMENTED, IMAGE_CONTENT_TYPE_PREFIX,
};
use crate::security::{validate, SafeUrl};

/// Fetches an attacker-supplied image URL without letting it reach private
/// infrastructure.
///
/// # Arguments
///
/// * `transport` - HTTP client that does not follow redirects
/// * `url` - Untrusted URL
/// * `config` - Size, time and redirect budgets
///
/// # Returns
///
/// A `FetchResult` holding the redirect chain and either the image or the
/// reason the fetch stopped. The chain is empty when the URL itself failed
/// validation (no request was sent).
pub async fn fetch_safely<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    config: &FetchConfig,
) -> FetchResult {
    let start = match validate(url) {
        Ok(safe) => safe,
        Err(e) => {
            warn!("Rejected {url}: {e}");
            return FetchResult {
                redirect_chain: RedirectChain::default(),
                outcome: Err(e.into()),
            };
        }
    };

    let mut chain = RedirectChain::starting_at(start.as_str());
    let outcome = fetch_validated(transport, start, &mut chain, config).await;

    match &outcome {
        Ok(image) => debug!(
            "Fetched {} bytes from {} ({} redirects)",
            image.bytes.len(),
            image.final_url,
            chain.hops()
        ),
        Err(e) => warn!("Fetch of {url} failed [{}]: {e}", e.code()),
    }

    FetchResult {
        redirect_chain: chain,
        outcome,
    }
}

async fn fetch_validated<T: Transport + ?Sized>(
    transport: &T,
    start: SafeUrl,
    chain: &mut RedirectChain,
    config: &FetchConfig,
) -> Result<FetchedImage, FetchError> {
    let limit = config.max_bytes();

    let (target, probe) = tokio::time::timeout(
        config.timeout(),
        send_following_redirects(
            transport,
            HttpMethod::Head,
            RequestKind::Image,
            start,
            chain,
            config.max_redirects,
        ),
    )
    .await
    .map_err(|_| FetchError::Timeout {
        phase: FetchPhase::Probe,
        timeout_ms: config.timeout_ms,
    })??;

    check_probe(&probe, limit)?;
    drop(probe);

    tokio::time::timeout(config.timeout(), transfer(transport, target, chain, config))
        .await
        .map_err(|_| FetchError::Timeout {
            phase: FetchPhase::Transfer,
            timeout_ms: config.timeout_ms,
        })?
}

async fn transfer<T: Transport + ?Sized>(
    transport: &T,
    target: SafeUrl,
    chain: &mut RedirectChain,
    config: &FetchConfig,
) -> Result<FetchedImage, FetchError> {
    let limit = config.max_bytes();
    let (final_url, response) = send_following_redirects(
        transport,
        HttpMethod::Get,
        RequestKind::Image,
        target,
        chain,
        config.max_redirects,
    )
    .await?;

    if !is_success(response.status) {
        return Err(FetchError::HttpError {
            status: response.status,
            status_text: response.status_text,
        });
    }

    match response.headers.get(HEADER_CONTENT_TYPE) {
        Some(content_type) => check_content_type(content_type)?,
        None => {
            return Err(FetchError::InvalidContentType {
                content_type: "(missing)".to_string(),
            })
        }
    }
    check_declared_length(&response.headers, limit)?;

    let status = response.status;
    let headers = response.headers;
    let bytes = read_body_with_limit(response.body, limit)
        .await
        .map_err(|e| match e {
            BodyError::TooLarge { limit, received } => {
                FetchError::ActualTooLarge { limit, received }
            }
            BodyError::Transport(e) => FetchError::from(e),
        })?;

    Ok(FetchedImage {
        bytes,
        headers,
        final_url: final_url.into_url(),
        status,
    })
}

/// Applies the pre-transfer gates to the HEAD response.
fn check_probe(probe: &TransportResponse, limit: u64) -> Result<(), FetchError> {
    if probe.status == HTTP_STATUS_METHOD_NOT_ALLOWED || probe.status == HTTP_STATUS_NOT_IMPLEMENTED
    {
        debug!(
            "HEAD not supported (status {}), deferring checks to GET",
            probe.status
        );
        return Ok(());
    }

    if !is_success(probe.status) {
        return Err(FetchError::HttpError {
            status: probe.status,
            status_text: probe.status_text.clone(),
        });
    }

    if let Some(content_type) = probe.headers.get(HEADER_CONTENT_TYPE) {
        check_content_type(content_type)?;
    }
    check_declared_length(&probe.headers, limit)
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// True when a Content-Type value names an image or generic binary data.
///
/// Parameters are ignored and the comparison is case-insensitive.
pub fn is_image_content_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type.starts_with(IMAGE_CONTENT_TYPE_PREFIX) || media_type == GENERIC_BINARY_CONTENT_TYPE
}

fn check_content_type(content_type: &str) -> Result<(), FetchError> {
    if is_image_content_type(content_type) {
        Ok(())
    } else {
        Err(FetchError::InvalidContentType {
            content_type: content_type.to_string(),
        })
    }
}

/// Unparseable Content-Length values are ignored; the streaming check still applies.
fn check_declared_length(headers: &ResponseHeaders, limit: u64) -> Result<(), FetchError> {
    let declared = headers
        .get(HEADER_CONTENT_LENGTH)
        .and_then(|value| value.trim().parse::<u64>().ok());
    match declared {
        Some(declared) if declared > limit => Err(FetchError::DeclaredTooLarge { declared, limit }),
        _ => Ok(()),
    }
}
