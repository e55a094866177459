//! Redirect-safe request helper.
//!
//! Redirects are walked by hand so that every hop goes through the validator
//! before anything is sent to it. The same helper serves the HEAD probe, the
//! GET transfer and the profile page fetch; the chain (and with it the hop
//! budget) is shared by every phase of one fetch.

use log::{debug, warn};
use url::Url;

use super::error::FetchError;
use super::request::{RequestHeaders, RequestKind};
use super::transport::{HttpMethod, Transport, TransportRequest, TransportResponse};
use super::types::RedirectChain;
use crate::config::{HEADER_LOCATION, REDIRECT_STATUSES};
use crate::security::{validate, SafeUrl, ValidationError};

/// True for 301, 302, 303, 307 and 308.
pub(crate) fn is_redirect_status(status: u16) -> bool {
    REDIRECT_STATUSES.contains(&status)
}

/// Sends `method` to `start`, following redirects through the validator.
///
/// # Arguments
///
/// * `transport` - Client that never follows redirects itself
/// * `method` - HEAD for the probe, GET for transfers
/// * `kind` - Selects the browser header profile
/// * `start` - Validated first target
/// * `chain` - Visited URLs; `start` must already be its last entry
/// * `max_redirects` - Hop budget for the whole chain
///
/// # Returns
///
/// The URL that produced a non-redirect response, and that response.
///
/// # Errors
///
/// - `MissingLocationHeader` for a 3xx without Location
/// - `RedirectBlocked` when a target fails validation (it is never contacted)
/// - `TooManyRedirects` when another hop would exceed `max_redirects`
/// - `Network` for transport failures
pub(crate) async fn send_following_redirects<T: Transport + ?Sized>(
    transport: &T,
    method: HttpMethod,
    kind: RequestKind,
    start: SafeUrl,
    chain: &mut RedirectChain,
    max_redirects: usize,
) -> Result<(SafeUrl, TransportResponse), FetchError> {
    let mut current = start;

    loop {
        debug!("{method} {current}");
        let response = transport
            .send(TransportRequest {
                method,
                url: current.as_url().clone(),
                headers: RequestHeaders::as_vec(kind),
            })
            .await?;

        if !is_redirect_status(response.status) {
            return Ok((current, response));
        }

        if chain.hops() >= max_redirects {
            warn!(
                "Redirect limit of {} reached at {} (status {})",
                max_redirects, current, response.status
            );
            return Err(FetchError::TooManyRedirects { max: max_redirects });
        }

        let location = response
            .headers
            .get(HEADER_LOCATION)
            .map(str::trim)
            .filter(|loc| !loc.is_empty())
            .ok_or_else(|| FetchError::MissingLocationHeader {
                status: response.status,
                url: current.to_string(),
            })?;

        let next = resolve_location(current.as_url(), location)?;
        debug!("Redirect {} -> {} ({})", current, next, response.status);
        chain.push(next.as_str());
        current = next;
    }
}

/// Resolves a Location value against the URL that returned it and validates
/// the result.
fn resolve_location(base: &Url, location: &str) -> Result<SafeUrl, FetchError> {
    let target = base.join(location).map_err(|e| FetchError::RedirectBlocked {
        url: location.to_string(),
        reason: ValidationError::InvalidFormat {
            reason: format!("{e}: {location}"),
        },
    })?;

    validate(target.as_str()).map_err(|reason| {
        warn!("Blocked redirect from {} to {}: {}", base, target, reason);
        FetchError::RedirectBlocked {
            url: target.to_string(),
            reason,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{MockResponse, MockTransport};

    fn start(url: &str) -> (SafeUrl, RedirectChain) {
        let safe = validate(url).unwrap();
        let chain = RedirectChain::starting_at(safe.as_str());
        (safe, chain)
    }

    #[test]
    fn test_is_redirect_status() {
        for status in [301, 302, 303, 307, 308] {
            assert!(is_redirect_status(status));
        }
        for status in [200, 204, 300, 304, 400, 500] {
            assert!(!is_redirect_status(status));
        }
    }

    #[tokio::test]
    async fn test_follows_relative_redirect() {
        let transport = MockTransport::new()
            .route(
                "https://a.example/start",
                MockResponse::redirect(302, "/next?x=1"),
            )
            .route("https://a.example/next?x=1", MockResponse::image(b"img"));

        let (url, mut chain) = start("https://a.example/start");
        let (final_url, response) = send_following_redirects(
            &transport,
            HttpMethod::Get,
            RequestKind::Image,
            url,
            &mut chain,
            5,
        )
        .await
        .unwrap();

        assert_eq!(final_url.as_str(), "https://a.example/next?x=1");
        assert_eq!(response.status, 200);
        assert_eq!(
            chain.urls(),
            &["https://a.example/start", "https://a.example/next?x=1"]
        );
    }

    #[tokio::test]
    async fn test_long_signed_location_is_followed_exactly() {
        let target = format!(
            "https://cdn.example/signed.png?X-Amz-Signature={}",
            "a".repeat(1200)
        );
        let transport = MockTransport::new()
            .route("https://a.example/img", MockResponse::redirect(302, &target))
            .route(&target, MockResponse::image(b"img"));

        let (url, mut chain) = start("https://a.example/img");
        let (final_url, response) = send_following_redirects(
            &transport,
            HttpMethod::Get,
            RequestKind::Image,
            url,
            &mut chain,
            5,
        )
        .await
        .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(final_url.as_str(), target);
        assert_eq!(
            transport.requested_urls(),
            vec!["https://a.example/img".to_string(), target.clone()]
        );
        assert_eq!(chain.urls().last(), Some(&target));
    }

    #[tokio::test]
    async fn test_blocked_hop_is_never_contacted() {
        let transport = MockTransport::new().route(
            "https://a.example/",
            MockResponse::redirect(301, "http://192.168.0.1/admin"),
        );

        let (url, mut chain) = start("https://a.example/");
        let err = send_following_redirects(
            &transport,
            HttpMethod::Head,
            RequestKind::Image,
            url,
            &mut chain,
            5,
        )
        .await
        .unwrap_err();

        match err {
            FetchError::RedirectBlocked { url, .. } => {
                assert_eq!(url, "http://192.168.0.1/admin")
            }
            other => panic!("expected RedirectBlocked, got {other:?}"),
        }
        assert_eq!(transport.requested_urls(), vec!["https://a.example/"]);
        assert_eq!(chain.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_location() {
        let transport =
            MockTransport::new().route("https://a.example/", MockResponse::status(307));

        let (url, mut chain) = start("https://a.example/");
        let err = send_following_redirects(
            &transport,
            HttpMethod::Get,
            RequestKind::Image,
            url,
            &mut chain,
            5,
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            FetchError::MissingLocationHeader {
                status: 307,
                url: "https://a.example/".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_redirect_loop_hits_limit() {
        let transport = MockTransport::new()
            .route("https://a.example/1", MockResponse::redirect(302, "/2"))
            .route("https://a.example/2", MockResponse::redirect(302, "/1"));

        let (url, mut chain) = start("https://a.example/1");
        let err = send_following_redirects(
            &transport,
            HttpMethod::Get,
            RequestKind::Image,
            url,
            &mut chain,
            3,
        )
        .await
        .unwrap_err();

        assert_eq!(err, FetchError::TooManyRedirects { max: 3 });
        assert_eq!(chain.hops(), 3);
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test]
    async fn test_zero_redirect_budget() {
        let transport = MockTransport::new()
            .route("https://a.example/", MockResponse::redirect(302, "/b"));

        let (url, mut chain) = start("https://a.example/");
        let err = send_following_redirects(
            &transport,
            HttpMethod::Get,
            RequestKind::Image,
            url,
            &mut chain,
            0,
        )
        .await
        .unwrap_err();

        assert_eq!(err, FetchError::TooManyRedirects { max: 0 });
    }

    #[test]
    fn test_resolve_location_absolute_and_scheme_relative() {
        let base = Url::parse("https://a.example/dir/page").unwrap();
        assert_eq!(
            resolve_location(&base, "https://b.example/x.png")
                .unwrap()
                .as_str(),
            "https://b.example/x.png"
        );
        assert_eq!(
            resolve_location(&base, "//c.example/y.png")
                .unwrap()
                .as_str(),
            "https://c.example/y.png"
        );
        assert_eq!(
            resolve_location(&base, "z.png").unwrap().as_str(),
            "https://a.example/dir/z.png"
        );
        assert!(resolve_location(&base, "file:///etc/passwd").is_err());
    }
}
