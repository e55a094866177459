//! HTTP transport seam.
//!
//! The fetcher never talks to `reqwest` directly. It hands a
//! `TransportRequest` to a `Transport` and reads a streamed body back. The
//! production transport is built on reqwest with automatic redirects
//! disabled; tests swap in an in-memory implementation.
//!
//! A transport performs no URL validation of its own. Callers must only pass
//! URLs that went through `security::validate`.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::ClientBuilder;
use thiserror::Error;
use url::Url;

use super::types::ResponseHeaders;
use crate::security::SafeResolver;

/// Streamed response body. Dropping it cancels the underlying read.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Request methods the fetcher issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Metadata-only probe
    Head,
    /// Full retrieval
    Get,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Head => f.write_str("HEAD"),
            HttpMethod::Get => f.write_str("GET"),
        }
    }
}

/// One outbound request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Method to send
    pub method: HttpMethod,
    /// Target (already validated by the caller)
    pub url: Url,
    /// Extra request headers, applied in order
    pub headers: Vec<(String, String)>,
}

/// Response head plus a lazily-read body.
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase (canonical when the server sends none)
    pub status_text: String,
    /// Response headers, keys lower-cased
    pub headers: ResponseHeaders,
    /// Body chunks
    pub body: BodyStream,
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Transport-level failures (connect, TLS, DNS, body read).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be sent or no response head arrived.
    #[error("{0}")]
    Request(String),
    /// The connection failed while reading the body.
    #[error("body read failed: {0}")]
    Body(String),
}

/// A streaming HTTP client that never follows redirects on its own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and returns the response head with a streamed body.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        (**self).send(request).await
    }
}

/// `reqwest`-backed transport.
///
/// Built with `redirect::Policy::none()` so every 3xx reaches the redirect
/// walker, and optionally with `SafeResolver` so private addresses returned by
/// DNS are dropped before connecting.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds the transport.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - User-Agent sent with every request
    /// * `pin_public_dns` - Filter resolved addresses through `SafeResolver`
    ///
    /// # Errors
    ///
    /// Returns a `reqwest::Error` if the client cannot be built (TLS backend
    /// initialization).
    pub fn new(user_agent: &str, pin_public_dns: bool) -> Result<Self, reqwest::Error> {
        let mut builder = ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(user_agent.to_string());
        if pin_public_dns {
            builder = builder.dns_resolver(Arc::new(SafeResolver));
        }
        Ok(ReqwestTransport {
            client: builder.build()?,
        })
    }

    /// Wraps an existing client. The client must not follow redirects.
    pub fn from_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Get => reqwest::Method::GET,
        };

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            log::debug!(
                "{} {} failed: {} (is_timeout: {}, is_connect: {})",
                request.method,
                request.url,
                e,
                e.is_timeout(),
                e.is_connect()
            );
            TransportError::Request(describe_reqwest_error(&e))
        })?;

        let status = response.status();
        let headers = ResponseHeaders::from_header_map(response.headers());
        let body = response
            .bytes_stream()
            .map_err(|e| TransportError::Body(describe_reqwest_error(&e)))
            .boxed();

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown Status Code").to_string(),
            headers,
            body,
        })
    }
}

/// Flattens a reqwest error and its sources into one line.
fn describe_reqwest_error(e: &reqwest::Error) -> String {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
