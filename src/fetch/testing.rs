//! In-memory transport for tests.
//!
//! Routes map a URL (optionally per method) to a scripted response. Every
//! request is recorded so tests can assert exactly which URLs were contacted.
//! Unknown URLs fail like a refused connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};

use super::transport::{
    BodyStream, HttpMethod, Transport, TransportError, TransportRequest, TransportResponse,
};
use super::types::ResponseHeaders;

#[derive(Debug, Clone)]
enum MockBody {
    Full(Bytes),
    Repeated { chunk: Bytes, count: usize },
    Stalled(Bytes),
    Failing { first: Bytes, message: String },
}

#[derive(Debug, Clone)]
enum Behavior {
    Respond,
    Hang,
}

/// A scripted response.
#[derive(Debug, Clone)]
pub(crate) struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: MockBody,
    behavior: Behavior,
}

impl MockResponse {
    pub(crate) fn status(status: u16) -> Self {
        MockResponse {
            status,
            headers: Vec::new(),
            body: MockBody::Full(Bytes::new()),
            behavior: Behavior::Respond,
        }
    }

    /// 200 `image/png` with a matching Content-Length.
    pub(crate) fn image(bytes: &[u8]) -> Self {
        Self::status(200)
            .header("Content-Type", "image/png")
            .header("Content-Length", &bytes.len().to_string())
            .body(bytes)
    }

    pub(crate) fn html(html: &str) -> Self {
        Self::status(200)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(html.as_bytes())
    }

    pub(crate) fn redirect(status: u16, location: &str) -> Self {
        Self::status(status).header("Location", location)
    }

    /// Never produces a response head.
    pub(crate) fn hang() -> Self {
        MockResponse {
            behavior: Behavior::Hang,
            ..Self::status(200)
        }
    }

    pub(crate) fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub(crate) fn body(mut self, bytes: &[u8]) -> Self {
        self.body = MockBody::Full(Bytes::copy_from_slice(bytes));
        self
    }

    /// Streams `count` chunks of `chunk_size` bytes, generated lazily.
    pub(crate) fn streamed(mut self, chunk_size: usize, count: usize) -> Self {
        self.body = MockBody::Repeated {
            chunk: Bytes::from(vec![0xABu8; chunk_size]),
            count,
        };
        self
    }

    /// Sends the current body as one chunk, then never finishes.
    pub(crate) fn stalled(mut self) -> Self {
        self.body = MockBody::Stalled(self.full_body());
        self
    }

    /// Sends the current body as one chunk, then fails.
    pub(crate) fn failing_body(mut self, message: &str) -> Self {
        self.body = MockBody::Failing {
            first: self.full_body(),
            message: message.to_string(),
        };
        self
    }

    fn full_body(&self) -> Bytes {
        match &self.body {
            MockBody::Full(bytes) => bytes.clone(),
            _ => Bytes::new(),
        }
    }
}

/// Scripted `Transport` with request recording.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<(Option<HttpMethod>, String), MockResponse>>,
    requests: Mutex<Vec<TransportRequest>>,
    chunks_streamed: Arc<AtomicUsize>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answers every method for `url`.
    pub(crate) fn route(self, url: &str, response: MockResponse) -> Self {
        self.set_route(None, url, response);
        self
    }

    /// Answers only `method` for `url`; takes precedence over `route`.
    pub(crate) fn route_for(self, method: HttpMethod, url: &str, response: MockResponse) -> Self {
        self.set_route(Some(method), url, response);
        self
    }

    /// Replaces a route on a shared transport.
    pub(crate) fn set_route(&self, method: Option<HttpMethod>, url: &str, response: MockResponse) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, url.to_string()), response);
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn requested_urls(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| r.url.to_string())
            .collect()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Body chunks handed to readers so far.
    pub(crate) fn chunks_streamed(&self) -> usize {
        self.chunks_streamed.load(Ordering::SeqCst)
    }

    fn lookup(&self, method: HttpMethod, url: &str) -> Option<MockResponse> {
        let routes = self.routes.lock().unwrap();
        routes
            .get(&(Some(method), url.to_string()))
            .or_else(|| routes.get(&(None, url.to_string())))
            .cloned()
    }

    fn body_stream(&self, method: HttpMethod, body: MockBody) -> BodyStream {
        if method == HttpMethod::Head {
            return stream::empty().boxed();
        }
        let counter = Arc::clone(&self.chunks_streamed);
        let chunks: BodyStream = match body {
            MockBody::Full(bytes) if bytes.is_empty() => stream::empty().boxed(),
            MockBody::Full(bytes) => stream::iter(vec![Ok(bytes)]).boxed(),
            MockBody::Repeated { chunk, count } => {
                stream::iter(std::iter::repeat(chunk).take(count).map(Ok)).boxed()
            }
            MockBody::Stalled(first) => stream::iter(vec![Ok(first)])
                .chain(stream::pending())
                .boxed(),
            MockBody::Failing { first, message } => {
                stream::iter(vec![Ok(first), Err(TransportError::Body(message))]).boxed()
            }
        };
        chunks
            .inspect(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .boxed()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        let Some(mock) = self.lookup(request.method, request.url.as_str()) else {
            return Err(TransportError::Request(format!(
                "error trying to connect: connection refused ({})",
                request.url
            )));
        };

        if let Behavior::Hang = mock.behavior {
            futures::future::pending::<()>().await;
        }

        let status_text = reqwest::StatusCode::from_u16(mock.status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("Unknown Status Code")
            .to_string();

        Ok(TransportResponse {
            status: mock.status,
            status_text,
            headers: mock.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect(),
            body: self.body_stream(request.method, mock.body),
        })
    }
}

/// Shorthand for tests that need a header map.
pub(crate) fn headers(pairs: &[(&str, &str)]) -> ResponseHeaders {
    pairs.iter().copied().collect()
}
