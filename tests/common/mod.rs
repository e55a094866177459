// Shared test helpers: an in-memory transport and analyzer setup.
//
// Loopback targets are refused by the URL validator, so integration tests
// script responses for public-looking hosts instead of running a server.

#![allow(dead_code)] // Each test file uses a different subset

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use image_provenance::fetch::{
    HttpMethod, ResponseHeaders, Transport, TransportError, TransportRequest, TransportResponse,
};
use image_provenance::{Analyzer, Config, FixedWindowLimiter, SqliteStore};

/// A canned response.
#[derive(Debug, Clone)]
pub struct Scripted {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub chunks: Vec<Bytes>,
}

impl Scripted {
    pub fn status(status: u16) -> Self {
        Scripted {
            status,
            headers: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn image(content_type: &str, bytes: &[u8]) -> Self {
        Self::status(200)
            .header("Content-Type", content_type)
            .header("Content-Length", &bytes.len().to_string())
            .body(bytes)
    }

    pub fn html(markup: &str) -> Self {
        Self::status(200)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(markup.as_bytes())
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self::status(status).header("Location", location)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, bytes: &[u8]) -> Self {
        self.chunks = vec![Bytes::copy_from_slice(bytes)];
        self
    }

    /// `count` chunks of `chunk_size` bytes.
    pub fn chunked(mut self, chunk_size: usize, count: usize) -> Self {
        self.chunks = vec![Bytes::from(vec![0xAB; chunk_size]); count];
        self
    }
}

/// Transport answering from a URL table. Routes can be swapped between calls
/// to simulate a remote image changing.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Scripted>>,
    log: Mutex<Vec<(HttpMethod, String)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: &str, response: Scripted) -> Self {
        self.set(url, response);
        self
    }

    pub fn set(&self, url: &str, response: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn requests(&self) -> Vec<(HttpMethod, String)> {
        self.log.lock().unwrap().clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|(_, url)| url).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = request.url.to_string();
        self.log.lock().unwrap().push((request.method, url.clone()));

        let scripted = self
            .routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .ok_or_else(|| TransportError::Request(format!("connection refused: {url}")))?;

        let mut headers = ResponseHeaders::new();
        for (name, value) in &scripted.headers {
            headers.insert(name, value.clone());
        }
        let chunks = if request.method == HttpMethod::Head {
            Vec::new()
        } else {
            scripted.chunks
        };

        Ok(TransportResponse {
            status: scripted.status,
            status_text: reqwest::StatusCode::from_u16(scripted.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("")
                .to_string(),
            headers,
            body: Box::pin(stream::iter(chunks.into_iter().map(Ok))),
        })
    }
}

/// Analyzer over the scripted transport and a fresh in-memory database.
pub async fn analyzer_with(transport: Arc<ScriptedTransport>, config: Config) -> Analyzer {
    let store = SqliteStore::in_memory()
        .await
        .expect("Failed to create in-memory store");
    let limiter = Arc::new(FixedWindowLimiter::per_minute(config.rate_limit_per_minute));
    Analyzer::new(config, transport, Arc::new(store), limiter)
}

/// Minimal valid PNG signature followed by filler.
pub fn png_bytes(fill: u8, len: usize) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.resize(len.max(8), fill);
    bytes
}
