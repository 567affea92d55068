//! Opening the turn stream.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use ot_domain::config::AgentConfig;
use ot_domain::error::{Error, Result};

use crate::util::{snippet, stream_client};

/// Body of the stream request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TurnRequest {
    pub message: String,
    /// Server-side dataset reference, `null` when the turn has none.
    pub dataset_path: Option<String>,
}

/// Sequence of raw byte chunks from an open stream.
#[async_trait]
pub trait ChunkSource: Send {
    /// Next chunk, or `None` once the server has closed the stream.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// Opens one streaming exchange per turn.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Returns once the server has accepted the request and a body is
    /// readable.  Any failure here is fatal to the turn.
    async fn open(&self, request: &TurnRequest) -> Result<Box<dyn ChunkSource>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// reqwest implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(cfg: &AgentConfig) -> Result<Self> {
        Ok(Self {
            http: stream_client(cfg)?,
            url: cfg.url(&cfg.stream_path),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StreamTransport for HttpTransport {
    async fn open(&self, request: &TurnRequest) -> Result<Box<dyn ChunkSource>> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::TransportOpen(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TransportOpen(format!(
                "{} returned {status}: {}",
                self.url,
                snippet(&body)
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.starts_with("text/event-stream") {
            tracing::debug!(content_type, "stream response is not text/event-stream");
        }

        Ok(Box::new(ResponseChunks { response }))
    }
}

struct ResponseChunks {
    response: reqwest::Response,
}

#[async_trait]
impl ChunkSource for ResponseChunks {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(e.to_string())
            } else {
                Error::TransportRead(e.to_string())
            }
        })
    }
}
