//! Transport module - streaming HTTP access.
//!
//! The decoder only needs three things from a transport: the response
//! status, its content type, and a stream of body chunks. Cancellation is
//! dropping the pending `open` future or the body stream.
//!
//! Provides:
//! - [`HttpTransport`] - `reqwest` client (http and https)
//! - [`MemoryTransport`] - in-process feed for tests and replays

mod http;
mod memory;

use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

pub use http::HttpTransport;
pub use memory::{MemoryFeed, MemoryTransport};

/// Stream of body chunks.
pub type ChunkStream = BoxStream<'static, std::result::Result<Bytes, TransportError>>;

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP client error (connect, TLS, body read).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// URL scheme is neither http nor https.
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Response head plus the body stream.
pub struct StreamResponse {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Body chunks in arrival order.
    pub body: ChunkStream,
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Opens streaming GET requests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Issue the request and resolve once response headers are available.
    async fn open(&self, url: &str) -> std::result::Result<StreamResponse, TransportError>;
}
