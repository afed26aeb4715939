//! `reqwest`-backed transport.
//!
//! The URL scheme selects plain TCP or TLS (rustls). No request timeout is
//! set on the client: the stream is expected to stay open indefinitely and
//! the decoder runs its own header watchdog.

use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use super::{StreamResponse, Transport, TransportError};

/// HTTP(S) transport using a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a default client.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    /// Create a transport around an existing client (proxies, custom TLS roots, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn open(&self, url: &str) -> Result<StreamResponse, TransportError> {
        let url = Url::parse(url).map_err(|e| TransportError::Other(format!("invalid URL: {}", e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(TransportError::UnsupportedScheme(other.to_string())),
        }

        tracing::debug!("Opening M-JPEG stream {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        tracing::debug!("Response status {}, content type {:?}", status, content_type);

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed();

        Ok(StreamResponse {
            status,
            content_type,
            body,
        })
    }
}
