//! In-process transport fed through a channel.
//!
//! Useful for tests and for replaying captured streams. The transport
//! answers the first `open` with the configured response head; body chunks
//! are pushed through the paired [`MemoryFeed`].
//!
//! # Example
//!
//! ```ignore
//! use mjpeg_decoder::transport::MemoryTransport;
//!
//! let (transport, feed) = MemoryTransport::mjpeg();
//! feed.send(&[0xFF, 0xD8, 0x00, 0xFF, 0xD9]);
//! feed.close();
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;

use super::{StreamResponse, Transport, TransportError};

type BodyItem = Result<Bytes, TransportError>;

/// How the transport answers `open`.
enum Reply {
    /// Respond with this head and the feed's body.
    Respond {
        status: u16,
        content_type: Option<String>,
    },
    /// Fail the request.
    Fail(String),
    /// Never respond.
    Hang,
}

/// Transport serving a single scripted response.
pub struct MemoryTransport {
    reply: Reply,
    body: Mutex<Option<mpsc::UnboundedReceiver<BodyItem>>>,
    opens: Arc<AtomicUsize>,
}

/// Sending side of a [`MemoryTransport`] body.
#[derive(Clone)]
pub struct MemoryFeed {
    tx: mpsc::UnboundedSender<BodyItem>,
    opens: Arc<AtomicUsize>,
}

impl MemoryTransport {
    /// Transport answering with status 200 and the given content type.
    pub fn new(content_type: Option<&str>) -> (Self, MemoryFeed) {
        Self::with_reply(Reply::Respond {
            status: 200,
            content_type: content_type.map(str::to_string),
        })
    }

    /// Transport answering with a valid M-JPEG content type.
    pub fn mjpeg() -> (Self, MemoryFeed) {
        Self::new(Some("multipart/x-mixed-replace; boundary=frame"))
    }

    /// Transport whose request fails before headers arrive.
    pub fn failing(message: &str) -> (Self, MemoryFeed) {
        Self::with_reply(Reply::Fail(message.to_string()))
    }

    /// Transport that never delivers headers.
    pub fn unresponsive() -> (Self, MemoryFeed) {
        Self::with_reply(Reply::Hang)
    }

    fn with_reply(reply: Reply) -> (Self, MemoryFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        let opens = Arc::new(AtomicUsize::new(0));
        let transport = Self {
            reply,
            body: Mutex::new(Some(rx)),
            opens: opens.clone(),
        };
        (transport, MemoryFeed { tx, opens })
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, _url: &str) -> Result<StreamResponse, TransportError> {
        self.opens.fetch_add(1, Ordering::AcqRel);

        let (status, content_type) = match &self.reply {
            Reply::Respond {
                status,
                content_type,
            } => (*status, content_type.clone()),
            Reply::Fail(message) => return Err(TransportError::Other(message.clone())),
            Reply::Hang => futures::future::pending().await,
        };

        let rx = self
            .body
            .lock()
            .map_err(|_| TransportError::Other("memory transport poisoned".into()))?
            .take()
            .ok_or_else(|| TransportError::Other("memory transport already opened".into()))?;

        let body = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed();

        Ok(StreamResponse {
            status,
            content_type,
            body,
        })
    }
}

impl MemoryFeed {
    /// Push a body chunk. Returns false once the reader is gone.
    pub fn send(&self, chunk: &[u8]) -> bool {
        self.tx.send(Ok(Bytes::copy_from_slice(chunk))).is_ok()
    }

    /// Fail the body stream with an error.
    pub fn fail(&self, message: &str) -> bool {
        self.tx
            .send(Err(TransportError::Other(message.to_string())))
            .is_ok()
    }

    /// End the body stream.
    pub fn close(self) {
        drop(self.tx);
    }

    /// Check if the reader has been dropped (request cancelled).
    pub fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }

    /// Number of times the transport was opened.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Acquire)
    }
}
