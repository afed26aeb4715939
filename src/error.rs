//! Error types for mjpeg-decoder.

use std::sync::Arc;

use thiserror::Error;

use crate::session::AbortReason;
use crate::transport::TransportError;

/// Main error type for all decoder operations.
///
/// Cloneable so a single failure can be handed to every pending capture
/// and to the abort listeners.
#[derive(Debug, Clone, Error)]
pub enum DecoderError {
    /// Response content type is not `multipart/x-mixed-replace; boundary=...`.
    #[error("invalid mjpeg stream (content type: {})", .content_type.as_deref().unwrap_or("<none>"))]
    InvalidStream { content_type: Option<String> },

    /// Buffered bytes exceeded the configured maximum before a frame completed.
    #[error("max buffer size exceeded ({len} > {max} bytes), which might be caused by an internal codec error")]
    BufferOverflow { len: usize, max: usize },

    /// Transport failure while connecting or streaming.
    #[error("HTTP error: {0}")]
    Http(#[source] Arc<TransportError>),

    /// The session reached a terminal state without producing a frame.
    #[error("decoder session ended: {0}")]
    SessionEnded(AbortReason),

    /// `start()` was called on a decoder that already started.
    #[error("decoder already started")]
    AlreadyStarted,

    /// Operation requires a started decoder.
    #[error("decoder not started")]
    NotStarted,

    /// `start()` was called outside a tokio runtime.
    #[error("no tokio runtime available to drive the decoder")]
    NoRuntime,

    /// Invalid decoder options.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON options could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[source] Arc<serde_json::Error>),
}

impl From<TransportError> for DecoderError {
    fn from(err: TransportError) -> Self {
        DecoderError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for DecoderError {
    fn from(err: serde_json::Error) -> Self {
        DecoderError::Json(Arc::new(err))
    }
}

/// Result type alias using DecoderError.
pub type Result<T> = std::result::Result<T, DecoderError>;
