//! Pending one-shot captures.
//!
//! Captures wait in FIFO order and are completed together by the next
//! frame or by a terminal error. Completions whose receiver was dropped are
//! skipped.

use std::collections::VecDeque;

use tokio::sync::oneshot;

use crate::error::{DecoderError, Result};
use crate::protocol::Frame;

/// Outcome of a capture.
pub type CaptureResult = Result<Frame>;

/// Completion handle for one capture.
pub type CaptureSender = oneshot::Sender<CaptureResult>;

/// Queue of captures waiting for a frame.
#[derive(Debug, Default)]
pub struct PendingCaptures {
    queue: VecDeque<CaptureSender>,
}

impl PendingCaptures {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a capture.
    pub fn push(&mut self, tx: CaptureSender) {
        self.queue.push_back(tx);
    }

    /// Number of waiting captures.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if no capture is waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Complete every waiting capture with `frame`.
    ///
    /// Returns how many captures actually received it.
    pub fn resolve(&mut self, frame: &Frame) -> usize {
        self.complete(|| Ok(frame.clone()))
    }

    /// Fail every waiting capture with `err`.
    ///
    /// Returns how many captures actually received it.
    pub fn reject(&mut self, err: &DecoderError) -> usize {
        self.complete(|| Err(err.clone()))
    }

    fn complete(&mut self, outcome: impl Fn() -> CaptureResult) -> usize {
        self.queue
            .drain(..)
            .filter_map(|tx| tx.send(outcome()).ok())
            .count()
    }
}
