//! Decoder session: the lifecycle state machine.
//!
//! A [`Session`] owns everything mutable about one decoder run: the frame
//! buffer, the throttle, the pending captures and the listener registry.
//! It is driven by events (headers, chunks, errors, timer, stop) and is
//! fully synchronous; the async driver in [`crate::decoder`] only pumps
//! transport and command events into it.
//!
//! ```text
//! Idle ──start──► Connecting ──valid headers──► Streaming
//!                     │                             │
//!                     └──────────┬──────────────────┘
//!                                ▼
//!                        Aborted(reason)   (absorbing)
//! ```

use std::fmt;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::DecoderOptions;
use crate::error::DecoderError;
use crate::listener::{CaptureSender, DecoderEvent, ListenerRegistry, PendingCaptures};
use crate::protocol::{is_mjpeg_content_type, Frame, FrameBuffer};
use crate::throttle::Throttle;
use crate::transport::TransportError;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AbortReason {
    /// Response content type is not M-JPEG.
    #[serde(rename = "invalid_mjpeg_stream")]
    InvalidStream,
    /// Transport failed while connecting or streaming.
    #[serde(rename = "http_error")]
    HttpError,
    /// Caller stopped the decoder.
    #[serde(rename = "stop")]
    Stop,
    /// Buffer ceiling hit before a frame completed.
    #[serde(rename = "max_buffer_size_exceeded")]
    BufferOverflow,
    /// Frame budget reached, or the server closed the stream.
    #[serde(rename = "end")]
    End,
    /// Headers did not arrive in time.
    #[serde(rename = "timeout")]
    Timeout,
}

impl AbortReason {
    /// Stable name of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            AbortReason::InvalidStream => "invalid_mjpeg_stream",
            AbortReason::HttpError => "http_error",
            AbortReason::Stop => "stop",
            AbortReason::BufferOverflow => "max_buffer_size_exceeded",
            AbortReason::End => "end",
            AbortReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable decoder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Created, no request issued yet.
    Idle,
    /// Request issued, waiting for headers (timeout armed).
    Connecting,
    /// Valid headers received, consuming the body.
    Streaming,
    /// Terminal.
    Aborted(AbortReason),
}

impl DecoderState {
    /// Check if the session is over.
    pub fn is_aborted(&self) -> bool {
        matches!(self, DecoderState::Aborted(_))
    }

    /// Terminal reason, if aborted.
    pub fn abort_reason(&self) -> Option<AbortReason> {
        match self {
            DecoderState::Aborted(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// State and pipeline of one decoder run.
pub(crate) struct Session {
    buffer: FrameBuffer,
    throttle: Throttle,
    pending: PendingCaptures,
    listeners: ListenerRegistry,
    state: watch::Sender<DecoderState>,
    /// Cancelled by the handle on `stop()`; checked between frames.
    cancel: CancellationToken,
}

impl Session {
    /// Create an idle session publishing its state on `state`.
    pub(crate) fn new(
        options: &DecoderOptions,
        listeners: ListenerRegistry,
        state: watch::Sender<DecoderState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            buffer: FrameBuffer::with_max_buffer_size(options.max_buffer_size),
            throttle: Throttle::new(options.interval, options.max_frames),
            pending: PendingCaptures::new(),
            listeners,
            state,
            cancel,
        }
    }

    pub(crate) fn state(&self) -> DecoderState {
        *self.state.borrow()
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.state().is_aborted()
    }

    pub(crate) fn listeners_mut(&mut self) -> &mut ListenerRegistry {
        &mut self.listeners
    }

    /// Attach a channel subscriber. Dropped at once if the session is over,
    /// so the receiver sees a closed channel.
    pub(crate) fn subscribe(&mut self, tx: mpsc::UnboundedSender<DecoderEvent>) {
        if !self.is_aborted() {
            self.listeners.add_subscriber(tx);
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn set_state(&self, state: DecoderState) {
        self.state.send_replace(state);
    }

    /// `Idle → Connecting`.
    pub(crate) fn begin_connecting(&mut self) {
        if self.state() == DecoderState::Idle {
            tracing::debug!("Decoder connecting");
            self.set_state(DecoderState::Connecting);
        }
    }

    /// Queue a one-shot capture. Rejected at once if the session is over.
    pub(crate) fn enqueue_capture(&mut self, tx: CaptureSender) {
        match self.state().abort_reason() {
            Some(reason) => {
                let _ = tx.send(Err(DecoderError::SessionEnded(reason)));
            }
            None => self.pending.push(tx),
        }
    }

    /// Response headers arrived. Returns true if the stream is accepted.
    pub(crate) fn on_headers(&mut self, status: u16, content_type: Option<&str>) -> bool {
        if self.state() != DecoderState::Connecting {
            return false;
        }

        if !is_mjpeg_content_type(content_type) {
            tracing::warn!(
                "Rejecting stream: status {}, content type {:?}",
                status,
                content_type
            );
            let err = DecoderError::InvalidStream {
                content_type: content_type.map(str::to_string),
            };
            self.fail(AbortReason::InvalidStream, err);
            return false;
        }

        tracing::info!("M-JPEG stream accepted (status {})", status);
        self.set_state(DecoderState::Streaming);
        true
    }

    /// A body chunk arrived at `now`.
    pub(crate) fn on_data(&mut self, chunk: &[u8], now: Instant) {
        if self.state() != DecoderState::Streaming {
            return;
        }

        let frames = match self.buffer.push(chunk) {
            Ok(frames) => frames,
            Err(err) => {
                tracing::warn!("{}", err);
                self.fail(AbortReason::BufferOverflow, err);
                return;
            }
        };

        for frame in frames {
            if self.cancel.is_cancelled() {
                self.stop();
            }
            if self.is_aborted() {
                break;
            }
            self.deliver_frame(frame, now);
        }
    }

    /// Single funnel for both consumption modes.
    fn deliver_frame(&mut self, frame: Frame, now: Instant) {
        match self.throttle.admit(now) {
            None => {
                tracing::trace!("Frame throttled ({} bytes)", frame.len());
                self.pending.resolve(&frame);
            }
            Some(sequence) => {
                tracing::debug!("Frame #{} ({} bytes)", sequence, frame.len());
                self.listeners.emit_frame(&frame, sequence);
                self.pending.resolve(&frame);

                if self.throttle.is_exhausted() {
                    tracing::debug!("Frame budget of {} reached", self.throttle.max_frames());
                    self.abort(AbortReason::End, None);
                }
            }
        }
    }

    /// Transport failure.
    pub(crate) fn on_transport_error(&mut self, err: TransportError) {
        tracing::error!("Transport error: {}", err);
        let err = DecoderError::from(err);
        self.pending.reject(&err);
        self.abort(AbortReason::HttpError, Some(err));
    }

    /// Server closed the body.
    pub(crate) fn on_end_of_stream(&mut self) {
        tracing::info!("M-JPEG stream closed by server");
        self.abort(AbortReason::End, None);
    }

    /// Header watchdog fired.
    pub(crate) fn on_timeout(&mut self) {
        if self.state() == DecoderState::Connecting {
            tracing::warn!("No response headers before timeout");
            self.abort(AbortReason::Timeout, None);
        }
    }

    /// Caller cancellation. No-op unless a request is active.
    pub(crate) fn stop(&mut self) {
        match self.state() {
            DecoderState::Connecting | DecoderState::Streaming => {
                tracing::debug!("Decoder stopped by caller");
                self.abort(AbortReason::Stop, None);
            }
            DecoderState::Idle | DecoderState::Aborted(_) => {}
        }
    }

    /// Reject pending captures with `err`, then abort without an error
    /// payload for push consumers.
    fn fail(&mut self, reason: AbortReason, err: DecoderError) {
        self.pending.reject(&err);
        self.abort(reason, None);
    }

    /// Enter the terminal state. Idempotent.
    ///
    /// Captures still waiting are rejected with `SessionEnded`; push
    /// consumers get the abort notification exactly once. The driver drops
    /// the transport once it sees the aborted state.
    pub(crate) fn abort(&mut self, reason: AbortReason, error: Option<DecoderError>) {
        if self.is_aborted() {
            return;
        }

        tracing::info!("Decoder aborted: {}", reason);
        self.set_state(DecoderState::Aborted(reason));
        self.buffer.clear();

        self.pending
            .reject(&error.clone().unwrap_or(DecoderError::SessionEnded(reason)));
        self.listeners.emit_abort(reason, error.as_ref());
    }
}
