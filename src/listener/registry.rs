//! Listener registry for push-mode notifications.
//!
//! Two kinds of consumers are supported:
//! - callbacks registered with [`ListenerRegistry::on_frame`] /
//!   [`ListenerRegistry::on_abort`]
//! - channel subscribers created with [`ListenerRegistry::subscribe`]
//!
//! Callbacks run behind an isolation boundary: an `Err` return or a panic
//! is logged and discarded, so a broken consumer cannot disturb the
//! session or the other listeners. Subscribers whose receiver is gone are
//! pruned on the next emit.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::mpsc;

use crate::error::DecoderError;
use crate::protocol::Frame;
use crate::session::AbortReason;

/// Error type returned by listener callbacks.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for listener callbacks.
pub type ListenerResult = std::result::Result<(), ListenerError>;

/// Callback receiving `(frame, sequence)` for every delivered frame.
pub type FrameListener = Box<dyn FnMut(&Frame, u64) -> ListenerResult + Send>;

/// Callback receiving the terminal `(reason, error)` exactly once.
pub type AbortListener = Box<dyn FnMut(AbortReason, Option<&DecoderError>) -> ListenerResult + Send>;

/// Event delivered to channel subscribers.
#[derive(Debug, Clone)]
pub enum DecoderEvent {
    /// A frame passed the throttle.
    Frame {
        /// Frame bytes.
        frame: Frame,
        /// Sequence number, starting at 1.
        sequence: u64,
    },
    /// The session ended. Always the last event.
    Aborted {
        /// Terminal reason.
        reason: AbortReason,
        /// Underlying error, if the reason carries one.
        error: Option<DecoderError>,
    },
}

/// Registry of push-mode consumers for one session.
#[derive(Default)]
pub struct ListenerRegistry {
    frame_listeners: Vec<FrameListener>,
    abort_listeners: Vec<AbortListener>,
    subscribers: Vec<mpsc::UnboundedSender<DecoderEvent>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a frame callback.
    pub fn on_frame<F>(&mut self, listener: F)
    where
        F: FnMut(&Frame, u64) -> ListenerResult + Send + 'static,
    {
        self.frame_listeners.push(Box::new(listener));
    }

    /// Register an abort callback.
    pub fn on_abort<F>(&mut self, listener: F)
    where
        F: FnMut(AbortReason, Option<&DecoderError>) -> ListenerResult + Send + 'static,
    {
        self.abort_listeners.push(Box::new(listener));
    }

    /// Create a channel subscription.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<DecoderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Attach an existing subscription sender.
    pub fn add_subscriber(&mut self, tx: mpsc::UnboundedSender<DecoderEvent>) {
        self.subscribers.push(tx);
    }

    /// Total number of callbacks and live subscribers.
    pub fn len(&self) -> usize {
        self.frame_listeners.len() + self.abort_listeners.len() + self.subscribers.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify every consumer of a delivered frame.
    pub fn emit_frame(&mut self, frame: &Frame, sequence: u64) {
        for listener in &mut self.frame_listeners {
            isolate("frame", || listener(frame, sequence));
        }

        self.subscribers.retain(|tx| {
            tx.send(DecoderEvent::Frame {
                frame: frame.clone(),
                sequence,
            })
            .is_ok()
        });
    }

    /// Notify every consumer that the session ended.
    ///
    /// Subscribers are released afterwards so their channels close.
    pub fn emit_abort(&mut self, reason: AbortReason, error: Option<&DecoderError>) {
        for listener in &mut self.abort_listeners {
            isolate("abort", || listener(reason, error));
        }

        for tx in self.subscribers.drain(..) {
            let _ = tx.send(DecoderEvent::Aborted {
                reason,
                error: error.cloned(),
            });
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("frame_listeners", &self.frame_listeners.len())
            .field("abort_listeners", &self.abort_listeners.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Run a listener, logging and discarding its failure.
fn isolate(kind: &str, call: impl FnOnce() -> ListenerResult) {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("{} listener returned error: {}", kind, e),
        Err(_) => tracing::warn!("{} listener panicked", kind),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use super::*;

    fn frame() -> Frame {
        Frame::from_slice(&[0xFF, 0xD8, 0x01, 0xFF, 0xD9])
    }

    #[test]
    fn test_frame_callbacks_receive_sequence() {
        let mut registry = ListenerRegistry::new();
        let seen = Arc::new(AtomicU64::new(0));
        let seen_clone = seen.clone();

        registry.on_frame(move |frame, seq| {
            assert_eq!(frame.len(), 5);
            seen_clone.store(seq, Ordering::SeqCst);
            Ok(())
        });

        registry.emit_frame(&frame(), 7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_failing_listener_is_isolated() {
        let mut registry = ListenerRegistry::new();
        let calls = Arc::new(AtomicU64::new(0));
        let calls_clone = calls.clone();

        registry.on_frame(|_, _| Err("consumer bug".into()));
        registry.on_frame(|_, _| panic!("consumer panic"));
        registry.on_frame(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.emit_frame(&frame(), 1);
        registry.emit_frame(&frame(), 2);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_subscriber_receives_frames_then_abort() {
        let mut registry = ListenerRegistry::new();
        let mut rx = registry.subscribe();

        registry.emit_frame(&frame(), 1);
        registry.emit_abort(AbortReason::End, None);

        match rx.try_recv().unwrap() {
            DecoderEvent::Frame { frame: f, sequence } => {
                assert_eq!(f, frame());
                assert_eq!(sequence, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(
            rx.try_recv().unwrap(),
            DecoderEvent::Aborted {
                reason: AbortReason::End,
                error: None
            }
        ));

        // Channel closes once the abort was delivered
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut registry = ListenerRegistry::new();
        let rx = registry.subscribe();
        assert_eq!(registry.len(), 1);

        drop(rx);
        registry.emit_frame(&frame(), 1);

        assert!(registry.is_empty());
    }

    #[test]
    fn test_abort_callback_gets_error() {
        let mut registry = ListenerRegistry::new();
        let got_error = Arc::new(AtomicU64::new(0));
        let got_error_clone = got_error.clone();

        registry.on_abort(move |reason, error| {
            assert_eq!(reason, AbortReason::HttpError);
            if error.is_some() {
                got_error_clone.store(1, Ordering::SeqCst);
            }
            Ok(())
        });

        let err = DecoderError::Config("x".into());
        registry.emit_abort(AbortReason::HttpError, Some(&err));

        assert_eq!(got_error.load(Ordering::SeqCst), 1);
    }
}
