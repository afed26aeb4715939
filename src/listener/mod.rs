//! Listener module - frame/abort notification and pending captures.
//!
//! Provides:
//! - [`ListenerRegistry`] - callbacks and channel subscribers for push mode
//! - [`PendingCaptures`] - queue of one-shot capture completions
//!
//! Both are owned by a single session. Every frame the extractor produces
//! goes through the session, which feeds the registry (unless throttled)
//! and then drains the pending queue, so the two consumption modes cannot
//! diverge.
//!
//! # Example
//!
//! ```ignore
//! use mjpeg_decoder::listener::ListenerRegistry;
//!
//! let mut registry = ListenerRegistry::new();
//!
//! registry.on_frame(|frame, seq| {
//!     println!("frame #{} ({} bytes)", seq, frame.len());
//!     Ok(())
//! });
//!
//! let mut events = registry.subscribe();
//! ```

mod pending;
mod registry;

pub use pending::{CaptureResult, CaptureSender, PendingCaptures};
pub use registry::{
    AbortListener, DecoderEvent, FrameListener, ListenerError, ListenerRegistry, ListenerResult,
};
