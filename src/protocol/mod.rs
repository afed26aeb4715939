//! Protocol module - JPEG markers, content-type checks, and framing.
//!
//! This module implements the stream side of the decoder:
//! - JPEG start/end marker search
//! - `multipart/x-mixed-replace` content-type validation
//! - Frame buffer for accumulating partial chunks
//! - Frame struct with typed accessors

mod content_type;
mod frame;
mod frame_buffer;
mod markers;

pub use content_type::{is_mjpeg_content_type, parse_boundary, MJPEG_MEDIA_TYPE};
pub use frame::Frame;
pub use frame_buffer::FrameBuffer;
pub use markers::{find_marker, DEFAULT_MAX_BUFFER_SIZE, EOI, MARKER_LEN, SOI};
