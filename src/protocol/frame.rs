//! Frame struct with typed accessors.
//!
//! Represents one complete JPEG image cut out of the stream, from the
//! start-of-image marker through the end-of-image marker inclusive.
//! Uses `bytes::Bytes` so handing a frame to several consumers never copies.
//!
//! # Example
//!
//! ```
//! use mjpeg_decoder::protocol::Frame;
//! use bytes::Bytes;
//!
//! let frame = Frame::new(Bytes::from_static(&[0xFF, 0xD8, 0x01, 0xFF, 0xD9]));
//!
//! assert_eq!(frame.len(), 5);
//! assert!(frame.has_markers());
//! ```

use bytes::Bytes;

use super::markers::{EOI, SOI};

/// A complete JPEG frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
}

impl Frame {
    /// Create a new frame from already-extracted bytes.
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// Create a frame from raw bytes (copies data).
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Get a reference to the frame bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get a clone of the frame as Bytes (cheap, zero-copy).
    #[inline]
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Consume the frame and return its bytes.
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Frame length in bytes, markers included.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the frame is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check that the frame starts with SOI and ends with EOI.
    ///
    /// Always true for frames produced by [`FrameBuffer`](super::FrameBuffer).
    pub fn has_markers(&self) -> bool {
        self.data.len() >= SOI.len() + EOI.len()
            && self.data.starts_with(&SOI)
            && self.data.ends_with(&EOI)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Frame> for Bytes {
    fn from(frame: Frame) -> Self {
        frame.data
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.data.to_vec()
    }
}
