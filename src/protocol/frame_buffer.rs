//! Frame buffer for accumulating stream chunks.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for locating JPEG frames in the byte stream:
//! - `SeekingStart`: no SOI marker found yet, whole buffer retained
//! - `SeekingEnd`: SOI found, searching for EOI strictly after it
//!
//! Anything in front of the SOI marker (multipart boundary lines, part
//! headers) is dropped together with the frame once it completes.
//!
//! # Example
//!
//! ```
//! use mjpeg_decoder::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//!
//! assert!(buffer.push(b"--frame\r\n\xFF\xD8ab").unwrap().is_empty());
//! let frames = buffer.push(b"c\xFF\xD9\r\n").unwrap();
//!
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].as_bytes(), b"\xFF\xD8abc\xFF\xD9");
//! assert_eq!(buffer.buffered(), b"\r\n");
//! ```

use bytes::BytesMut;

use super::markers::{find_marker, DEFAULT_MAX_BUFFER_SIZE, EOI, MARKER_LEN, SOI};
use super::Frame;
use crate::error::{DecoderError, Result};

/// Scan state. Offsets are relative to the start of `buffer`.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Searching for SOI from `scan_from`.
    SeekingStart { scan_from: usize },
    /// SOI found at `start`, searching for EOI from `scan_from`.
    SeekingEnd { start: usize, scan_from: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from the response body.
    buffer: BytesMut,
    /// Current scan state.
    state: State,
    /// Maximum allowed buffered bytes.
    max_buffer_size: usize,
}

impl FrameBuffer {
    /// Create a new frame buffer with the default 256MB ceiling.
    pub fn new() -> Self {
        Self::with_max_buffer_size(DEFAULT_MAX_BUFFER_SIZE)
    }

    /// Create a new frame buffer with a custom ceiling.
    pub fn with_max_buffer_size(max_buffer_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::SeekingStart { scan_from: 0 },
            max_buffer_size,
        }
    }

    /// Push a chunk into the buffer and extract all complete frames.
    ///
    /// Returns frames in stream order (may be empty if still waiting for
    /// data). Partial data stays buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::BufferOverflow`] when the buffered length
    /// exceeds the ceiling. The buffer is cleared and no frame is produced
    /// from the discarded bytes.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        if self.buffer.len() > self.max_buffer_size {
            let len = self.buffer.len();
            self.clear();
            return Err(DecoderError::BufferOverflow {
                len,
                max: self.max_buffer_size,
            });
        }

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one() {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    ///
    /// Returns `None` if more data is needed.
    fn try_extract_one(&mut self) -> Option<Frame> {
        loop {
            match self.state {
                State::SeekingStart { scan_from } => {
                    let Some(start) = find_marker(&self.buffer, scan_from, &SOI) else {
                        self.state = State::SeekingStart {
                            scan_from: self.resume_point(),
                        };
                        return None;
                    };

                    self.state = State::SeekingEnd {
                        start,
                        scan_from: start + SOI.len(),
                    };
                }

                State::SeekingEnd { start, scan_from } => {
                    let Some(end) = find_marker(&self.buffer, scan_from, &EOI) else {
                        self.state = State::SeekingEnd {
                            start,
                            scan_from: self.resume_point().max(start + SOI.len()),
                        };
                        return None;
                    };

                    // Drop the preamble, then split the frame off (zero-copy freeze)
                    let _ = self.buffer.split_to(start);
                    let frame = self.buffer.split_to(end + EOI.len() - start).freeze();

                    self.state = State::SeekingStart { scan_from: 0 };
                    return Some(Frame::new(frame));
                }
            }
        }
    }

    /// Offset where the next search resumes. A marker may straddle the end
    /// of the buffer, so the last byte is rescanned.
    #[inline]
    fn resume_point(&self) -> usize {
        self.buffer.len().saturating_sub(MARKER_LEN - 1)
    }

    /// Bytes currently retained (not yet part of an emitted frame).
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Configured ceiling in bytes.
    pub fn max_buffer_size(&self) -> usize {
        self.max_buffer_size
    }

    /// Offset of the pending frame's SOI marker, if one has been found.
    pub fn image_start(&self) -> Option<usize> {
        match self.state {
            State::SeekingStart { .. } => None,
            State::SeekingEnd { start, .. } => Some(start),
        }
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::SeekingStart { scan_from: 0 };
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
