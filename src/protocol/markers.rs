//! JPEG marker constants and byte-pattern search.
//!
//! Frames are delimited purely by the start-of-image (`FF D8`) and
//! end-of-image (`FF D9`) markers. The multipart boundary declared by the
//! server is never used to split the stream.

/// Start-of-image marker.
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End-of-image marker.
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Length of both markers.
pub const MARKER_LEN: usize = 2;

/// Default ceiling for buffered bytes (16 × 4096 × 4096 = 256MB).
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 16 * 4096 * 4096;

/// Find the first occurrence of `marker` in `buffer` at or after `from`.
///
/// Returns the absolute offset of the marker's first byte.
#[inline]
pub fn find_marker(buffer: &[u8], from: usize, marker: &[u8; MARKER_LEN]) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(MARKER_LEN)
        .position(|w| w == marker)
        .map(|pos| pos + from)
}
