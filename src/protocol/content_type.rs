//! Content-Type validation for M-JPEG responses.
//!
//! A stream is accepted when its content type contains
//! `multipart/x-mixed-replace`, followed by `;`, optional whitespace and a
//! non-empty `boundary=` parameter. The media type is matched
//! ASCII case-insensitively. The boundary token is reported but frames are
//! never split on it.

/// Media type required for M-JPEG streams.
pub const MJPEG_MEDIA_TYPE: &str = "multipart/x-mixed-replace";

const BOUNDARY_PARAM: &str = "boundary=";

/// Extract the boundary token from an M-JPEG content type.
///
/// Returns `None` if the header does not describe an M-JPEG stream.
///
/// ```
/// use mjpeg_decoder::protocol::parse_boundary;
///
/// assert_eq!(parse_boundary("multipart/x-mixed-replace; boundary=frame"), Some("frame"));
/// assert_eq!(parse_boundary("multipart/x-mixed-replace;boundary=\"--b\""), Some("--b"));
/// assert_eq!(parse_boundary("image/jpeg"), None);
/// ```
pub fn parse_boundary(content_type: &str) -> Option<&str> {
    let start = find_ignore_ascii_case(content_type, MJPEG_MEDIA_TYPE)?;
    let rest = &content_type[start + MJPEG_MEDIA_TYPE.len()..];

    let rest = rest.strip_prefix(';')?.trim_start();
    if !rest
        .get(..BOUNDARY_PARAM.len())?
        .eq_ignore_ascii_case(BOUNDARY_PARAM)
    {
        return None;
    }

    let token = rest[BOUNDARY_PARAM.len()..]
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches('"');

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Check whether a response content type describes an M-JPEG stream.
pub fn is_mjpeg_content_type(content_type: Option<&str>) -> bool {
    content_type.and_then(parse_boundary).is_some()
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}
