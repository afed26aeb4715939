//! Decoder options.
//!
//! Options can be built in code or loaded from JSON. The JSON form uses
//! camelCase keys and integer milliseconds; missing keys keep their
//! defaults.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use mjpeg_decoder::DecoderOptions;
//!
//! let options = DecoderOptions::from_json(r#"{"interval": 3000, "maxFrames": 10}"#).unwrap();
//!
//! assert_eq!(options.interval, Duration::from_secs(3));
//! assert_eq!(options.max_frames, 10);
//! assert_eq!(options.timeout, Duration::from_secs(10));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DecoderError, Result};
use crate::protocol::DEFAULT_MAX_BUFFER_SIZE;

/// Default delivery interval (every frame).
pub const DEFAULT_INTERVAL: Duration = Duration::ZERO;

/// Default frame budget (unlimited).
pub const DEFAULT_MAX_FRAMES: u64 = 0;

/// Default time allowed for response headers to arrive.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Options controlling a decoder session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecoderOptions {
    /// Minimum spacing between frames delivered to continuous subscribers.
    #[serde(with = "millis")]
    pub interval: Duration,
    /// Stop after this many delivered frames (0 = unlimited).
    pub max_frames: u64,
    /// Abort if response headers have not arrived within this duration.
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Ceiling for buffered bytes while searching for a frame.
    pub max_buffer_size: usize,
}

impl DecoderOptions {
    /// Parse options from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Copy of these options preset for a single snapshot.
    ///
    /// Delivers the first frame and ends the session right after it.
    pub fn snapshot(self) -> Self {
        Self {
            interval: Duration::ZERO,
            max_frames: 1,
            ..self
        }
    }

    /// Check option ranges.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(DecoderError::Config("timeout must be positive".into()));
        }
        if self.max_buffer_size == 0 {
            return Err(DecoderError::Config(
                "max_buffer_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_frames: DEFAULT_MAX_FRAMES,
            timeout: DEFAULT_TIMEOUT,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

/// Durations as integer milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
