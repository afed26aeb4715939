//! # mjpeg-decoder
//!
//! Extract JPEG frames from M-JPEG (`multipart/x-mixed-replace`) HTTP
//! streams, as served by IP cameras, `mjpg-streamer` and friends.
//!
//! Frames are located by their JPEG start/end markers, so the multipart
//! boundary never has to be parsed. Two consumption modes share one
//! pipeline:
//!
//! - **Push**: listeners or a channel receive every frame that passes the
//!   configured interval, with a sequence number
//! - **Snapshot**: `capture_once()` resolves with the next frame
//!
//! ## Example
//!
//! ```ignore
//! use mjpeg_decoder::{DecoderOptions, MjpegDecoder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut decoder = MjpegDecoder::for_snapshot(
//!         "http://127.0.0.1:8000/?action=stream",
//!         DecoderOptions::default(),
//!     )?;
//!
//!     let frame = decoder.capture_once().await?;
//!     std::fs::write("snapshot.jpg", frame)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod throttle;
pub mod transport;

mod decoder;
mod session;

pub use config::DecoderOptions;
pub use decoder::{DecoderBuilder, MjpegDecoder};
pub use error::{DecoderError, Result};
pub use listener::DecoderEvent;
pub use protocol::Frame;
pub use session::{AbortReason, DecoderState};
