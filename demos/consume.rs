//! Consume - write a frame every few seconds.
//!
//! This example demonstrates:
//! - Registering frame and abort listeners with the builder
//! - Throttling delivery with `interval`
//! - Waiting for the session to end
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=debug cargo run --example consume -- http://127.0.0.1:8000/?action=stream
//! ```
//!
//! Frames are written to `results/<sequence>.jpg`. Press Ctrl+C to stop.

use std::time::Duration;

use mjpeg_decoder::MjpegDecoder;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://127.0.0.1:8000/?action=stream";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());
    std::fs::create_dir_all("results")?;

    let mut decoder = MjpegDecoder::builder(url)
        .interval(Duration::from_secs(3))
        .on_frame(|frame, seq| {
            std::fs::write(format!("results/{}.jpg", seq), frame)?;
            println!("frame #{} ({} bytes)", seq, frame.len());
            Ok(())
        })
        .on_abort(|reason, err| {
            match err {
                Some(err) => println!("decoder aborted for {}: {}", reason, err),
                None => println!("decoder aborted for {}", reason),
            }
            Ok(())
        })
        .build()?;

    decoder.start()?;
    let ended = decoder.wait_for_abort();

    tokio::select! {
        reason = ended => println!("stream finished: {}", reason?),
        _ = tokio::signal::ctrl_c() => decoder.stop(),
    }

    Ok(())
}
