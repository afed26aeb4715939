//! Snapshot - grab a single frame.
//!
//! ```sh
//! cargo run --example snapshot -- http://127.0.0.1:8000/?action=stream
//! ```

use mjpeg_decoder::{DecoderOptions, MjpegDecoder};
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://127.0.0.1:8000/?action=stream";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());

    let mut decoder = MjpegDecoder::for_snapshot(url, DecoderOptions::default())?;
    let frame = decoder.capture_once().await?;

    std::fs::create_dir_all("results")?;
    std::fs::write("results/snapshot.jpg", &frame)?;
    println!("saved results/snapshot.jpg ({} bytes)", frame.len());

    Ok(())
}
