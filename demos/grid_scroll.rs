//! Simulated recycling grid: ten visible rows cycle through the given URLs,
//! and every reuse of a row supersedes its previous request.
//!
//! Usage: cargo run --example grid_scroll -- <url> [<url> ...]

use std::sync::Arc;
use std::time::Duration;

use thumbnail_dl::{ChannelSink, Config, ImageDecoder, ThumbnailDownloader};

/// "Decodes" by reporting the payload size; stands in for a real image codec.
struct SizeDecoder;

impl ImageDecoder for SizeDecoder {
    type Image = usize;

    fn decode(&self, bytes: &[u8]) -> Option<usize> {
        (!bytes.is_empty()).then_some(bytes.len())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        eprintln!("usage: grid_scroll <url> [<url> ...]");
        return Ok(());
    }

    let (sink, _delivery) = ChannelSink::spawn();
    let downloader: ThumbnailDownloader<usize, SizeDecoder> =
        ThumbnailDownloader::new(Config::default(), SizeDecoder, Arc::new(sink))?;

    downloader.set_thumbnail_listener(|row: usize, size: usize| {
        println!("row {row}: thumbnail ready ({size} bytes)");
    });

    downloader.start().await?;

    for (i, url) in urls.iter().enumerate() {
        let row = i % 10;
        downloader.queue_thumbnail(row, Some(url.clone()));
    }

    // A failed or superseded row simply keeps its placeholder.
    tokio::time::sleep(Duration::from_secs(3)).await;
    println!("{} request(s) still outstanding", downloader.pending_count());
    downloader.quit();
    Ok(())
}
