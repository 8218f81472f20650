//! # thumbnail-dl
//!
//! Embeddable asynchronous thumbnail fetcher for recycling list UIs.
//!
//! A single background worker receives `(target, url)` requests, downloads
//! the bytes over HTTP, decodes them, and hands the decoded image back to a
//! delivery context owned by the caller, taking care that results made stale
//! by view-recycling are discarded instead of flashing the wrong image into a
//! reused row.
//!
//! ## Design Philosophy
//!
//! thumbnail-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **UI-agnostic** - Target identity, image type, and delivery context are
//!   all supplied by the embedder through small traits
//! - **Latest-URL-wins** - A recycled row that re-requests never shows the
//!   image of the URL it used to want
//! - **Failure-silent** - A failed fetch or a malformed payload is logged and
//!   dropped; the UI simply keeps its placeholder
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use thumbnail_dl::{ChannelSink, Config, ImageDecoder, ThumbnailDownloader};
//!
//! // Decoder into whatever image type the UI toolkit wants.
//! struct PngDecoder;
//!
//! impl ImageDecoder for PngDecoder {
//!     type Image = Vec<u8>;
//!
//!     fn decode(&self, bytes: &[u8]) -> Option<Self::Image> {
//!         Some(bytes.to_vec())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Completion callbacks run on the sink's own serial context.
//!     let (sink, _delivery) = ChannelSink::spawn();
//!     let downloader: ThumbnailDownloader<usize, PngDecoder> =
//!         ThumbnailDownloader::new(Config::default(), PngDecoder, Arc::new(sink))?;
//!
//!     downloader.set_thumbnail_listener(|row: usize, image: Vec<u8>| {
//!         println!("row {row}: {} bytes ready", image.len());
//!     });
//!
//!     // start() returns once the worker accepts work.
//!     downloader.start().await?;
//!
//!     downloader.queue_thumbnail(0, Some("https://example.com/a.jpg".to_string()));
//!     // Recycling row 0 onto a different URL supersedes the request above.
//!     downloader.queue_thumbnail(0, Some("https://example.com/b.jpg".to_string()));
//!
//!     downloader.quit();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Image decoding seam
pub mod decode;
/// Delivery sink: the context that runs completion callbacks
pub mod delivery;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Thumbnail byte fetching over HTTP
pub mod fetch;
/// Core types and events
pub mod types;

mod request_map;

// Re-export commonly used types
pub use config::Config;
pub use decode::ImageDecoder;
pub use delivery::{ChannelSink, DeliveryJob, DeliverySink};
pub use downloader::{ThumbnailDownloader, ThumbnailListener};
pub use error::{Error, Result};
pub use fetch::{ByteFetcher, HttpFetcher};
pub use types::{Event, Lifecycle};
