//! Error types for thumbnail-dl
//!
//! The worker deliberately has no per-request error channel: a failed fetch
//! or a malformed payload is logged and dropped, and the UI keeps showing its
//! placeholder. The variants here cover the library's fallible construction
//! and lifecycle surface only.

use thiserror::Error;

/// Result type alias for thumbnail-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for thumbnail-dl
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport error from the underlying client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The requested URL could not be parsed
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL string that failed to parse
        url: String,
        /// Parser diagnostic
        reason: String,
    },

    /// The downloader has been shut down and cannot be restarted
    #[error("downloader terminated: the worker cannot be restarted after quit()")]
    Terminated,
}
