//! Core types for thumbnail-dl

/// Observable download events
///
/// Emitted on the broadcast channel returned by
/// [`subscribe`](crate::ThumbnailDownloader::subscribe). Events are purely
/// observational: they never change what reaches the delivery listener, and
/// they are dropped when nobody is subscribed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A request was recorded and handed to the worker
    Queued {
        /// The requested URL
        url: String,
    },
    /// Fetching failed; the request was dropped
    FetchFailed {
        /// The URL whose fetch failed
        url: String,
    },
    /// The fetched payload could not be decoded; the request was dropped
    DecodeFailed {
        /// The URL whose payload was malformed
        url: String,
    },
    /// A decoded image reached the listener
    Delivered {
        /// The URL that was delivered
        url: String,
    },
    /// A completed download was discarded because its target has since been
    /// canceled or re-assigned to a different URL
    Stale {
        /// The URL whose result was discarded
        url: String,
    },
    /// [`cancel_all`](crate::ThumbnailDownloader::cancel_all) cleared the
    /// request map and all pending work
    QueueCleared,
    /// [`quit`](crate::ThumbnailDownloader::quit) was called; no further
    /// deliveries will occur
    Shutdown,
}

/// Downloader lifecycle state
///
/// [`start`](crate::ThumbnailDownloader::start) only returns once the worker
/// loop is ready, so there is no observable gap between "started" and
/// "running". There is no transition out of `Terminated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed; the worker has not been started
    Created,
    /// Worker loop running and accepting work
    Running,
    /// `quit()` has taken effect; all queue operations are no-ops
    Terminated,
}
