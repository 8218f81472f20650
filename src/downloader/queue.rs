//! Request recording and cancellation.

use std::hash::Hash;
use std::sync::atomic::Ordering;

use crate::decode::ImageDecoder;
use crate::types::Event;

use super::ThumbnailDownloader;
use super::worker::WorkerCommand;

impl<T, D> ThumbnailDownloader<T, D>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
    D: ImageDecoder,
{
    /// Request the thumbnail behind `url` for `target`.
    ///
    /// Records `target -> url` as the current desire and queues a work item.
    /// Non-blocking; safe to call from a UI context at any rate. Re-queueing
    /// the same target before its download starts simply updates the mapped
    /// URL: the worker resolves the URL when it picks an item up, so the
    /// newest request wins without explicit cancellation.
    ///
    /// `None` (or an empty string) cancels the outstanding request for
    /// `target` instead: the map entry is removed, no work item is queued,
    /// and any already-queued item for this target becomes a no-op.
    ///
    /// After [`quit`](Self::quit) the call is accepted but has no effect.
    pub fn queue_thumbnail(&self, target: T, url: Option<String>) {
        if self.worker.terminated.load(Ordering::SeqCst) {
            tracing::debug!("queue_thumbnail after quit; ignoring");
            return;
        }

        match url {
            Some(url) if !url.is_empty() => {
                self.requests.set(target.clone(), url.clone());
                let epoch = self.worker.epoch.load(Ordering::SeqCst);
                // The worker may not be started yet; items wait in the
                // channel until it is.
                self.worker
                    .cmd_tx
                    .send(WorkerCommand::Download { target, epoch })
                    .ok();
                self.emit_event(Event::Queued { url });
            }
            _ => {
                tracing::debug!("empty URL treated as cancellation");
                self.requests.remove(&target);
            }
        }
    }

    /// Cancel the outstanding request for `target`, if any.
    ///
    /// Equivalent to `queue_thumbnail(target, None)`. An in-flight fetch is
    /// not interrupted; its eventual delivery is rejected by the staleness
    /// check instead.
    pub fn cancel(&self, target: &T) {
        self.requests.remove(target);
    }

    /// Cancel every outstanding request and discard all pending work items.
    ///
    /// Work items stamped with an older generation are dropped at dequeue
    /// without fetching. In-flight work is not forcibly aborted; its eventual
    /// delivery is suppressed by the delivery-time staleness check.
    pub fn cancel_all(&self) {
        self.requests.clear();
        self.worker.epoch.fetch_add(1, Ordering::SeqCst);
        self.emit_event(Event::QueueCleared);
        tracing::debug!("request map cleared, pending work discarded");
    }

    /// Number of targets with an outstanding request.
    pub fn pending_count(&self) -> usize {
        self.requests.len()
    }
}
