//! Core downloader implementation split into focused submodules.
//!
//! The `ThumbnailDownloader` struct and its methods are organized by domain:
//! - [`queue`] - Request recording and cancellation
//! - [`lifecycle`] - Startup and shutdown coordination
//! - [`worker`] - The serial fetch/decode/deliver loop

mod lifecycle;
mod queue;
pub(crate) mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockWriteGuard};

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::decode::ImageDecoder;
use crate::delivery::DeliverySink;
use crate::error::Result;
use crate::fetch::{ByteFetcher, HttpFetcher};
use crate::request_map::RequestMap;
use crate::types::Event;

use worker::WorkerCommand;

/// Listener receiving successfully delivered thumbnails.
///
/// Invoked on the delivery sink's context, 0 or 1 times per enqueue, and only
/// for the most recent non-canceled URL of a target. Failed fetches,
/// malformed payloads, and stale results never reach the listener.
///
/// Implemented for plain closures: any `Fn(T, I) + Send + Sync` works.
pub trait ThumbnailListener<T, I>: Send + Sync {
    /// Called with the decoded image for `target`.
    fn on_thumbnail_downloaded(&self, target: T, image: I);
}

impl<T, I, F> ThumbnailListener<T, I> for F
where
    F: Fn(T, I) + Send + Sync,
{
    fn on_thumbnail_downloaded(&self, target: T, image: I) {
        self(target, image)
    }
}

/// Replaceable listener slot, read at delivery time
pub(crate) type ListenerSlot<T, I> = Arc<RwLock<Option<Arc<dyn ThumbnailListener<T, I>>>>>;

/// Worker plumbing and lifecycle flags
pub(crate) struct WorkerState<T> {
    /// Sender half of the worker's ordered work queue
    pub(crate) cmd_tx: mpsc::UnboundedSender<WorkerCommand<T>>,
    /// Receiver half, taken exactly once by `start()`
    pub(crate) cmd_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<WorkerCommand<T>>>>>,
    /// Set once `start()` has spawned the loop
    pub(crate) started: Arc<AtomicBool>,
    /// Terminated flag, consulted at dequeue and at delivery time
    pub(crate) terminated: Arc<AtomicBool>,
    /// Generation stamp for pending work items; bumped by `cancel_all`
    pub(crate) epoch: Arc<AtomicU64>,
    /// Stops the worker loop on `quit()`
    pub(crate) cancel: CancellationToken,
}

impl<T> Clone for WorkerState<T> {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            cmd_rx: Arc::clone(&self.cmd_rx),
            started: Arc::clone(&self.started),
            terminated: Arc::clone(&self.terminated),
            epoch: Arc::clone(&self.epoch),
            cancel: self.cancel.clone(),
        }
    }
}

/// Main downloader instance (cloneable - all fields are shared handles)
///
/// Generic over:
/// - `T`, the opaque target identity: where a result should go, typically a
///   row or slot id. The core never inspects it beyond equality and hashing.
///   Use a *stable identifier* (never structurally-equal view data), because
///   recycled views are expected to reuse the same identity.
/// - `D`, the [`ImageDecoder`] turning fetched bytes into the UI's image type.
///
/// One dedicated worker processes requests strictly serially: a slow fetch
/// stalls everything queued behind it, and no timeout is imposed on fetches.
pub struct ThumbnailDownloader<T, D: ImageDecoder> {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Transport used by the worker (trait object for pluggable implementations)
    pub(crate) fetcher: Arc<dyn ByteFetcher>,
    /// Decoder invoked on the worker side for every fetched payload
    pub(crate) decoder: Arc<D>,
    /// target -> most recently requested URL
    pub(crate) requests: RequestMap<T>,
    /// Execution context that runs delivery closures
    pub(crate) sink: Arc<dyn DeliverySink>,
    /// Current delivery listener
    pub(crate) listener: ListenerSlot<T, D::Image>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Worker plumbing and lifecycle flags
    pub(crate) worker: WorkerState<T>,
}

impl<T, D: ImageDecoder> Clone for ThumbnailDownloader<T, D> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            fetcher: Arc::clone(&self.fetcher),
            decoder: Arc::clone(&self.decoder),
            requests: self.requests.clone(),
            sink: Arc::clone(&self.sink),
            listener: Arc::clone(&self.listener),
            event_tx: self.event_tx.clone(),
            worker: self.worker.clone(),
        }
    }
}

impl<T, D> ThumbnailDownloader<T, D>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
    D: ImageDecoder,
{
    /// Create a new downloader delivering completions through `sink`.
    ///
    /// The HTTP transport is built from `config`. The worker is not running
    /// yet: call [`start`](Self::start) before expecting results. Requests
    /// queued before `start()` are held and processed once the worker is up.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: Config, decoder: D, sink: Arc<dyn DeliverySink>) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        Ok(Self::with_fetcher(config, fetcher, decoder, sink))
    }

    /// Create a downloader with a custom transport.
    ///
    /// Useful for tests and for embedders whose bytes come from somewhere
    /// other than plain HTTP GET.
    pub fn with_fetcher(
        config: Config,
        fetcher: Arc<dyn ByteFetcher>,
        decoder: D,
        sink: Arc<dyn DeliverySink>,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(config.event_capacity.max(1));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        Self {
            config: Arc::new(config),
            fetcher,
            decoder: Arc::new(decoder),
            requests: RequestMap::new(),
            sink,
            listener: Arc::new(RwLock::new(None)),
            event_tx,
            worker: WorkerState {
                cmd_tx,
                cmd_rx: Arc::new(Mutex::new(Some(cmd_rx))),
                started: Arc::new(AtomicBool::new(false)),
                terminated: Arc::new(AtomicBool::new(false)),
                epoch: Arc::new(AtomicU64::new(0)),
                cancel: CancellationToken::new(),
            },
        }
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. Events are observational only: delivery semantics do
    /// not change whether anyone is listening. A subscriber that falls behind
    /// by more than the configured buffer receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration (cheap Arc clone).
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Install the delivery listener, replacing any previous one.
    ///
    /// Exactly one listener is active at a time. The slot is read at delivery
    /// time, so replacement affects every delivery that has not yet run.
    pub fn set_thumbnail_listener<L>(&self, listener: L)
    where
        L: ThumbnailListener<T, D::Image> + 'static,
    {
        let listener: Arc<dyn ThumbnailListener<T, D::Image>> = Arc::new(listener);
        *self.listener_slot() = Some(listener);
    }

    /// Remove the listener. Subsequent deliveries still perform their
    /// bookkeeping (staleness check, map removal) but invoke nothing.
    pub fn clear_thumbnail_listener(&self) {
        *self.listener_slot() = None;
    }

    fn listener_slot(
        &self,
    ) -> RwLockWriteGuard<'_, Option<Arc<dyn ThumbnailListener<T, D::Image>>>> {
        self.listener.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Emit an event to all subscribers
    ///
    /// send() returns Err if there are no receivers, which is fine - the
    /// event is simply dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
