//! The serial worker loop: fetch, decode, and hand off for delivery.
//!
//! One loop per downloader instance, processing requests strictly one at a
//! time. A slow fetch stalls everything queued behind it, and no timeout is
//! imposed: a hung fetch permanently stalls the queue. Cancellation is
//! cooperative: nothing interrupts an in-flight fetch; staleness is enforced
//! when the completed result is about to be delivered.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::decode::ImageDecoder;
use crate::delivery::{DeliveryJob, DeliverySink};
use crate::fetch::ByteFetcher;
use crate::request_map::RequestMap;
use crate::types::Event;

use super::ListenerSlot;

/// Instruction on the worker's ordered queue.
///
/// Download items carry no URL: the worker re-reads the request map when an
/// item is picked up, so a later overwrite automatically supersedes an
/// earlier item for the same target. `epoch` is the generation stamp taken at
/// enqueue time; `cancel_all` bumps the generation, invalidating every item
/// still in the queue.
pub(crate) enum WorkerCommand<T> {
    /// Process the currently-mapped URL for `target`
    Download {
        /// Where the result should go
        target: T,
        /// Generation stamp at enqueue time
        epoch: u64,
    },
    /// Stop the loop
    Quit,
}

/// Everything the loop needs besides the queue itself
pub(crate) struct WorkerEnv<T, D: ImageDecoder> {
    pub(crate) requests: RequestMap<T>,
    pub(crate) fetcher: Arc<dyn ByteFetcher>,
    pub(crate) decoder: Arc<D>,
    pub(crate) sink: Arc<dyn DeliverySink>,
    pub(crate) listener: ListenerSlot<T, D::Image>,
    pub(crate) event_tx: broadcast::Sender<Event>,
    pub(crate) terminated: Arc<AtomicBool>,
    pub(crate) epoch: Arc<AtomicU64>,
}

/// Owned state handed to the spawned worker task
pub(crate) struct WorkerContext<T, D: ImageDecoder> {
    pub(crate) cmd_rx: mpsc::UnboundedReceiver<WorkerCommand<T>>,
    pub(crate) cancel: CancellationToken,
    pub(crate) ready: oneshot::Sender<()>,
    pub(crate) env: WorkerEnv<T, D>,
}

/// Run the worker loop until shutdown.
pub(crate) async fn run_worker<T, D>(ctx: WorkerContext<T, D>)
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
    D: ImageDecoder,
{
    let WorkerContext {
        mut cmd_rx,
        cancel,
        ready,
        env,
    } = ctx;

    // start() is blocked on this ack.
    ready.send(()).ok();
    tracing::trace!("worker loop started");

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            cmd = cmd_rx.recv() => match cmd {
                Some(WorkerCommand::Download { target, epoch }) => {
                    handle_request(&env, target, epoch).await;
                }
                Some(WorkerCommand::Quit) | None => break,
            },
        }
    }

    tracing::trace!("worker loop stopped");
}

/// Process one dequeued work item start-to-finish.
///
/// Every early return is a designed-for silent drop: the UI keeps its
/// placeholder and the loop moves on to the next item. The loop itself must
/// survive any individual failure.
async fn handle_request<T, D>(env: &WorkerEnv<T, D>, target: T, epoch: u64)
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
    D: ImageDecoder,
{
    if env.terminated.load(Ordering::SeqCst) {
        tracing::trace!("dropping work item: terminated");
        return;
    }
    if epoch != env.epoch.load(Ordering::SeqCst) {
        tracing::trace!("dropping work item: queue cleared since enqueue");
        return;
    }

    // Resolve the URL at processing time. An absent entry means the request
    // was canceled, or superseded and already delivered, before we got here.
    let Some(url) = env.requests.get(&target) else {
        tracing::trace!("dropping work item: no URL on record for target");
        return;
    };

    let bytes = match env.fetcher.fetch(&url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "thumbnail fetch failed; request dropped");
            env.event_tx.send(Event::FetchFailed { url }).ok();
            return;
        }
    };

    // Decode off the async thread. A panicking decoder surfaces as a join
    // error and is handled like any other malformed payload.
    let decoder = Arc::clone(&env.decoder);
    let image = match tokio::task::spawn_blocking(move || decoder.decode(&bytes)).await {
        Ok(Some(image)) => image,
        Ok(None) => {
            tracing::warn!(url = %url, "thumbnail payload failed to decode; request dropped");
            env.event_tx.send(Event::DecodeFailed { url }).ok();
            return;
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "decoder panicked; request dropped");
            env.event_tx.send(Event::DecodeFailed { url }).ok();
            return;
        }
    };

    env.sink.post(delivery_job(env, target, url, image));
}

/// Build the closure that finishes the request on the delivery context.
fn delivery_job<T, D>(env: &WorkerEnv<T, D>, target: T, url: String, image: D::Image) -> DeliveryJob
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
    D: ImageDecoder,
{
    let requests = env.requests.clone();
    let listener = Arc::clone(&env.listener);
    let event_tx = env.event_tx.clone();
    let terminated = Arc::clone(&env.terminated);

    Box::new(move || {
        // Re-validate on the delivery context: targets get recycled, so a
        // completed download must never overwrite a newer pending URL.
        if terminated.load(Ordering::SeqCst) {
            tracing::trace!(url = %url, "discarding delivery: terminated");
            return;
        }
        if !requests.remove_if_current(&target, &url) {
            tracing::debug!(url = %url, "discarding delivery: superseded or canceled");
            event_tx.send(Event::Stale { url }).ok();
            return;
        }

        // Clone the listener out of the slot first so a re-entrant listener
        // can replace itself without deadlocking.
        let current = listener
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        if let Some(l) = current {
            l.on_thumbnail_downloaded(target, image);
        }
        event_tx.send(Event::Delivered { url }).ok();
    })
}
