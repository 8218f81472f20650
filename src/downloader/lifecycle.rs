//! Startup and shutdown coordination.

use std::hash::Hash;
use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};

use tokio::sync::oneshot;

use crate::decode::ImageDecoder;
use crate::error::{Error, Result};
use crate::types::{Event, Lifecycle};

use super::ThumbnailDownloader;
use super::worker::{self, WorkerCommand, WorkerContext, WorkerEnv};

impl<T, D> ThumbnailDownloader<T, D>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
    D: ImageDecoder,
{
    /// Start the worker loop.
    ///
    /// Returns only after the loop is ready to accept work, which eliminates
    /// the startup race where an early enqueue could outrun the consumer.
    /// Calling it again while running is a logged no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminated`] if [`quit`](Self::quit) has already been
    /// called; the worker cannot be restarted.
    pub async fn start(&self) -> Result<()> {
        if self.worker.terminated.load(Ordering::SeqCst) {
            return Err(Error::Terminated);
        }
        if self.worker.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("start() called twice; worker already running");
            return Ok(());
        }

        let cmd_rx = self
            .worker
            .cmd_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(cmd_rx) = cmd_rx else {
            // Unreachable in practice: the receiver is taken exactly once,
            // guarded by `started`.
            tracing::warn!("worker receiver already taken; start() is a no-op");
            return Ok(());
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        let ctx = WorkerContext {
            cmd_rx,
            cancel: self.worker.cancel.clone(),
            ready: ready_tx,
            env: WorkerEnv {
                requests: self.requests.clone(),
                fetcher: Arc::clone(&self.fetcher),
                decoder: Arc::clone(&self.decoder),
                sink: Arc::clone(&self.sink),
                listener: Arc::clone(&self.listener),
                event_tx: self.event_tx.clone(),
                terminated: Arc::clone(&self.worker.terminated),
                epoch: Arc::clone(&self.worker.epoch),
            },
        };
        tokio::spawn(worker::run_worker(ctx));

        // Block until the loop signals readiness.
        ready_rx.await.ok();
        tracing::debug!("worker loop ready");
        Ok(())
    }

    /// Shut the downloader down.
    ///
    /// Sets the terminated flag, clears the request map, and stops the worker
    /// loop. Once this returns, no delivery reaches the listener, including
    /// deliveries of fetches that were already in flight. Idempotent; there
    /// is no way back to a running state.
    pub fn quit(&self) {
        if self.worker.terminated.swap(true, Ordering::SeqCst) {
            tracing::debug!("quit() called twice; already terminated");
            return;
        }
        self.requests.clear();
        self.worker.cancel.cancel();
        // Wake the loop in case it is idle on an empty queue.
        self.worker.cmd_tx.send(WorkerCommand::Quit).ok();
        self.emit_event(Event::Shutdown);
        tracing::info!("thumbnail downloader terminated");
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        if self.worker.terminated.load(Ordering::SeqCst) {
            Lifecycle::Terminated
        } else if self.worker.started.load(Ordering::SeqCst) {
            Lifecycle::Running
        } else {
            Lifecycle::Created
        }
    }

    /// Whether [`quit`](Self::quit) has taken effect.
    pub fn is_terminated(&self) -> bool {
        self.worker.terminated.load(Ordering::SeqCst)
    }
}
