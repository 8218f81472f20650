//! Delivery sink: the execution context that runs completion callbacks.
//!
//! The worker never invokes the listener itself. Each completed download is
//! packaged into a deferred closure and posted here; the sink's own serial
//! context runs the closure later, in submission order. That hop is what lets
//! the staleness re-check and the listener call happen on the owner's side of
//! the thread boundary.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A deferred, zero-argument delivery action.
pub type DeliveryJob = Box<dyn FnOnce() + Send + 'static>;

/// An execution context that accepts deferred actions and runs them later,
/// in submission order, on its own thread or task.
pub trait DeliverySink: Send + Sync + 'static {
    /// Queue `job` for execution. Must not block and must not run `job`
    /// inline.
    fn post(&self, job: DeliveryJob);
}

/// Channel-backed [`DeliverySink`].
///
/// [`ChannelSink::new`] hands back the receiving end so the owner can drain
/// jobs on its own loop (a UI-thread dispatcher, a test harness, ...).
/// [`ChannelSink::spawn`] instead drains on a dedicated tokio task, the right
/// default when any serial context will do.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DeliveryJob>,
}

impl ChannelSink {
    /// Create a sink plus the receiver that the owner's loop must drain.
    ///
    /// Jobs execute in submission order as long as the receiver is drained
    /// from a single context.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeliveryJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Create a sink whose jobs run on a dedicated serial task.
    ///
    /// The task ends once every clone of the sink has been dropped and the
    /// queue has drained.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (sink, mut rx) = Self::new();
        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job();
            }
            tracing::trace!("delivery loop drained and closed");
        });
        (sink, handle)
    }
}

impl DeliverySink for ChannelSink {
    fn post(&self, job: DeliveryJob) {
        // A closed receiver means the owner tore down its loop; the delivery
        // is dropped exactly like a stale result.
        self.tx.send(job).ok();
    }
}
