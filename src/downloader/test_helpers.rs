//! Shared test helpers for exercising the downloader without a network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Semaphore, broadcast, mpsc};

use crate::config::Config;
use crate::decode::ImageDecoder;
use crate::delivery::ChannelSink;
use crate::error::{Error, Result};
use crate::fetch::ByteFetcher;
use crate::types::Event;

use super::ThumbnailDownloader;

/// Scripted response for one URL.
pub(crate) enum Script {
    /// Return these bytes immediately
    Bytes(Vec<u8>),
    /// Fail the fetch
    Fail,
    /// Hold the fetch until the gate receives a permit, then return the bytes
    Gated(Arc<Semaphore>, Vec<u8>),
}

/// In-memory [`ByteFetcher`] driven by a per-URL script.
///
/// Every fetch announces itself on the `started` channel before resolving,
/// which lets tests sequence enqueues against in-flight downloads without
/// sleeping. Unscripted URLs fail.
pub(crate) struct FakeFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    started_tx: mpsc::UnboundedSender<String>,
    log: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (started_tx, started_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                scripts: Mutex::new(HashMap::new()),
                started_tx,
                log: Mutex::new(Vec::new()),
            }),
            started_rx,
        )
    }

    pub(crate) fn script(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
    }

    /// Gate `url`: the fetch blocks until the returned semaphore is given a
    /// permit.
    pub(crate) fn gate(&self, url: &str, bytes: &[u8]) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.script(url, Script::Gated(gate.clone(), bytes.to_vec()));
        gate
    }

    /// Every URL the worker has attempted to fetch, in order.
    pub(crate) fn fetched_urls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ByteFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.log.lock().unwrap().push(url.to_string());
        self.started_tx.send(url.to_string()).ok();

        // Clone the plan out of the lock; gated fetches await afterwards.
        enum Plan {
            Bytes(Vec<u8>),
            Fail,
            Gated(Arc<Semaphore>, Vec<u8>),
        }
        let plan = match self.scripts.lock().unwrap().get(url) {
            Some(Script::Bytes(bytes)) => Plan::Bytes(bytes.clone()),
            Some(Script::Fail) | None => Plan::Fail,
            Some(Script::Gated(gate, bytes)) => Plan::Gated(gate.clone(), bytes.clone()),
        };

        match plan {
            Plan::Bytes(bytes) => Ok(bytes),
            Plan::Fail => Err(Error::InvalidUrl {
                url: url.to_string(),
                reason: "scripted failure".into(),
            }),
            Plan::Gated(gate, bytes) => {
                let permit = gate.acquire().await.map_err(|_| Error::Terminated)?;
                permit.forget();
                Ok(bytes)
            }
        }
    }
}

/// Test image: the fetched bytes, tagged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TestImage(pub(crate) Vec<u8>);

/// Decoder that rejects the literal payload `b"malformed"` and wraps
/// everything else.
pub(crate) struct TestDecoder;

impl ImageDecoder for TestDecoder {
    type Image = TestImage;

    fn decode(&self, bytes: &[u8]) -> Option<TestImage> {
        if bytes == b"malformed" {
            None
        } else {
            Some(TestImage(bytes.to_vec()))
        }
    }
}

/// Records every delivery the listener closure receives.
pub(crate) struct CollectingListener<T> {
    received: Mutex<Vec<(T, TestImage)>>,
}

impl<T> CollectingListener<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            received: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn record(&self, target: T, image: TestImage) {
        self.received.lock().unwrap().push((target, image));
    }

    pub(crate) fn snapshot(&self) -> Vec<(T, TestImage)>
    where
        T: Clone,
    {
        self.received.lock().unwrap().clone()
    }
}

/// A downloader wired to a [`FakeFetcher`] and an auto-draining sink.
pub(crate) struct TestRig {
    pub(crate) downloader: ThumbnailDownloader<u32, TestDecoder>,
    pub(crate) fetcher: Arc<FakeFetcher>,
    pub(crate) fetch_started: mpsc::UnboundedReceiver<String>,
    pub(crate) listener: Arc<CollectingListener<u32>>,
}

/// Build a rig without starting the worker.
pub(crate) fn build_test_downloader() -> TestRig {
    let (fetcher, fetch_started) = FakeFetcher::new();
    let (sink, _delivery) = ChannelSink::spawn();
    let fetcher_dyn: Arc<dyn ByteFetcher> = fetcher.clone();
    let downloader = ThumbnailDownloader::with_fetcher(
        Config::default(),
        fetcher_dyn,
        TestDecoder,
        Arc::new(sink),
    );
    let listener = CollectingListener::new();
    {
        let listener = listener.clone();
        downloader.set_thumbnail_listener(move |target: u32, image: TestImage| {
            listener.record(target, image);
        });
    }
    TestRig {
        downloader,
        fetcher,
        fetch_started,
        listener,
    }
}

/// Build a rig and start its worker.
pub(crate) async fn start_test_downloader() -> TestRig {
    let rig = build_test_downloader();
    rig.downloader.start().await.unwrap();
    rig
}

/// Wait (bounded) for the first event matching `pred`, skipping others.
pub(crate) async fn wait_for_event(
    rx: &mut broadcast::Receiver<Event>,
    pred: impl Fn(&Event) -> bool,
) -> Event {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    panic!("event channel closed while waiting")
                }
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
