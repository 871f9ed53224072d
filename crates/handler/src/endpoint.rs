//! Endpoint - one collector's feed into a handler

use async_channel::{bounded, Receiver, Sender};
use contracts::{Metric, Sample};

/// Bounded channel of samples plus the batch limit its listener flushes at.
///
/// Cloning shares the same channel. A full channel blocks the producing
/// collector.
#[derive(Debug, Clone)]
pub struct Endpoint {
    tx: Sender<Sample>,
    rx: Receiver<Sample>,
    batch_size: usize,
}

impl Endpoint {
    /// Create an endpoint; `capacity` is clamped to at least 1
    pub fn new(capacity: usize, batch_size: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self { tx, rx, batch_size }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Same channel, different flush limit
    pub fn with_batch_size(&self, batch_size: usize) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            batch_size,
        }
    }

    /// Sender handed to collectors
    pub fn sender(&self) -> Sender<Sample> {
        self.tx.clone()
    }

    pub(crate) fn receiver(&self) -> Receiver<Sample> {
        self.rx.clone()
    }

    /// Number of samples waiting in the channel
    pub fn queue_len(&self) -> usize {
        self.rx.len()
    }

    /// Send a metric, waiting while the channel is full
    pub async fn send(&self, metric: Metric) -> bool {
        self.tx.send(Sample::Data(metric)).await.is_ok()
    }

    /// Ask the listener to flush its pending batch
    pub async fn flush(&self) -> bool {
        self.tx.send(Sample::Flush).await.is_ok()
    }

    /// Stop the listener; its pending batch is discarded
    pub async fn close(&self) -> bool {
        self.tx.send(Sample::Close).await.is_ok()
    }
}
