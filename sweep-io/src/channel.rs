//! Reader-to-consumer sample hand-off.

use crate::types::Sample;
use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// FIFO queue of decoded samples shared between the reader thread and the
/// mapping consumer.
///
/// Pushing never blocks (the queue is unbounded); draining never blocks
/// either. Clones share the same underlying queue.
#[derive(Clone)]
pub struct SampleChannel {
    tx: Sender<Sample>,
    rx: Receiver<Sample>,
}

impl SampleChannel {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Enqueue one sample.
    pub fn push(&self, sample: Sample) {
        // Both ends live in self, so the channel can never be disconnected
        let _ = self.tx.send(sample);
    }

    /// Enqueue a batch, preserving order.
    pub fn push_all(&self, samples: impl IntoIterator<Item = Sample>) {
        for sample in samples {
            self.push(sample);
        }
    }

    /// Remove and return up to `limit` samples in arrival order.
    ///
    /// Returns immediately with an empty vector when nothing is queued.
    pub fn drain_up_to(&self, limit: usize) -> Vec<Sample> {
        let mut batch = Vec::with_capacity(limit.min(self.rx.len()));
        while batch.len() < limit {
            match self.rx.try_recv() {
                Ok(sample) => batch.push(sample),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        batch
    }

    /// Number of queued samples.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for SampleChannel {
    fn default() -> Self {
        Self::new()
    }
}
