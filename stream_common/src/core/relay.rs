//! # Relay Queue
//!
//! The bounded hand-off between an event source and the publisher.
//!
//! ## Semantics:
//! - **FIFO**: one producer, one consumer, events come out in the order they
//!   went in.
//! - **Backpressure**: `send` suspends while the queue is full. Nothing is
//!   dropped; a slow broker throttles the source instead.
//! - **Ownership**: an event moves into the queue on `send` and out of it on
//!   `recv`.
//!
//! Built on `tokio::sync::mpsc`, so no extra locking is needed around it.

use tokio::sync::mpsc;

use crate::core::event::Event;
use crate::error::PipelineError;

/// Producer half of the relay queue.
#[derive(Debug)]
pub struct RelaySender {
    inner: mpsc::Sender<Event>,
}

/// Consumer half of the relay queue.
#[derive(Debug)]
pub struct RelayReceiver {
    inner: mpsc::Receiver<Event>,
}

/// Creates a relay queue holding at most `capacity` events.
///
/// A capacity of zero is raised to one; the queue always has a slot.
pub fn relay_queue(capacity: usize) -> (RelaySender, RelayReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (RelaySender { inner: tx }, RelayReceiver { inner: rx })
}

impl RelaySender {
    /// Enqueues an event, waiting for a free slot if the queue is full.
    pub async fn send(&self, event: Event) -> Result<(), PipelineError> {
        self.inner
            .send(event)
            .await
            .map_err(|_| PipelineError::QueueClosed)
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.inner.capacity()
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.inner.max_capacity()
    }
}

impl RelayReceiver {
    /// Takes the next event, waiting while the queue is empty.
    ///
    /// Returns `None` once the producer is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.inner.recv().await
    }

    /// Events waiting in the queue.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// `true` when no event is waiting.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
