//! Fixed-capacity directional FIFO with evict-oldest overflow.
//!
//! The bridge favors freshness over completeness under load: for live
//! traffic the newest data matters more than a backlog, so a full queue
//! drops its oldest entry to admit the newest rather than rejecting the
//! newest or growing without bound.
//!
//! Producers push without blocking; the single drain task awaits [`recv`]
//! indefinitely. Safe for concurrent single-producer/single-consumer use
//! (and any number of producers, in fact) without an external lock.
//!
//! [`recv`]: DirectionalQueue::recv

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

use super::message::RelayMessage;

/// Queue depth per direction.
pub const QUEUE_DEPTH: usize = 3;

/// A bounded FIFO of [`RelayMessage`]s for one relay direction.
pub struct DirectionalQueue {
    inner: Mutex<VecDeque<RelayMessage>>,
    /// Wakes the drain task when a message arrives.
    available: Notify,
}

impl DirectionalQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(QUEUE_DEPTH)),
            available: Notify::new(),
        }
    }

    /// Enqueue without blocking. When the queue is full, the oldest entry is
    /// removed to make room and returned so the caller can log the drop.
    ///
    /// The evict-then-insert sequence happens under one lock, so the freed
    /// slot cannot be stolen; size never exceeds [`QUEUE_DEPTH`].
    pub fn push(&self, msg: RelayMessage) -> Option<RelayMessage> {
        let evicted = {
            let mut q = self.inner.lock().expect("queue lock poisoned");

            let evicted = if q.len() == QUEUE_DEPTH {
                q.pop_front()
            } else {
                None
            };

            // A full queue with one element removed accepts exactly one
            // more; anything else is a logic defect, not a caller error.
            assert!(q.len() < QUEUE_DEPTH, "no free slot after eviction");
            q.push_back(msg);
            evicted
        };

        self.available.notify_one();
        evicted
    }

    /// Dequeue the oldest surviving message, waiting as long as it takes.
    pub async fn recv(&self) -> RelayMessage {
        loop {
            if let Some(msg) = self.try_recv() {
                return msg;
            }
            self.available.notified().await;
        }
    }

    /// Dequeue without waiting.
    pub fn try_recv(&self) -> Option<RelayMessage> {
        self.inner.lock().expect("queue lock poisoned").pop_front()
    }

    /// Current number of queued messages.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("queue lock poisoned").len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DirectionalQueue {
    fn default() -> Self {
        Self::new()
    }
}
