//! Lock-free bounded handoff between a sampling context and its processing
//! context
//!
//! Built on `crossbeam_queue::ArrayQueue`. The producer side never blocks:
//! a full ring declines the newest sample and bumps a relaxed drop counter
//! so the loss stays observable without stalling the sampler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;

/// Create a bounded ring, split into its producer and consumer halves.
pub fn sample_ring<T>(capacity: usize) -> (RingProducer<T>, RingConsumer<T>) {
    let queue = Arc::new(ArrayQueue::new(capacity));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        RingProducer {
            queue: queue.clone(),
            dropped: dropped.clone(),
        },
        RingConsumer { queue, dropped },
    )
}

/// Sampling-context half. Push-only.
pub struct RingProducer<T> {
    queue: Arc<ArrayQueue<T>>,
    dropped: Arc<AtomicU64>,
}

impl<T> RingProducer<T> {
    /// Push one value. Returns false if the ring was full and the value was
    /// dropped (and counted).
    pub fn push(&self, value: T) -> bool {
        match self.queue.push(value) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Processing-context half. Pop-only.
pub struct RingConsumer<T> {
    queue: Arc<ArrayQueue<T>>,
    dropped: Arc<AtomicU64>,
}

impl<T> RingConsumer<T> {
    pub fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Samples declined at the producer since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
