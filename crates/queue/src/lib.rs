//! Thread-safe work queue
//!
//! An unbounded MPMC FIFO used by the updater pipeline for intermediate
//! state hand-off between worker threads.
//!
//! # Design
//!
//! - **Blocking consumers**: `pop` can block until an item arrives or the
//!   queue is cancelled; `pop_bulk` waits with a bounded timeout
//! - **Cooperative cancellation**: `cancel()` wakes every blocked consumer
//!   and turns producers into no-ops
//! - **Infallible**: no operation returns an error; absence is modelled
//!   with `Option` / an empty drain
//!
//! # Example
//!
//! ```
//! use curator_queue::SafeQueue;
//!
//! let queue = SafeQueue::new();
//! queue.push(1u32);
//! assert_eq!(queue.pop(false), Some(1));
//! assert_eq!(queue.pop(false), None);
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;

struct Inner<T> {
    items: VecDeque<T>,
    cancelled: bool,
}

/// Unbounded FIFO queue safe to share between threads
///
/// Cloning is not provided; share the queue behind an `Arc`.
pub struct SafeQueue<T> {
    inner: Mutex<Inner<T>>,
    available: Condvar,
}

impl<T> SafeQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                cancelled: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append an item to the back of the queue
    ///
    /// Items pushed after `cancel()` are silently dropped.
    pub fn push(&self, item: T) {
        let mut inner = self.inner.lock();
        if inner.cancelled {
            return;
        }
        inner.items.push_back(item);
        self.available.notify_one();
    }

    /// Remove the item at the front of the queue
    ///
    /// With `block = true` the call waits until an item is available or the
    /// queue is cancelled. With `block = false` it returns immediately.
    /// A cancelled queue always yields `None`, even when items remain.
    pub fn pop(&self, block: bool) -> Option<T> {
        let mut inner = self.inner.lock();
        if block {
            while inner.items.is_empty() && !inner.cancelled {
                self.available.wait(&mut inner);
            }
        }
        if inner.cancelled {
            return None;
        }
        inner.items.pop_front()
    }

    /// Drain up to `count` items in FIFO order
    ///
    /// Waits until the queue holds at least `count` items, the queue is
    /// cancelled, or `timeout` elapses, whichever comes first, then drains
    /// whatever is available up to `count`. Never blocks on a cancelled
    /// queue.
    pub fn pop_bulk(&self, count: usize, timeout: Duration) -> Vec<T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();

        while !inner.cancelled && inner.items.len() < count {
            if self.available.wait_until(&mut inner, deadline).timed_out() {
                break;
            }
        }

        let take = count.min(inner.items.len());
        inner.items.drain(..take).collect()
    }

    /// Cancel the queue, waking every blocked consumer
    ///
    /// Subsequent pushes are dropped and blocked pops return empty.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock();
        inner.cancelled = true;
        self.available.notify_all();
    }

    /// Whether the queue has been cancelled
    pub fn cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    /// Number of items currently queued
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether the queue is currently empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }
}

impl<T> Default for SafeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
