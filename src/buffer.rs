use crossbeam::queue::ArrayQueue;
use crossbeam::utils::Backoff;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep between retries once spinning has given up
const MAX_PARK: Duration = Duration::from_micros(200);

/// Outcome of a timed push that did not succeed
#[derive(Debug, PartialEq, Eq)]
pub enum PushError<T> {
    /// The queue stayed full for the whole wait
    Timeout(T),
    /// The cancel flag was raised while waiting
    Cancelled(T),
}

impl<T> PushError<T> {
    /// Recover the item that could not be enqueued
    pub fn into_inner(self) -> T {
        match self {
            PushError::Timeout(item) | PushError::Cancelled(item) => item,
        }
    }
}

/// A bounded FIFO queue built on crossbeam's lock-free ArrayQueue.
///
/// Never drops on overflow: a full queue hands the item back to the caller.
/// Clones share the same underlying queue.
#[derive(Debug)]
pub struct BoundedQueue<T: Send> {
    queue: Arc<ArrayQueue<T>>,
}

impl<T: Send> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<T: Send> BoundedQueue<T> {
    /// Create a new queue. `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity)),
        }
    }

    /// Push without waiting; returns the item if the queue is full
    pub fn try_push(&self, item: T) -> Result<(), T> {
        self.queue.push(item)
    }

    /// Push, waiting up to `timeout` for space.
    ///
    /// When a `cancel` flag is given, the wait ends early with `Cancelled`
    /// as soon as it is raised.
    pub fn push_timeout(
        &self,
        item: T,
        timeout: Duration,
        cancel: Option<&AtomicBool>,
    ) -> Result<(), PushError<T>> {
        let mut item = match self.queue.push(item) {
            Ok(()) => return Ok(()),
            Err(item) => item,
        };

        let deadline = Instant::now() + timeout;
        let backoff = Backoff::new();

        loop {
            if cancel.is_some_and(|flag| flag.load(Ordering::Acquire)) {
                return Err(PushError::Cancelled(item));
            }
            if Instant::now() >= deadline {
                return Err(PushError::Timeout(item));
            }
            pause(&backoff, deadline);

            item = match self.queue.push(item) {
                Ok(()) => return Ok(()),
                Err(item) => item,
            };
        }
    }

    /// Pop without waiting
    pub fn try_pop(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Pop, waiting up to `timeout` for an item
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        if let Some(item) = self.queue.pop() {
            return Some(item);
        }

        let deadline = Instant::now() + timeout;
        let backoff = Backoff::new();

        while Instant::now() < deadline {
            pause(&backoff, deadline);
            if let Some(item) = self.queue.pop() {
                return Some(item);
            }
        }
        None
    }

    /// Get the current number of queued items
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Check if the queue is at capacity
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    /// Get the capacity of the queue
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Get the utilization of the queue as a percentage (0-100)
    pub fn utilization(&self) -> u32 {
        ((self.len() * 100) / self.capacity()).min(100) as u32
    }
}

/// Spin briefly, then fall back to short sleeps bounded by the deadline
fn pause(backoff: &Backoff, deadline: Instant) {
    if !backoff.is_completed() {
        backoff.snooze();
        return;
    }
    let remaining = deadline.saturating_duration_since(Instant::now());
    thread::sleep(remaining.min(MAX_PARK));
}
