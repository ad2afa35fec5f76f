// Cross-thread dispatch queue
//
// Background tasks never mutate manager state directly; they enqueue
// closures here and the owning context drains them from its own tick.
// This is the serialization point that keeps the rest of the core
// single-writer.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Mutex;

type Job<T> = Box<dyn FnOnce(&mut T) + Send + 'static>;

struct QueuedJob<T> {
    key: Option<String>,
    job: Job<T>,
}

/// FIFO work queue bridging background threads and a single consumer
/// context.
///
/// Any thread may enqueue; exactly one context is expected to call
/// [`drain`](Self::drain). Items queued while a drain is running execute on
/// the next drain, never recursively, and items never run concurrently with
/// each other.
pub struct Dispatcher<T> {
    queue: Mutex<VecDeque<QueuedJob<T>>>,
}

impl<T> Dispatcher<T> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Schedule `job` to run on the consumer context.
    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.queue.lock().unwrap().push_back(QueuedJob {
            key: None,
            job: Box::new(job),
        });
    }

    /// Schedule `job` unless an item with the same key is already pending.
    ///
    /// Returns false when a pending item coalesced the request. Once the
    /// keyed item has been drained the key may be queued again.
    pub fn enqueue_keyed<F>(&self, key: &str, job: F) -> bool
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        let mut queue = self.queue.lock().unwrap();
        if queue.iter().any(|item| item.key.as_deref() == Some(key)) {
            return false;
        }
        queue.push_back(QueuedJob {
            key: Some(key.to_string()),
            job: Box::new(job),
        });
        true
    }

    /// Number of items waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Discard all pending items without running them.
    pub fn clear(&self) {
        self.queue.lock().unwrap().clear();
    }

    /// Run every item that was queued before this call, in FIFO order
    /// across all producer threads.
    ///
    /// The whole batch is removed from the queue up front, so work enqueued
    /// by a running item lands on the next drain. A panicking item is caught
    /// and logged; the remaining items still run.
    pub fn drain(&self, target: &mut T) -> usize {
        let batch: Vec<QueuedJob<T>> = {
            let mut queue = self.queue.lock().unwrap();
            queue.drain(..).collect()
        };

        let count = batch.len();
        for item in batch {
            let job = item.job;
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| job(target))) {
                tracing::error!("dispatched work item panicked: {}", panic_message(&panic));
            }
        }
        count
    }
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
