//! Bounded work queue and worker pool
//!
//! A [`WorkQueue`] is a bounded `mpsc` channel whose receiver is shared by
//! every worker, plus a pending-work counter kept in a `watch` channel.
//!
//! ## Join counting
//!
//! The counter is incremented by [`WorkQueue::push`] *before* the item is
//! handed to the channel and decremented when a worker finishes the item
//! (after the handler returned, so anything the handler pushed is already
//! counted). [`WorkQueue::wait_idle`] therefore cannot observe zero while
//! an item is queued or in flight.
//!
//! ```text
//! push ──(pending += 1)──→ mpsc ──→ worker ──→ handler ──(pending -= 1)
//!                                      ↑            │
//!                                      └── push ────┘  (fan-out)
//! ```
//!
//! Shutdown is a [`CancellationToken`]; workers stop at their next receive.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

// ============================================================================
// WorkQueue
// ============================================================================

/// Multi-producer, multi-consumer queue with enqueue-time join counting
pub struct WorkQueue<T> {
    tx: mpsc::Sender<T>,
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
    pending: Arc<watch::Sender<usize>>,
    cancel: CancellationToken,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: Arc::clone(&self.rx),
            pending: Arc::clone(&self.pending),
            cancel: self.cancel.clone(),
        }
    }
}

/// The queue was shut down before the item could be enqueued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueClosed;

impl std::fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("work queue closed")
    }
}

impl std::error::Error for QueueClosed {}

impl<T> WorkQueue<T> {
    /// Creates a queue holding at most `capacity` waiting items (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (pending, _) = watch::channel(0usize);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            pending: Arc::new(pending),
            cancel: CancellationToken::new(),
        }
    }

    /// Enqueues an item, waiting for space if the queue is full
    ///
    /// # Errors
    /// Returns [`QueueClosed`] if the queue was shut down
    pub async fn push(&self, item: T) -> Result<(), QueueClosed> {
        if self.cancel.is_cancelled() {
            return Err(QueueClosed);
        }
        self.pending.send_modify(|n| *n += 1);
        if self.tx.send(item).await.is_err() {
            self.task_done();
            return Err(QueueClosed);
        }
        Ok(())
    }

    /// Receives the next item, or `None` once the queue is shut down
    pub async fn next(&self) -> Option<T> {
        let mut rx = self.rx.lock().await;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            item = rx.recv() => item,
        }
    }

    /// Marks one previously pushed item as finished
    pub fn task_done(&self) {
        self.pending.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Items pushed but not yet finished
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Waits until every pushed item has been finished
    pub async fn wait_idle(&self) {
        let mut rx = self.pending.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Stops all workers at their next receive
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Decrements the pending counter when dropped, even if the handler panics
struct DoneGuard<'a, T>(&'a WorkQueue<T>);

impl<T> Drop for DoneGuard<'_, T> {
    fn drop(&mut self) {
        self.0.task_done();
    }
}

// ============================================================================
// WorkerPool
// ============================================================================

/// A fixed set of tasks draining one [`WorkQueue`]
pub struct WorkerPool<T> {
    queue: WorkQueue<T>,
    tasks: JoinSet<()>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawns `workers` tasks (minimum 1) that run `handler` on each item
    ///
    /// The handler may push more items onto `queue`; they are counted before
    /// the current item is marked finished.
    pub fn spawn<F, Fut>(name: &'static str, queue: &WorkQueue<T>, workers: usize, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let mut tasks = JoinSet::new();
        for worker in 0..workers.max(1) {
            let queue = queue.clone();
            let handler = Arc::clone(&handler);
            tasks.spawn(async move {
                while let Some(item) = queue.next().await {
                    let _done = DoneGuard(&queue);
                    handler(item).await;
                }
                debug!(pool = name, worker, "worker stopped");
            });
        }
        debug!(pool = name, workers = workers.max(1), "worker pool started");
        Self {
            queue: queue.clone(),
            tasks,
        }
    }

    /// Waits for the queue to drain, then stops and joins every worker
    pub async fn join(mut self) {
        self.queue.wait_idle().await;
        self.queue.shutdown();
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "worker task failed");
            }
        }
    }
}
