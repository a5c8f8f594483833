//! Fixed-size worker pool over a shared, closable task queue.
//!
//! The queue is unbounded: the producer pushes every task up front, then
//! closes it. Workers pop until the queue is closed and drained, then exit;
//! [`WorkerPool::run`] joins all of them before returning, so the pool's
//! lifetime is bounded by the call.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Default number of concurrent workers.
pub const DEFAULT_WORKERS: usize = 4;

/// One monitor to archive, with its position in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub monitor_id: u64,
    /// 1-based position in enqueue order.
    pub index: usize,
    pub total: usize,
}

impl Task {
    /// Build one task per id, numbered in the given order.
    pub fn for_ids(ids: &[u64]) -> Vec<Task> {
        let total = ids.len();
        ids.iter()
            .enumerate()
            .map(|(i, id)| Task {
                monitor_id: *id,
                index: i + 1,
                total,
            })
            .collect()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.index, self.total)
    }
}

/// Unbounded multi-consumer queue.
#[derive(Debug)]
pub struct TaskQueue<T> {
    sender: Mutex<Option<mpsc::UnboundedSender<T>>>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<T>>,
    pushed: AtomicUsize,
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: tokio::sync::Mutex::new(rx),
            pushed: AtomicUsize::new(0),
        }
    }

    /// Enqueue `item`. Returns `false` if the queue has been closed.
    pub fn push(&self, item: T) -> bool {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(tx) if tx.send(item).is_ok() => {
                self.pushed.fetch_add(1, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    /// Stop accepting items. Items already queued are still handed out.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    /// Total number of items ever enqueued.
    pub fn pushed(&self) -> usize {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Wait for the next item. Returns `None` once the queue is closed and
    /// empty.
    pub async fn pop(&self) -> Option<T> {
        self.receiver.lock().await.recv().await
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for TaskQueue<T> {
    /// Build a queue holding `iter`'s items, already closed.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let queue = Self::new();
        for item in iter {
            queue.push(item);
        }
        queue.close();
        queue
    }
}

/// What the pool did with the queue.
#[derive(Debug)]
pub struct PoolReport<O> {
    /// Handler results, in completion order.
    pub outcomes: Vec<O>,
    /// Tasks whose handler panicked.
    pub panicked: usize,
}

impl<O> PoolReport<O> {
    /// Number of tasks taken off the queue.
    pub fn processed(&self) -> usize {
        self.outcomes.len() + self.panicked
    }
}

/// A fixed number of workers draining one queue.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    /// Create a pool of `size` workers (at least one).
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `handler` for every item of `queue` until it is closed and
    /// drained, then join the workers.
    ///
    /// A panicking handler is logged and counted; the worker carries on with
    /// the next item.
    pub async fn run<T, O, F, Fut>(&self, queue: Arc<TaskQueue<T>>, handler: F) -> PoolReport<O>
    where
        T: Send + 'static,
        O: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let mut workers = JoinSet::new();

        for worker in 0..self.size {
            let queue = queue.clone();
            let handler = handler.clone();

            workers.spawn(async move {
                let mut outcomes = Vec::new();
                let mut panicked = 0;

                while let Some(item) = queue.pop().await {
                    match tokio::spawn((*handler)(item)).await {
                        Ok(outcome) => outcomes.push(outcome),
                        Err(e) => {
                            error!(worker, error = %e, "Task panicked");
                            panicked += 1;
                        }
                    }
                }

                debug!(worker, processed = outcomes.len() + panicked, "Worker finished");
                (outcomes, panicked)
            });
        }

        let mut report = PoolReport {
            outcomes: Vec::new(),
            panicked: 0,
        };
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((outcomes, panicked)) => {
                    report.outcomes.extend(outcomes);
                    report.panicked += panicked;
                }
                Err(e) => error!(error = %e, "Worker exited abnormally"),
            }
        }

        report
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[test]
    fn test_tasks_for_ids() {
        let tasks = Task::for_ids(&[5, 9, 2]);
        assert_eq!(tasks.len(), 3);
        assert_eq!(
            tasks[1],
            Task {
                monitor_id: 9,
                index: 2,
                total: 3
            }
        );
        assert_eq!(tasks[2].to_string(), "[3/3]");
    }

    #[tokio::test]
    async fn test_queue_close_drains() {
        let queue = TaskQueue::new();
        assert!(queue.push(1));
        assert!(queue.push(2));
        queue.close();
        assert!(!queue.push(3));

        assert_eq!(queue.pop().await, Some(1));
        assert_eq!(queue.pop().await, Some(2));
        assert_eq!(queue.pop().await, None);
        assert_eq!(queue.pushed(), 2);
    }

    async fn run_with_size(size: usize, n: u64) {
        let queue: Arc<TaskQueue<u64>> = Arc::new((0..n).collect());
        let seen = Arc::new(Mutex::new(BTreeMap::<u64, usize>::new()));

        let seen_in_handler = seen.clone();
        let report = WorkerPool::new(size)
            .run(queue, move |item| {
                let seen = seen_in_handler.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(item % 3)).await;
                    *seen.lock().entry(item).or_default() += 1;
                    item
                }
            })
            .await;

        assert_eq!(report.processed(), n as usize);
        assert_eq!(report.panicked, 0);
        let seen = seen.lock();
        assert_eq!(seen.len(), n as usize);
        assert!(seen.values().all(|count| *count == 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_task_processed_once() {
        for size in [1, 4, 16] {
            run_with_size(size, 50).await;
        }
    }

    #[tokio::test]
    async fn test_fewer_tasks_than_workers() {
        run_with_size(16, 3).await;
        run_with_size(4, 0).await;
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let queue: Arc<TaskQueue<u32>> = Arc::new((0..10).collect());

        let report = WorkerPool::new(2)
            .run(queue, |item| async move {
                if item == 4 {
                    panic!("boom");
                }
                item
            })
            .await;

        assert_eq!(report.panicked, 1);
        assert_eq!(report.outcomes.len(), 9);
        assert!(!report.outcomes.contains(&4));
    }

    #[test]
    fn test_pool_size_minimum() {
        assert_eq!(WorkerPool::new(0).size(), 1);
        assert_eq!(WorkerPool::default().size(), DEFAULT_WORKERS);
    }
}
