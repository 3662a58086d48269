// src/matching/queue.rs - Bounded task queue with a join barrier and stop sentinels
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, Mutex, Notify};

/// What a worker receives from the queue.
#[derive(Debug)]
pub enum WorkItem<T> {
    Task(T),
    /// Sentinel: the receiving worker exits its loop.
    Stop,
}

struct QueueInner<T> {
    sender: mpsc::Sender<WorkItem<T>>,
    receiver: Mutex<mpsc::Receiver<WorkItem<T>>>,
    /// Tasks enqueued and not yet marked done.
    unfinished: AtomicUsize,
    all_done: Notify,
}

/// Multi-consumer bounded queue.
///
/// `put` waits while the queue is full, `get` waits while it is empty and
/// `join` waits until every task that was `put` has been marked with
/// `task_done`. Stop sentinels are not counted as tasks.
pub struct WorkQueue<T> {
    inner: Arc<QueueInner<T>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send> WorkQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            inner: Arc::new(QueueInner {
                sender,
                receiver: Mutex::new(receiver),
                unfinished: AtomicUsize::new(0),
                all_done: Notify::new(),
            }),
        }
    }

    /// Enqueues one task, waiting for space when the queue is full.
    pub async fn put(&self, task: T) -> Result<()> {
        // Count the task only once a slot is reserved, so a cancelled put
        // leaves the barrier untouched.
        let permit = self
            .inner
            .sender
            .reserve()
            .await
            .map_err(|_| anyhow!("Work queue receiver dropped"))?;
        self.inner.unfinished.fetch_add(1, Ordering::AcqRel);
        permit.send(WorkItem::Task(task));
        Ok(())
    }

    /// Enqueues one stop sentinel per worker.
    pub async fn stop_workers(&self, worker_count: usize) -> Result<()> {
        for _ in 0..worker_count {
            self.inner
                .sender
                .send(WorkItem::Stop)
                .await
                .map_err(|_| anyhow!("Work queue receiver dropped"))?;
        }
        Ok(())
    }

    /// Takes the next item, waiting while the queue is empty.
    pub async fn get(&self) -> Option<WorkItem<T>> {
        let mut receiver = self.inner.receiver.lock().await;
        receiver.recv().await
    }

    /// Marks one previously dequeued task as finished, whether it succeeded or not.
    pub fn task_done(&self) {
        self.finish_one();
    }

    /// Number of tasks enqueued and not yet marked done.
    pub fn unfinished(&self) -> usize {
        self.inner.unfinished.load(Ordering::Acquire)
    }

    /// Waits until every enqueued task has been marked done.
    pub async fn join(&self) {
        loop {
            let notified = self.inner.all_done.notified();
            tokio::pin!(notified);
            // Register before checking so a wake-up between the check and the
            // await is not lost.
            notified.as_mut().enable();
            if self.unfinished() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn finish_one(&self) {
        let previous = self.inner.unfinished.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "task_done called more times than put");
        if previous == 1 {
            self.inner.all_done.notify_waiters();
        }
    }
}
