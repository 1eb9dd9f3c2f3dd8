//! Fixed-size worker pool
//!
//! - FIFO task queue guarded by a single lock, with a condvar for blocking
//!   dequeue on empty
//! - the `stopped` flag lives under the same lock; shutdown broadcasts to
//!   every waiting worker
//! - tasks run outside the lock; a panicking task is contained and counted
//!
//! Shutdown drains the queue, then joins every worker. Once it returns, no
//! task is running and none will run again.

use crate::error::PoolError;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    tasks: VecDeque<Task>,
    stopped: bool,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
    counters: Counters,
}

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks accepted by `submit`
    pub submitted: u64,
    /// Tasks that returned normally
    pub completed: u64,
    /// Tasks that panicked
    pub panicked: u64,
}

/// Bounded set of worker threads draining a shared FIFO queue
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("pending", &self.pending())
            .field("stats", &self.stats())
            .finish()
    }
}

impl WorkerPool {
    /// Start `size` workers
    ///
    /// # Errors
    /// - `NoWorkers` when `size == 0`
    /// - `Spawn` if a thread cannot be started (already started workers are
    ///   shut down first)
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::NoWorkers);
        }
        let pool = Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue {
                    tasks: VecDeque::new(),
                    stopped: false,
                }),
                available: Condvar::new(),
                counters: Counters::default(),
            }),
            workers: Mutex::new(Vec::with_capacity(size)),
            size,
        };
        for n in 0..size {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("tensure-worker-{n}"))
                .spawn(move || worker_loop(&shared))
                .map_err(PoolError::Spawn)?;
            pool.workers.lock().push(handle);
        }
        tracing::debug!(size, "worker pool started");
        Ok(pool)
    }

    /// Number of workers
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Tasks waiting in the queue
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().tasks.len()
    }

    /// Snapshot of the counters
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let c = &self.shared.counters;
        PoolStats {
            submitted: c.submitted.load(Ordering::SeqCst),
            completed: c.completed.load(Ordering::SeqCst),
            panicked: c.panicked.load(Ordering::SeqCst),
        }
    }

    /// Enqueue a task
    ///
    /// # Errors
    /// `ShutDown` once shutdown has begun; the task is not run
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut queue = self.shared.queue.lock();
            if queue.stopped {
                return Err(PoolError::ShutDown);
            }
            queue.tasks.push_back(Box::new(task));
            self.shared.counters.submitted.fetch_add(1, Ordering::SeqCst);
        }
        self.shared.available.notify_one();
        Ok(())
    }

    /// Stop accepting tasks, drain the queue and join every worker
    ///
    /// Idempotent. Must not be called from inside a task.
    pub fn shutdown(&self) {
        {
            let mut queue = self.shared.queue.lock();
            queue.stopped = true;
        }
        self.shared.available.notify_all();

        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("worker thread terminated abnormally");
            }
        }
        tracing::debug!(stats = ?self.stats(), "worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(task) = queue.tasks.pop_front() {
                    break Some(task);
                }
                if queue.stopped {
                    break None;
                }
                shared.available.wait(&mut queue);
            }
        };
        let Some(task) = task else {
            return;
        };
        match catch_unwind(AssertUnwindSafe(task)) {
            Ok(()) => {
                shared.counters.completed.fetch_add(1, Ordering::SeqCst);
            }
            Err(_) => {
                shared.counters.panicked.fetch_add(1, Ordering::SeqCst);
                tracing::error!("task panicked; worker continues");
            }
        }
    }
}
