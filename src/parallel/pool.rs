//! Fixed-size Rayon worker pool for fitness evaluation and batched battles.
//!
//! Use [WorkerPool::submit] and [WorkerPool::drain] for fire-and-collect work
//! driven from a controlling thread, or [WorkerPool::install] to run parallel
//! iterators on this pool's threads.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::error;

#[derive(Debug, Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn finish(&self) {
        let mut count = self.count.lock();
        *count -= 1;
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// Marks a submitted task finished when dropped, including on unwind.
struct TaskGuard(Arc<Pending>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

#[derive(Debug)]
pub struct WorkerPool {
    pool: ThreadPool,
    pending: Arc<Pending>,
}

impl WorkerPool {
    /// Build a pool of exactly `workers` threads. 0 means one per CPU core.
    pub fn new(workers: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("fleetforge-worker-{index}"))
            .panic_handler(|_| error!("worker task panicked"))
            .build()?;
        Ok(Self {
            pool,
            pending: Arc::default(),
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue `task`; it receives the index of the worker running it, in
    /// `[0, workers())`.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce(usize) + Send + 'static,
    {
        *self.pending.count.lock() += 1;
        let guard = TaskGuard(Arc::clone(&self.pending));
        self.pool.spawn(move || {
            let _guard = guard;
            let worker = rayon::current_thread_index().unwrap_or(0);
            task(worker);
        });
    }

    /// Block until every task submitted so far has completed.
    pub fn drain(&self) {
        let mut count = self.pending.count.lock();
        while *count > 0 {
            self.pending.idle.wait(&mut count);
        }
    }

    /// Run a closure with this pool as the current Rayon pool.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(f)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn drain_waits_for_every_task() {
        let pool = WorkerPool::new(4).expect("pool");
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..200 {
            let done = Arc::clone(&done);
            pool.submit(move |_| {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.drain();
        assert_eq!(done.load(Ordering::SeqCst), 200);
    }

    #[test]
    fn worker_index_is_in_range() {
        let pool = WorkerPool::new(3).expect("pool");
        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..50 {
            let seen = Arc::clone(&seen);
            pool.submit(move |worker| seen.lock().push(worker));
        }
        pool.drain();
        assert_eq!(pool.workers(), 3);
        assert!(seen.lock().iter().all(|&worker| worker < 3));
    }

    #[test]
    fn panicking_task_still_counts_as_finished() {
        let pool = WorkerPool::new(2).expect("pool");
        let done = Arc::new(AtomicUsize::new(0));
        pool.submit(|_| panic!("task failure"));
        for _ in 0..10 {
            let done = Arc::clone(&done);
            pool.submit(move |_| {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.drain();
        assert_eq!(done.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn drain_without_tasks_returns() {
        let pool = WorkerPool::new(1).expect("pool");
        pool.drain();
    }
}
