//! Bounded worker pool
//!
//! A rayon thread pool with exactly `capacity` threads is the admission
//! mechanism: a job only runs once one of those threads picks it up, so at
//! most `capacity` jobs (and therefore tool processes) run at once.
//! [`WorkerPool::run`] never blocks the caller.

use crate::cancel::CancelToken;
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug, Default)]
struct Pending {
    count: Mutex<usize>,
    drained: Condvar,
}

impl Pending {
    fn add(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count += 1;
    }

    fn done(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    fn wait(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        while *count > 0 {
            count = self
                .drained
                .wait(count)
                .unwrap_or_else(|e| e.into_inner());
        }
    }
}

/// Marks a job finished when dropped, including during a panic unwind.
struct PendingGuard(Arc<Pending>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.done();
    }
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    capacity: usize,
    cancel: CancelToken,
    pending: Arc<Pending>,
}

impl WorkerPool {
    pub fn new(capacity: usize, cancel: CancelToken) -> Result<Self, rayon::ThreadPoolBuildError> {
        let capacity = capacity.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(capacity)
            .thread_name(|i| format!("task-worker-{}", i))
            .panic_handler(|payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(panic = %message, "Worker job panicked");
            })
            .build()?;

        Ok(Self {
            pool,
            capacity,
            cancel,
            pending: Arc::new(Pending::default()),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Schedule `job`. Jobs admitted after cancellation are dropped unrun.
    pub fn run<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending.add();
        let guard = PendingGuard(Arc::clone(&self.pending));
        let cancel = self.cancel.clone();

        self.pool.spawn(move || {
            let _guard = guard;
            if cancel.is_cancelled() {
                drop(job);
                return;
            }
            job();
        });
    }

    /// Block until every scheduled job has finished or been skipped, then
    /// shut the threads down. Must not be called from inside a job.
    pub fn wait_and_close(self) {
        self.pending.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_runs_every_job() {
        let pool = WorkerPool::new(3, CancelToken::new()).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..25 {
            let done = Arc::clone(&done);
            pool.run(move || {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.wait_and_close();
        assert_eq!(done.load(Ordering::SeqCst), 25);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let pool = WorkerPool::new(2, CancelToken::new()).unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..12 {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            pool.run(move || {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(15));
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
        pool.wait_and_close();

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_run_does_not_block_caller() {
        let pool = WorkerPool::new(1, CancelToken::new()).unwrap();
        let started = std::time::Instant::now();
        for _ in 0..4 {
            pool.run(|| std::thread::sleep(Duration::from_millis(50)));
        }
        assert!(started.elapsed() < Duration::from_millis(50));
        pool.wait_and_close();
    }

    #[test]
    fn test_cancel_skips_unstarted_jobs() {
        let cancel = CancelToken::new();
        let pool = WorkerPool::new(1, cancel.clone()).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        let (started_tx, started_rx) = std::sync::mpsc::channel();
        {
            let ran = Arc::clone(&ran);
            pool.run(move || {
                let _ = started_tx.send(());
                std::thread::sleep(Duration::from_millis(50));
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        for _ in 0..10 {
            let ran = Arc::clone(&ran);
            pool.run(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }

        started_rx.recv().unwrap();
        cancel.cancel();
        pool.wait_and_close();

        // the admitted job finishes, queued ones never start
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_job_still_releases() {
        let pool = WorkerPool::new(2, CancelToken::new()).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        pool.run(|| panic!("boom"));
        for _ in 0..3 {
            let done = Arc::clone(&done);
            pool.run(move || {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.wait_and_close();
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_wait_on_empty_pool() {
        let pool = WorkerPool::new(4, CancelToken::new()).unwrap();
        assert_eq!(pool.capacity(), 4);
        pool.wait_and_close();
    }
}
