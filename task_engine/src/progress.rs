//! Progress aggregator
//!
//! One counter per request behind a mutex. The sample is computed and sent
//! while the lock is held, so any single consumer sees non-decreasing values
//! ending at exactly 1.0.

use crate::events::EventEmitter;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub struct ProgressTracker {
    total: NonZeroUsize,
    completed: Mutex<usize>,
    emitter: EventEmitter,
}

impl ProgressTracker {
    pub fn new(total: NonZeroUsize, emitter: EventEmitter) -> Self {
        Self {
            total,
            completed: Mutex::new(0),
            emitter,
        }
    }

    pub fn total(&self) -> usize {
        self.total.get()
    }

    pub fn completed(&self) -> usize {
        *self.completed.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count one finished item and emit the new fraction.
    pub fn report_one(&self) -> f64 {
        let mut completed = self.completed.lock().unwrap_or_else(|e| e.into_inner());
        if *completed >= self.total.get() {
            tracing::warn!(total = self.total.get(), "Progress reported past total");
            return 1.0;
        }
        *completed += 1;
        let fraction = *completed as f64 / self.total.get() as f64;
        self.emitter.progress(*completed, self.total.get());
        fraction
    }

    /// Reports one item when dropped, whatever way the item ends.
    pub fn guard(self: &Arc<Self>) -> ProgressGuard {
        ProgressGuard(Arc::clone(self))
    }
}

pub struct ProgressGuard(Arc<ProgressTracker>);

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.0.report_one();
    }
}
