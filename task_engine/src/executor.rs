//! Request execution
//!
//! Expand → filter → empty check → pre-flight → pool → drain. Every failure becomes a
//! warning event; nothing here is fatal to the process.

use crate::cancel::CancelToken;
use crate::error::TaskError;
use crate::events::{EventEmitter, TaskEvent};
use crate::pool::WorkerPool;
use crate::progress::ProgressTracker;
use crate::runner::ToolRunner;
use crate::task::{expand_inputs, TaskRequest, WorkItem};
use crate::tasks::{executor_for, ItemScope, TaskExecutor};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a request runs against. Owned per caller, no globals.
#[derive(Clone)]
pub struct EngineContext {
    pub runner: Arc<dyn ToolRunner>,
    pub events: EventEmitter,
    pub cancel: CancelToken,
    /// Worker pool capacity.
    pub threads: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub eligible: usize,
    pub warnings: usize,
    /// Pre-flight failed; no tool ran.
    pub aborted: bool,
    pub cancelled: bool,
}

impl TaskOutcome {
    pub fn is_clean(&self) -> bool {
        self.warnings == 0 && !self.aborted && !self.cancelled
    }
}

pub fn perform_task(request: &TaskRequest, ctx: &EngineContext) -> TaskOutcome {
    let baseline = ctx.events.warning_count();
    let executor = executor_for(request.kind);
    ctx.events.emit(TaskEvent::Started {
        task: executor.name().to_string(),
    });

    let expansion = expand_inputs(&request.inputs);
    for warning in &expansion.warnings {
        ctx.events.warn(executor.name(), warning);
    }

    execute(executor, expansion.files, ctx, baseline)
}

/// Run `executor` over an already-resolved file list.
pub fn run_executor(executor: Arc<dyn TaskExecutor>, files: Vec<PathBuf>, ctx: &EngineContext) -> TaskOutcome {
    let baseline = ctx.events.warning_count();
    ctx.events.emit(TaskEvent::Started {
        task: executor.name().to_string(),
    });
    execute(executor, files, ctx, baseline)
}

fn execute(
    executor: Arc<dyn TaskExecutor>,
    files: Vec<PathBuf>,
    ctx: &EngineContext,
    baseline: usize,
) -> TaskOutcome {
    let name = executor.name().to_string();
    let eligible: Vec<PathBuf> = files
        .iter()
        .filter(|p| executor.is_eligible(p))
        .cloned()
        .collect();
    let eligible_count = eligible.len();

    let finish = |aborted: bool| {
        let outcome = TaskOutcome {
            eligible: eligible_count,
            warnings: ctx.events.warning_count().saturating_sub(baseline),
            aborted,
            cancelled: ctx.cancel.is_cancelled(),
        };
        ctx.events.emit(TaskEvent::Finished {
            task: name.clone(),
            eligible: outcome.eligible,
            warnings: outcome.warnings,
        });
        tracing::info!(
            task = %name,
            eligible = outcome.eligible,
            warnings = outcome.warnings,
            aborted = outcome.aborted,
            cancelled = outcome.cancelled,
            "Task finished"
        );
        outcome
    };

    let Some(total) = NonZeroUsize::new(eligible_count) else {
        ctx.events
            .warn(&name, TaskError::NoMatchingFiles(executor.empty_label()));
        return finish(true);
    };

    let problems = executor.preflight(&files, &eligible);
    if !problems.is_empty() {
        for problem in &problems {
            ctx.events.warn(&name, problem);
        }
        return finish(true);
    }

    let scratch = match executor.scratch_prefix() {
        Some(prefix) => match tempfile::Builder::new().prefix(prefix).tempdir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                ctx.events.warn(&name, TaskError::ScratchDir(e));
                return finish(true);
            }
        },
        None => None,
    };
    let scratch_path: Option<Arc<PathBuf>> = scratch.as_ref().map(|d| Arc::new(d.path().to_path_buf()));

    let pool = match WorkerPool::new(ctx.threads, ctx.cancel.clone()) {
        Ok(pool) => pool,
        Err(e) => {
            ctx.events.warn(&name, format_args!("can't start worker pool: {}", e));
            return finish(true);
        }
    };

    tracing::info!(task = %name, eligible = eligible_count, threads = pool.capacity(), "Task started");
    let tracker = Arc::new(ProgressTracker::new(total, ctx.events.clone()));

    for (index, input) in eligible.into_iter().enumerate() {
        let executor = Arc::clone(&executor);
        let runner = Arc::clone(&ctx.runner);
        let cancel = ctx.cancel.clone();
        let events = ctx.events.clone();
        let scratch = scratch_path.clone();
        let progress = tracker.guard();

        pool.run(move || {
            let _progress = progress;
            let item = WorkItem { index, input };
            let scope = ItemScope::new(runner.as_ref(), &cancel)
                .with_scratch(scratch.as_deref().map(|p| p.as_path()))
                .with_events(&events);

            match executor.process(&item, &scope) {
                Ok(()) => tracing::debug!(input = %item.input.display(), "Item done"),
                Err(e) if e.is_cancelled() => {
                    tracing::debug!(input = %item.input.display(), "Item cancelled")
                }
                Err(e) => events.warn(executor.name(), e),
            }
        });
    }

    pool.wait_and_close();

    if let Some(dir) = scratch {
        let path = dir.path().to_path_buf();
        if let Err(e) = dir.close() {
            ctx.events.warn(
                &name,
                TaskError::io(format!("can't remove temp dir '{}'", path.display()), e),
            );
        }
    }

    finish(false)
}
