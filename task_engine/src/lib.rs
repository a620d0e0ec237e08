//! Batch task engine
//!
//! Runs one external-tool operation over many files under bounded
//! concurrency:
//! - [`WorkerPool`]: fixed admission capacity, cooperative cancellation
//! - [`ProgressTracker`]: lock-guarded completion counter → progress events
//! - [`TaskExecutor`]s: eligibility, pre-flight collision checks, per-item
//!   tool invocation and output verification
//! - [`probe_dimensions`]: image header first, ffprobe through the runner
//! - [`perform_task`]: the request entry point, reporting through an
//!   [`EventEmitter`]

pub mod cancel;
pub mod console;
pub mod error;
pub mod events;
pub mod executor;
pub mod pool;
pub mod probe;
pub mod progress;
pub mod runner;
pub mod task;
pub mod tasks;

pub use cancel::CancelToken;
pub use console::{print_events, ConsoleMode};
pub use error::TaskError;
pub use events::{event_channel, EventEmitter, TaskEvent, Warning};
pub use executor::{perform_task, run_executor, EngineContext, TaskOutcome};
pub use pool::WorkerPool;
pub use probe::{probe_dimensions, Dimensions, ProbeError};
pub use progress::{ProgressGuard, ProgressTracker};
pub use runner::{stop_child, NoWindowExt, SystemRunner, ToolCommand, ToolOutput, ToolRunner};
pub use task::{expand_inputs, TaskKind, TaskRequest, WorkItem};
pub use tasks::{executor_for, verify_output_created, ItemScope, TaskExecutor};
