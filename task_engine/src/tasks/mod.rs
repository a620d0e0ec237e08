//! Task executors
//!
//! Each executor owns one operation's contract: which inputs are eligible,
//! what must hold before any tool runs, and what one work item does.

mod artefact;
mod artefact_jxl;
mod cjxl;
mod djxl;
mod par2;

pub use artefact::Artefact;
pub use artefact_jxl::ArtefactJxl;
pub use cjxl::Cjxl;
pub use djxl::Djxl;
pub use par2::Par2;

use crate::cancel::CancelToken;
use crate::error::TaskError;
use crate::events::EventEmitter;
use crate::runner::{ToolCommand, ToolOutput, ToolRunner};
use crate::task::{TaskKind, WorkItem};
use shared_utils::{has_extension, replace_ext, strip_ext};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a work item gets to use while it runs.
pub struct ItemScope<'a> {
    pub runner: &'a dyn ToolRunner,
    pub cancel: &'a CancelToken,
    /// Request-scoped scratch directory, when the executor asked for one.
    pub scratch: Option<&'a Path>,
    /// Sink for non-fatal problems inside an item that still goes on.
    pub events: Option<&'a EventEmitter>,
}

impl<'a> ItemScope<'a> {
    pub fn new(runner: &'a dyn ToolRunner, cancel: &'a CancelToken) -> Self {
        Self {
            runner,
            cancel,
            scratch: None,
            events: None,
        }
    }

    pub fn with_scratch(mut self, scratch: Option<&'a Path>) -> Self {
        self.scratch = scratch;
        self
    }

    pub fn with_events(mut self, events: &'a EventEmitter) -> Self {
        self.events = Some(events);
        self
    }

    /// Run `cmd` unless the request is already cancelled.
    pub fn run_raw(&self, cmd: &ToolCommand) -> Result<ToolOutput, TaskError> {
        if self.cancel.is_cancelled() {
            return Err(TaskError::Cancelled);
        }
        self.runner.run(cmd, self.cancel)
    }

    /// Run `cmd` and classify the result under the name `tool`.
    pub fn run_tool(&self, tool: &str, cmd: &ToolCommand) -> Result<String, TaskError> {
        self.run_raw(cmd)?.into_result(tool)
    }

    pub fn warn(&self, source: &str, error: &TaskError) {
        match self.events {
            Some(events) => events.warn(source, error),
            None => tracing::warn!(source, "{}", error),
        }
    }

    pub fn scratch_dir(&self) -> Result<&Path, TaskError> {
        self.scratch.ok_or_else(|| {
            TaskError::ScratchDir(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no scratch directory for this request",
            ))
        })
    }
}

pub trait TaskExecutor: Send + Sync {
    /// Source label on warnings and events.
    fn name(&self) -> &str;

    fn is_eligible(&self, path: &Path) -> bool;

    /// Extension label for the "no ... files found" warning.
    fn empty_label(&self) -> &'static str;

    /// Synchronous checks before any tool runs. `inputs` is the whole
    /// expanded list, `eligible` the filtered one. Any error aborts the request.
    fn preflight(&self, inputs: &[PathBuf], eligible: &[PathBuf]) -> Vec<TaskError>;

    /// Prefix of a scratch directory created for the request and removed
    /// once the pool drains.
    fn scratch_prefix(&self) -> Option<&'static str> {
        None
    }

    fn process(&self, item: &WorkItem, scope: &ItemScope<'_>) -> Result<(), TaskError>;
}

pub fn executor_for(kind: TaskKind) -> Arc<dyn TaskExecutor> {
    match kind {
        TaskKind::Artefact => Arc::new(Artefact),
        TaskKind::ArtefactJxl => Arc::new(ArtefactJxl),
        TaskKind::CjxlLossless => Arc::new(Cjxl::lossless()),
        TaskKind::CjxlLossy => Arc::new(Cjxl::lossy()),
        TaskKind::Djxl => Arc::new(Djxl),
        TaskKind::Par2 => Arc::new(Par2),
    }
}

pub(crate) fn eligible_by_ext(path: &Path, extensions: &[&str]) -> bool {
    has_extension(path, extensions)
}

/// Whether something already sits at `path`. Errors other than NotFound
/// are reported rather than read as "absent".
pub(crate) fn output_present(path: &Path) -> Result<bool, TaskError> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(TaskError::OutputCheck {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// `OutputExists` for a taken path, `OutputCheck` when it can't be told.
pub(crate) fn output_problem(path: PathBuf) -> Option<TaskError> {
    match output_present(&path) {
        Ok(true) => Some(TaskError::OutputExists(path)),
        Ok(false) => None,
        Err(e) => Some(e),
    }
}

/// First input sharing its path-without-extension with an earlier one.
/// `a.jpg` and `a.JPG` collide as well as `a.jpg` and `a.png`.
pub(crate) fn first_stem_collision(eligible: &[PathBuf]) -> Option<TaskError> {
    let mut stems = HashSet::new();
    eligible
        .iter()
        .find(|input| !stems.insert(strip_ext(input)))
        .map(|input| TaskError::DuplicateOutput(input.clone()))
}

/// Existing outputs and stem collisions, stopping at the first problem.
pub(crate) fn first_output_conflict(eligible: &[PathBuf], ext: &str) -> Option<TaskError> {
    let mut stems = HashSet::new();
    for input in eligible {
        if let Some(problem) = output_problem(replace_ext(input, ext)) {
            return Some(problem);
        }
        if !stems.insert(strip_ext(input)) {
            return Some(TaskError::DuplicateOutput(input.clone()));
        }
    }
    None
}

/// A tool exiting 0 is not enough; the file has to be there.
pub fn verify_output_created(path: &Path) -> Result<(), TaskError> {
    match std::fs::metadata(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TaskError::OutputNotCreated(path.to_path_buf()))
        }
        Err(source) => Err(TaskError::OutputCheck {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Remove an intermediate file, tolerating that it was never written.
pub(crate) fn remove_intermediate(path: &Path) -> Result<(), TaskError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TaskError::io(
            format!("can't remove intermediate file '{}'", path.display()),
            e,
        )),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::cancel::CancelToken;
    use crate::error::TaskError;
    use crate::runner::{ToolCommand, ToolOutput, ToolRunner};
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records every command; the behaviour closure decides the outcome.
    pub struct RecordingRunner<F> {
        pub calls: Mutex<Vec<ToolCommand>>,
        behaviour: F,
    }

    impl<F> RecordingRunner<F>
    where
        F: Fn(&ToolCommand) -> ToolOutput + Send + Sync,
    {
        pub fn new(behaviour: F) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                behaviour,
            }
        }

        pub fn calls(&self) -> Vec<ToolCommand> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl<F> ToolRunner for RecordingRunner<F>
    where
        F: Fn(&ToolCommand) -> ToolOutput + Send + Sync,
    {
        fn run(&self, cmd: &ToolCommand, _cancel: &CancelToken) -> Result<ToolOutput, TaskError> {
            self.calls.lock().unwrap().push(cmd.clone());
            Ok((self.behaviour)(cmd))
        }
    }

    /// Argument `i` of `cmd` as a path.
    pub fn arg_path(cmd: &ToolCommand, i: usize) -> PathBuf {
        PathBuf::from(&cmd.args[i])
    }

    pub fn touch(path: &std::path::Path) {
        std::fs::write(path, b"out").unwrap();
    }
}
