//! Stages and the child-process seam they run through.

use std::fmt;
use std::io;
use std::process::{Command, Stdio};
use std::time::Duration;
use task_engine::{stop_child, CancelToken, NoWindowExt, ToolCommand};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 1: into or out of jxl, in place.
    ConvertSource,
    /// 2: stills into `<pack>_resized`.
    Resize,
    /// 2b: animations straight into `<pack>_transcoded`.
    ResizeAnimations,
    /// 3: `<pack>_resized` into `<pack>_transcoded`.
    Transcode,
    /// 4: the pack itself as `<pack>.7z`.
    ArchivePack,
    /// 4: `<pack>_transcoded` as `<pack>.zip`.
    ArchiveTranscoded,
    /// 5 (single): jxl files into `<pack>_jxl`.
    MoveJxl,
    /// 5: stage directories removed.
    Cleanup,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::ConvertSource => "Stage 1: Convert source",
            Stage::Resize => "Stage 2: Resize images",
            Stage::ResizeAnimations => "Stage 2b: Resize animations",
            Stage::Transcode => "Stage 3: Transcode",
            Stage::ArchivePack => "Stage 4: Archive pack",
            Stage::ArchiveTranscoded => "Stage 4: Archive transcoded",
            Stage::MoveJxl => "Stage 5: Re-organize jxl files",
            Stage::Cleanup => "Stage 5: Cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {}", exit_label(.code))]
    Exit { program: String, code: Option<i32> },

    #[error("{failed} of {total} files failed")]
    Items { failed: usize, total: usize },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("cancelled")]
    Cancelled,
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

impl StageError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        StageError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Runs one stage's child process to completion.
pub trait StageRunner: Send + Sync {
    fn run(&self, cmd: &ToolCommand, cancel: &CancelToken) -> Result<(), StageError>;
}

impl<F> StageRunner for F
where
    F: Fn(&ToolCommand, &CancelToken) -> Result<(), StageError> + Send + Sync,
{
    fn run(&self, cmd: &ToolCommand, cancel: &CancelToken) -> Result<(), StageError> {
        self(cmd, cancel)
    }
}

/// Child processes share this terminal, so the tools draw their own
/// progress. Cancellation kills the child.
#[derive(Debug, Clone)]
pub struct ProcessStageRunner {
    poll_interval: Duration,
}

impl Default for ProcessStageRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl ProcessStageRunner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StageRunner for ProcessStageRunner {
    fn run(&self, cmd: &ToolCommand, cancel: &CancelToken) -> Result<(), StageError> {
        if cancel.is_cancelled() {
            return Err(StageError::Cancelled);
        }
        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .no_window();
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }

        tracing::info!(command = %cmd.command_line(), "Starting stage process");
        let mut child = command.spawn().map_err(|source| StageError::Spawn {
            program: cmd.program.clone(),
            source,
        })?;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    stop_child(&mut child, &cmd.program);
                    return Err(StageError::io(format!("can't wait for {}", cmd.program), e));
                }
            }
            if cancel.is_cancelled() {
                stop_child(&mut child, &cmd.program);
                return Err(StageError::Cancelled);
            }
            std::thread::sleep(self.poll_interval);
        };

        if status.success() {
            Ok(())
        } else {
            Err(StageError::Exit {
                program: cmd.program.clone(),
                code: status.code(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StageError::Exit {
                program: "batch-resize".into(),
                code: Some(1)
            }
            .to_string(),
            "batch-resize exited with exit code 1"
        );
        assert_eq!(
            StageError::Items { failed: 2, total: 5 }.to_string(),
            "2 of 5 files failed"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_reports_exit_code() {
        let runner = ProcessStageRunner::new();
        let cancel = CancelToken::new();

        runner
            .run(&ToolCommand::new("sh").args(["-c", "exit 0"]), &cancel)
            .unwrap();
        match runner.run(&ToolCommand::new("sh").args(["-c", "exit 4"]), &cancel) {
            Err(StageError::Exit { code, .. }) => assert_eq!(code, Some(4)),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_missing_program() {
        let err = ProcessStageRunner::new()
            .run(&ToolCommand::new("definitely-not-a-stage-tool"), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, StageError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_kills_child() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            trigger.cancel();
        });
        let started = std::time::Instant::now();

        let err = ProcessStageRunner::new()
            .run(&ToolCommand::new("sleep").arg("30"), &cancel)
            .unwrap_err();

        handle.join().unwrap();
        assert!(matches!(err, StageError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
