//! Tool invocation adapter
//!
//! Executors describe a tool call as a [`ToolCommand`]; a [`ToolRunner`]
//! executes it and hands back the exit status plus combined stdout/stderr.
//! Tests substitute a closure for the real runner.

use crate::cancel::CancelToken;
use crate::error::TaskError;
use shared_utils::{safe_path_arg, ToolLog};
use std::ffi::{OsStr, OsString};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// A path argument, protected against being parsed as a flag.
    pub fn path(mut self, path: &Path) -> Self {
        self.args.push(safe_path_arg(path));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Lossy rendering for logs, e.g. `cjxl in.png out.jxl -d 0 -e 9`.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether any argument equals `value`.
    pub fn has_arg(&self, value: impl AsRef<OsStr>) -> bool {
        self.args.iter().any(|a| a.as_os_str() == value.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// stdout and stderr, interleaved as written.
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            output: output.into(),
        }
    }

    pub fn failure(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            output: output.into(),
        }
    }

    /// Classify: success keeps the output, failure carries the tool's text
    /// verbatim, or a generic message when it printed nothing.
    pub fn into_result(self, tool: &str) -> Result<String, TaskError> {
        if self.success {
            return Ok(self.output);
        }
        let message = self.output.trim();
        if message.is_empty() {
            Err(TaskError::ToolFailedSilently {
                tool: tool.to_string(),
                exit_code: self.exit_code,
            })
        } else {
            Err(TaskError::ToolFailed {
                tool: tool.to_string(),
                message: message.to_string(),
            })
        }
    }
}

pub trait ToolRunner: Send + Sync {
    fn run(&self, cmd: &ToolCommand, cancel: &CancelToken) -> Result<ToolOutput, TaskError>;
}

impl<F> ToolRunner for F
where
    F: Fn(&ToolCommand, &CancelToken) -> Result<ToolOutput, TaskError> + Send + Sync,
{
    fn run(&self, cmd: &ToolCommand, cancel: &CancelToken) -> Result<ToolOutput, TaskError> {
        self(cmd, cancel)
    }
}

/// Suppresses the console window flash for child processes on Windows.
pub trait NoWindowExt {
    fn no_window(&mut self) -> &mut Self;
}

impl NoWindowExt for Command {
    fn no_window(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            self.creation_flags(CREATE_NO_WINDOW);
        }
        self
    }
}

/// Runs real processes. Cancellation kills the child, not just the wait.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    log: Option<Arc<ToolLog>>,
    poll_interval: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            log: None,
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(mut self, log: Arc<ToolLog>) -> Self {
        self.log = Some(log);
        self
    }
}

/// Kill `child` and reap it. Used on cancellation and when waiting fails.
pub fn stop_child(child: &mut Child, program: &str) {
    if let Err(e) = child.kill() {
        tracing::warn!(tool = %program, error = %e, "Failed to kill tool");
    }
    if let Err(e) = child.wait() {
        tracing::warn!(tool = %program, error = %e, "Failed to reap tool");
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, cmd: &ToolCommand, cancel: &CancelToken) -> Result<ToolOutput, TaskError> {
        if cancel.is_cancelled() {
            return Err(TaskError::Cancelled);
        }

        let command_line = cmd.command_line();
        let spawn_err = |source| TaskError::Spawn {
            tool: cmd.program.clone(),
            source,
        };

        // Both streams share one file so the capture keeps write order.
        let mut capture = tempfile::tempfile().map_err(|e| TaskError::io("can't create output capture", e))?;
        let stdout = capture.try_clone().map_err(spawn_err)?;
        let stderr = capture.try_clone().map_err(spawn_err)?;

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .no_window();
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }

        tracing::debug!(command = %command_line, "Spawning tool");
        let started = Instant::now();
        let mut child = command.spawn().map_err(spawn_err)?;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    stop_child(&mut child, &cmd.program);
                    return Err(TaskError::io(format!("can't wait for {}", cmd.program), e));
                }
            }
            if cancel.is_cancelled() {
                stop_child(&mut child, &cmd.program);
                tracing::info!(command = %command_line, "Tool killed on cancellation");
                return Err(TaskError::Cancelled);
            }
            std::thread::sleep(self.poll_interval);
        };

        let mut bytes = Vec::new();
        capture
            .seek(SeekFrom::Start(0))
            .and_then(|_| capture.read_to_end(&mut bytes))
            .map_err(|e| TaskError::io(format!("can't read {} output", cmd.program), e))?;
        let output = String::from_utf8_lossy(&bytes).into_owned();

        tracing::debug!(
            command = %command_line,
            exit_code = ?status.code(),
            duration_secs = started.elapsed().as_secs_f64(),
            "Tool finished"
        );
        if let Some(log) = &self.log {
            log.append_invocation(&command_line, status.code(), &output);
        }

        Ok(ToolOutput {
            success: status.success(),
            exit_code: status.code(),
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_builder() {
        let cmd = ToolCommand::new("cjxl")
            .path(Path::new("-in.png"))
            .path(Path::new("out.jxl"))
            .args(["-d", "0"])
            .arg("-e")
            .arg("9");
        assert_eq!(cmd.command_line(), "cjxl ./-in.png out.jxl -d 0 -e 9");
        assert!(cmd.has_arg("-d"));
        assert!(!cmd.has_arg("-q"));
    }

    #[test]
    fn test_into_result_classification() {
        assert_eq!(ToolOutput::success("ok").into_result("cjxl").unwrap(), "ok");

        match ToolOutput::failure(1, "  broken file\n").into_result("cjxl") {
            Err(TaskError::ToolFailed { tool, message }) => {
                assert_eq!(tool, "cjxl");
                assert_eq!(message, "broken file");
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            ToolOutput::failure(2, "\n").into_result("djxl"),
            Err(TaskError::ToolFailedSilently { exit_code: Some(2), .. })
        ));
    }

    #[test]
    fn test_closure_runner() {
        let runner = |cmd: &ToolCommand, _: &CancelToken| -> Result<ToolOutput, TaskError> {
            Ok(ToolOutput::success(cmd.program.clone()))
        };
        let out = runner.run(&ToolCommand::new("echo"), &CancelToken::new()).unwrap();
        assert_eq!(out.output, "echo");
    }

    #[test]
    fn test_system_runner_refuses_when_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = SystemRunner::new().run(&ToolCommand::new("sh"), &cancel);
        assert!(matches!(result, Err(TaskError::Cancelled)));
    }

    #[test]
    fn test_system_runner_missing_program() {
        let result = SystemRunner::new().run(
            &ToolCommand::new("definitely_not_a_real_tool_xyz"),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(TaskError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_combined_output() {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(ToolLog::create_at(temp.path().join("run.log")).unwrap());
        let runner = SystemRunner::new().with_log(Arc::clone(&log));

        let cmd = ToolCommand::new("sh").args(["-c", "echo out; echo err 1>&2; exit 3"]);
        let out = runner.run(&cmd, &CancelToken::new()).unwrap();

        assert!(!out.success);
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.output, "out\nerr\n");

        let logged = std::fs::read_to_string(log.path()).unwrap();
        assert!(logged.contains("[exit: 3]"));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_uses_cwd() {
        let temp = TempDir::new().unwrap();
        let cmd = ToolCommand::new("sh")
            .args(["-c", "touch marker"])
            .current_dir(temp.path());
        let out = SystemRunner::new().run(&cmd, &CancelToken::new()).unwrap();
        assert!(out.success);
        assert!(temp.path().join("marker").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_stop_child_kills_and_reaps() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let started = Instant::now();

        stop_child(&mut child, "sleep");

        let status = child.try_wait().unwrap().expect("child reaped");
        assert!(!status.success());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_kills_on_cancel() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });

        let started = Instant::now();
        let result = SystemRunner::new().run(&ToolCommand::new("sleep").arg("10"), &cancel);
        assert!(matches!(result, Err(TaskError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
