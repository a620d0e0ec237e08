//! Error taxonomy of the engine
//!
//! Pre-flight errors abort a whole request before any tool runs. Everything
//! else fails a single work item. All of them end up as warnings.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    // ── pre-flight ──
    /// Label is the extension list, e.g. `"jpg or png"`.
    #[error("no {0} files found")]
    NoMatchingFiles(&'static str),

    #[error("possible output file '{}' already exists", .0.display())]
    OutputExists(PathBuf),

    #[error("duplicate possible output file for '{}'", .0.display())]
    DuplicateOutput(PathBuf),

    #[error("there's .par2 file in the input: '{}'", .0.display())]
    ParityInput(PathBuf),

    #[error("can't create temp dir: {0}")]
    ScratchDir(#[source] io::Error),

    // ── input expansion ──
    #[error("can't read input '{}': {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("skipped sub-directory '{}'", .0.display())]
    SkippedDirectory(PathBuf),

    #[error("input '{}' given more than once", .0.display())]
    DuplicateInput(PathBuf),

    // ── per item ──
    #[error("{tool} error: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("{tool} error but didn't output anything ({})", exit_label(.exit_code))]
    ToolFailedSilently { tool: String, exit_code: Option<i32> },

    #[error("expecting '{expected}' in {tool} output: {output}")]
    UnexpectedOutput {
        tool: String,
        expected: &'static str,
        output: String,
    },

    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("output file '{}' not created", .0.display())]
    OutputNotCreated(PathBuf),

    #[error("can't check if output file '{}' exists: {source}", .path.display())]
    OutputCheck {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Failure raised by an executor living outside this crate.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("cancelled")]
    Cancelled,
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl TaskError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        TaskError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TaskError::Other(Box::new(error))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            TaskError::NoMatchingFiles("jpg or png").to_string(),
            "no jpg or png files found"
        );
        assert_eq!(
            TaskError::OutputExists(PathBuf::from("a.jxl")).to_string(),
            "possible output file 'a.jxl' already exists"
        );
        assert_eq!(
            TaskError::ToolFailed {
                tool: "cjxl".into(),
                message: "bad input".into()
            }
            .to_string(),
            "cjxl error: bad input"
        );
        assert_eq!(
            TaskError::ToolFailedSilently {
                tool: "djxl".into(),
                exit_code: Some(3)
            }
            .to_string(),
            "djxl error but didn't output anything (exit code 3)"
        );
        assert_eq!(
            TaskError::OutputNotCreated(PathBuf::from("x.png")).to_string(),
            "output file 'x.png' not created"
        );
    }

    #[test]
    fn test_is_cancelled() {
        assert!(TaskError::Cancelled.is_cancelled());
        assert!(!TaskError::NoMatchingFiles("7z").is_cancelled());
    }
}
