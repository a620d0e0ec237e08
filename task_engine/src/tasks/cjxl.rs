use super::{eligible_by_ext, first_output_conflict, verify_output_created, ItemScope, TaskExecutor};
use crate::error::TaskError;
use crate::runner::ToolCommand;
use crate::task::WorkItem;
use shared_utils::replace_ext;
use std::path::{Path, PathBuf};

/// JPEG/PNG → JPEG XL beside the source, lossless (distance 0) or lossy (distance 1).
pub struct Cjxl {
    lossy: bool,
}

impl Cjxl {
    pub fn lossless() -> Self {
        Self { lossy: false }
    }

    pub fn lossy() -> Self {
        Self { lossy: true }
    }

    fn distance(&self) -> &'static str {
        if self.lossy {
            "1"
        } else {
            "0"
        }
    }
}

impl TaskExecutor for Cjxl {
    fn name(&self) -> &str {
        if self.lossy {
            "cjxl-lossy"
        } else {
            "cjxl-lossless"
        }
    }

    fn is_eligible(&self, path: &Path) -> bool {
        eligible_by_ext(path, &["jpg", "png"])
    }

    fn empty_label(&self) -> &'static str {
        "jpg or png"
    }

    fn preflight(&self, _inputs: &[PathBuf], eligible: &[PathBuf]) -> Vec<TaskError> {
        first_output_conflict(eligible, "jxl").into_iter().collect()
    }

    fn process(&self, item: &WorkItem, scope: &ItemScope<'_>) -> Result<(), TaskError> {
        let output = replace_ext(&item.input, "jxl");
        let cmd = ToolCommand::new("cjxl")
            .path(&item.input)
            .path(&output)
            .args(["-d", self.distance(), "-e", "9"]);
        scope.run_tool("cjxl", &cmd)?;
        verify_output_created(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::runner::ToolOutput;
    use crate::tasks::test_support::{arg_path, touch, RecordingRunner};
    use tempfile::TempDir;

    fn run(cjxl: &Cjxl, input: PathBuf) -> (Result<(), TaskError>, Vec<ToolCommand>) {
        let runner = RecordingRunner::new(|cmd: &ToolCommand| {
            touch(&arg_path(cmd, 1));
            ToolOutput::success("")
        });
        let cancel = CancelToken::new();
        let scope = ItemScope::new(&runner, &cancel);
        let result = cjxl.process(&WorkItem { index: 0, input }, &scope);
        (result, runner.calls())
    }

    #[test]
    fn test_distance_per_mode() {
        let temp = TempDir::new().unwrap();

        let tail = |cmd: &ToolCommand| -> Vec<String> {
            cmd.args[2..]
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect()
        };

        let (result, calls) = run(&Cjxl::lossless(), temp.path().join("a.png"));
        result.unwrap();
        assert_eq!(tail(&calls[0]), ["-d", "0", "-e", "9"]);

        let (result, calls) = run(&Cjxl::lossy(), temp.path().join("b.jpg"));
        result.unwrap();
        assert_eq!(tail(&calls[0]), ["-d", "1", "-e", "9"]);
        assert!(temp.path().join("b.jxl").exists());
    }

    #[test]
    fn test_cancelled_scope_runs_nothing() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::new(|_: &ToolCommand| ToolOutput::success(""));
        let cancel = CancelToken::new();
        cancel.cancel();
        let scope = ItemScope::new(&runner, &cancel);

        let err = Cjxl::lossless()
            .process(
                &WorkItem {
                    index: 0,
                    input: temp.path().join("a.png"),
                },
                &scope,
            )
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_preflight_duplicate_stem() {
        let temp = TempDir::new().unwrap();
        let eligible = vec![temp.path().join("a.jpg"), temp.path().join("a.png")];
        let errors = Cjxl::lossless().preflight(&eligible, &eligible);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], TaskError::DuplicateOutput(_)));
    }
}
