use super::{eligible_by_ext, first_output_conflict, verify_output_created, ItemScope, TaskExecutor};
use crate::error::TaskError;
use crate::runner::ToolCommand;
use crate::task::WorkItem;
use shared_utils::replace_ext;
use std::path::{Path, PathBuf};

/// JPEG artefact removal: `<stem>.jpg` → `<stem>.png` beside it.
pub struct Artefact;

pub(crate) fn artefact_command(input: &Path, output: &Path) -> ToolCommand {
    ToolCommand::new("artefact-cli")
        .path(input)
        .arg("-o")
        .path(output)
        .args(["-i", "50"])
}

impl TaskExecutor for Artefact {
    fn name(&self) -> &str {
        "artefact"
    }

    fn is_eligible(&self, path: &Path) -> bool {
        eligible_by_ext(path, &["jpg"])
    }

    fn empty_label(&self) -> &'static str {
        "jpg"
    }

    fn preflight(&self, _inputs: &[PathBuf], eligible: &[PathBuf]) -> Vec<TaskError> {
        first_output_conflict(eligible, "png").into_iter().collect()
    }

    fn process(&self, item: &WorkItem, scope: &ItemScope<'_>) -> Result<(), TaskError> {
        let output = replace_ext(&item.input, "png");
        scope.run_tool("artefact", &artefact_command(&item.input, &output))?;
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

    #[test]
    fn test_process_writes_png() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("p.jpg");
        let runner = RecordingRunner::new(|cmd: &ToolCommand| {
            touch(&arg_path(cmd, 2));
            ToolOutput::success("")
        });
        let cancel = CancelToken::new();
        let scope = ItemScope::new(&runner, &cancel);

        Artefact
            .process(&WorkItem { index: 0, input: input.clone() }, &scope)
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].command_line(),
            format!(
                "artefact-cli {} -o {} -i 50",
                input.display(),
                temp.path().join("p.png").display()
            )
        );
    }

    #[test]
    fn test_success_without_output_is_failure() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::new(|_: &ToolCommand| ToolOutput::success(""));
        let cancel = CancelToken::new();
        let scope = ItemScope::new(&runner, &cancel);

        let err = Artefact
            .process(
                &WorkItem {
                    index: 0,
                    input: temp.path().join("p.jpg"),
                },
                &scope,
            )
            .unwrap_err();
        assert!(matches!(err, TaskError::OutputNotCreated(_)));
    }

    #[test]
    fn test_eligibility_is_jpg_only() {
        assert!(Artefact.is_eligible(Path::new("a.JPG")));
        assert!(!Artefact.is_eligible(Path::new("a.jpeg")));
        assert!(!Artefact.is_eligible(Path::new("a.png")));
    }
}
