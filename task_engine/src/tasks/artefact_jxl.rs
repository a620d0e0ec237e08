use super::artefact::artefact_command;
use super::{
    eligible_by_ext, first_output_conflict, remove_intermediate, verify_output_created, ItemScope,
    TaskExecutor,
};
use crate::error::TaskError;
use crate::runner::ToolCommand;
use crate::task::WorkItem;
use shared_utils::replace_ext;
use std::path::{Path, PathBuf};

/// Artefact removal into a scratch PNG, then lossy JPEG XL beside the source.
pub struct ArtefactJxl;

impl TaskExecutor for ArtefactJxl {
    fn name(&self) -> &str {
        "artefact-jxl"
    }

    fn is_eligible(&self, path: &Path) -> bool {
        eligible_by_ext(path, &["jpg"])
    }

    fn empty_label(&self) -> &'static str {
        "jpg"
    }

    fn preflight(&self, _inputs: &[PathBuf], eligible: &[PathBuf]) -> Vec<TaskError> {
        first_output_conflict(eligible, "jxl").into_iter().collect()
    }

    fn scratch_prefix(&self) -> Option<&'static str> {
        Some("artefact-jxl-tmp")
    }

    fn process(&self, item: &WorkItem, scope: &ItemScope<'_>) -> Result<(), TaskError> {
        // Index-based name: two sources with the same stem in different
        // directories must not share an intermediate.
        let intermediate = scope.scratch_dir()?.join(format!("{}.png", item.index));
        let output = replace_ext(&item.input, "jxl");

        let result = scope
            .run_tool("artefact", &artefact_command(&item.input, &intermediate))
            .and_then(|_| {
                let cjxl = ToolCommand::new("cjxl")
                    .path(&intermediate)
                    .path(&output)
                    .args(["-d", "1", "-e", "9"]);
                scope.run_tool("cjxl", &cjxl)
            });

        let cleanup = remove_intermediate(&intermediate);
        result?;
        cleanup?;
        verify_output_created(&output)
    }
}
