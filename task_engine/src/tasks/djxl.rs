use super::{
    eligible_by_ext, first_stem_collision, output_problem, remove_intermediate,
    verify_output_created, ItemScope, TaskExecutor,
};
use crate::error::TaskError;
use crate::runner::ToolCommand;
use crate::task::WorkItem;
use shared_utils::replace_ext;
use std::path::{Path, PathBuf};

/// djxl prints this when the JPEG reconstruction data is missing.
pub const LOSSY_MARKER: &str = "Warning: could not decode losslessly to JPEG";

/// A successful pixel decode prints this.
pub const DECODED_MARKER: &str = "Decoded to pixels.";

/// JPEG XL → the original JPEG when it can be reconstructed, PNG otherwise.
pub struct Djxl;

fn djxl_command(input: &Path, output: &Path) -> ToolCommand {
    ToolCommand::new("djxl").path(input).path(output)
}

impl TaskExecutor for Djxl {
    fn name(&self) -> &str {
        "djxl"
    }

    fn is_eligible(&self, path: &Path) -> bool {
        eligible_by_ext(path, &["jxl"])
    }

    fn empty_label(&self) -> &'static str {
        "jxl"
    }

    /// Every existing candidate is reported, not just the first.
    fn preflight(&self, _inputs: &[PathBuf], eligible: &[PathBuf]) -> Vec<TaskError> {
        let mut problems: Vec<TaskError> = eligible
            .iter()
            .flat_map(|input| [replace_ext(input, "jpg"), replace_ext(input, "png")])
            .filter_map(output_problem)
            .collect();
        problems.extend(first_stem_collision(eligible));
        problems
    }

    fn process(&self, item: &WorkItem, scope: &ItemScope<'_>) -> Result<(), TaskError> {
        let jpg = replace_ext(&item.input, "jpg");
        let png = replace_ext(&item.input, "png");

        let output = scope
            .run_raw(&djxl_command(&item.input, &jpg))?
            .into_result("djxl")?;
        if !output.contains(LOSSY_MARKER) {
            return verify_output_created(&jpg);
        }

        // Reconstruction impossible; whatever djxl wrote is not the original.
        if let Err(e) = remove_intermediate(&jpg) {
            scope.warn(self.name(), &e);
        }

        let output = scope
            .run_raw(&djxl_command(&item.input, &png))?
            .into_result("djxl")?;
        if !output.contains(DECODED_MARKER) {
            return Err(TaskError::UnexpectedOutput {
                tool: "djxl".to_string(),
                expected: DECODED_MARKER,
                output: output.trim().to_string(),
            });
        }
        verify_output_created(&png)
    }
}
