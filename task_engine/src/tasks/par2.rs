use super::{eligible_by_ext, verify_output_created, ItemScope, TaskExecutor};
use crate::error::TaskError;
use crate::runner::ToolCommand;
use crate::task::WorkItem;
use shared_utils::has_extension;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// PAR2 recovery data (11% redundancy) for every `.7z` archive.
pub struct Par2;

/// `archive.7z` → `archive.7z.par2`
pub fn par2_index_path(archive: &Path) -> PathBuf {
    let mut name = OsString::from(archive.as_os_str());
    name.push(".par2");
    PathBuf::from(name)
}

impl TaskExecutor for Par2 {
    fn name(&self) -> &str {
        "par2"
    }

    fn is_eligible(&self, path: &Path) -> bool {
        eligible_by_ext(path, &["7z"])
    }

    fn empty_label(&self) -> &'static str {
        "7z"
    }

    /// Existing recovery data anywhere in the input means this already ran.
    fn preflight(&self, inputs: &[PathBuf], _eligible: &[PathBuf]) -> Vec<TaskError> {
        inputs
            .iter()
            .find(|p| has_extension(p, &["par2"]))
            .map(|p| TaskError::ParityInput(p.clone()))
            .into_iter()
            .collect()
    }

    fn process(&self, item: &WorkItem, scope: &ItemScope<'_>) -> Result<(), TaskError> {
        let index = par2_index_path(&item.input);
        let cmd = ToolCommand::new("par2j64")
            .args(["c", "/rr11"])
            .path(&index)
            .path(&item.input);
        scope.run_tool("par2", &cmd)?;
        verify_output_created(&index)
    }
}
