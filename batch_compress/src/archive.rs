//! 7z invocation and the folder loop.

use shared_utils::list_folders;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use task_engine::{CancelToken, TaskError, ToolCommand, ToolRunner};
use thiserror::Error;

pub const SEVEN_ZIP: &str = "7z";

#[derive(Debug, Error)]
#[error("unknown archive format '{0}': expected .7z or .zip")]
pub struct FormatError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    SevenZip,
    Zip,
}

impl ArchiveFormat {
    /// With the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::SevenZip => ".7z",
            ArchiveFormat::Zip => ".zip",
        }
    }

    fn type_flag(self) -> &'static str {
        match self {
            ArchiveFormat::SevenZip => "-t7z",
            ArchiveFormat::Zip => "-tzip",
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "7z" => Ok(ArchiveFormat::SevenZip),
            "zip" => Ok(ArchiveFormat::Zip),
            _ => Err(FormatError(s.to_string())),
        }
    }
}

/// `"*"` keeps everything; otherwise a space-separated extension list,
/// with or without dots, becomes `*.<ext>` wildcards.
pub fn parse_patterns(extensions: &str) -> Vec<String> {
    let items: Vec<&str> = extensions.split_whitespace().collect();
    if items.is_empty() || items[0] == "*" {
        return vec!["*.*".to_string()];
    }
    items
        .into_iter()
        .map(|ext| {
            let ext = ext.trim_start_matches('*');
            if ext.starts_with('.') {
                format!("*{}", ext)
            } else {
                format!("*.{}", ext)
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct CompressConfig {
    /// Directory whose sub-folders are archived.
    pub root: PathBuf,
    pub format: ArchiveFormat,
    pub patterns: Vec<String>,
}

impl CompressConfig {
    pub fn new(root: impl Into<PathBuf>, format: ArchiveFormat, patterns: Vec<String>) -> Self {
        Self {
            root: root.into(),
            format,
            patterns,
        }
    }
}

/// `<parent>/<folder><ext>`
pub fn archive_path(folder: &Path, format: ArchiveFormat) -> PathBuf {
    let mut name = OsString::from(folder.file_name().unwrap_or(folder.as_os_str()));
    name.push(format.extension());
    folder.with_file_name(name)
}

/// `7z a -bt -t<fmt> -mx=9 -r <archive> <patterns>`, run inside `folder`.
pub fn archive_command(
    folder: &Path,
    archive: &Path,
    format: ArchiveFormat,
    patterns: &[String],
) -> ToolCommand {
    ToolCommand::new(SEVEN_ZIP)
        .args(["a", "-bt", format.type_flag(), "-mx=9", "-r"])
        .path(archive)
        .args(patterns)
        .current_dir(folder)
}

pub fn compress_folder(
    folder: &Path,
    format: ArchiveFormat,
    patterns: &[String],
    runner: &dyn ToolRunner,
    cancel: &CancelToken,
) -> Result<PathBuf, TaskError> {
    if cancel.is_cancelled() {
        return Err(TaskError::Cancelled);
    }
    let archive = archive_path(folder, format);
    let cmd = archive_command(folder, &archive, format, patterns);
    runner.run(&cmd, cancel)?.into_result(SEVEN_ZIP)?;
    Ok(archive)
}

pub type FolderResult = (PathBuf, Result<PathBuf, TaskError>);

/// Archive every immediate sub-folder in name order. A failed folder is
/// logged and the next one proceeds; `on_done` sees each result as it lands.
pub fn compress_all(
    config: &CompressConfig,
    runner: &dyn ToolRunner,
    cancel: &CancelToken,
    mut on_done: impl FnMut(&FolderResult),
) -> Result<Vec<FolderResult>, TaskError> {
    let folders = list_folders(&config.root).map_err(|e| {
        TaskError::io(format!("can't list '{}'", config.root.display()), e)
    })?;

    let mut results = Vec::with_capacity(folders.len());
    for folder in folders {
        if cancel.is_cancelled() {
            break;
        }
        let result = compress_folder(&folder, config.format, &config.patterns, runner, cancel);
        match &result {
            Ok(archive) => tracing::info!(
                folder = %folder.display(),
                archive = %archive.display(),
                "Folder archived"
            ),
            Err(e) => tracing::error!(folder = %folder.display(), error = %e, "Archive failed"),
        }
        let entry = (folder, result);
        on_done(&entry);
        results.push(entry);
    }
    Ok(results)
}
