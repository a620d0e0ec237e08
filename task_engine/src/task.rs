//! Task requests and input expansion

use crate::error::TaskError;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// JPEG artefact removal to PNG
    Artefact,
    /// Artefact removal, then lossy JPEG XL
    ArtefactJxl,
    /// Lossless JPEG XL from JPEG/PNG
    CjxlLossless,
    /// Lossy JPEG XL (distance 1) from JPEG/PNG
    CjxlLossy,
    /// JPEG XL back to the original JPEG, or PNG when that is impossible
    Djxl,
    /// PAR2 recovery data for 7z archives
    Par2,
}

impl TaskKind {
    pub const ALL: [TaskKind; 6] = [
        TaskKind::Artefact,
        TaskKind::ArtefactJxl,
        TaskKind::CjxlLossless,
        TaskKind::CjxlLossy,
        TaskKind::Djxl,
        TaskKind::Par2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Artefact => "artefact",
            TaskKind::ArtefactJxl => "artefact-jxl",
            TaskKind::CjxlLossless => "cjxl-lossless",
            TaskKind::CjxlLossy => "cjxl-lossy",
            TaskKind::Djxl => "djxl",
            TaskKind::Par2 => "par2",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub kind: TaskKind,
    /// Files or directories; directories are expanded one level deep.
    pub inputs: Vec<PathBuf>,
}

impl TaskRequest {
    pub fn new(kind: TaskKind, inputs: Vec<PathBuf>) -> Self {
        Self { kind, inputs }
    }
}

/// One eligible input scheduled onto the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Position in the eligible list; unique within a request.
    pub index: usize,
    pub input: PathBuf,
}

#[derive(Debug, Default)]
pub struct Expansion {
    pub files: Vec<PathBuf>,
    pub warnings: Vec<TaskError>,
}

impl Expansion {
    /// Keep `path` unless it names a file already taken, by canonical path.
    fn push_file(&mut self, seen: &mut HashSet<PathBuf>, path: PathBuf) {
        let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if seen.insert(key) {
            self.files.push(path);
        } else {
            self.warnings.push(TaskError::DuplicateInput(path));
        }
    }
}

/// Flatten `inputs`: files pass through, directories contribute their
/// immediate files in name order. Nested directories, unreadable inputs and
/// files reached twice become warnings.
pub fn expand_inputs(inputs: &[PathBuf]) -> Expansion {
    let mut expansion = Expansion::default();
    let mut seen = HashSet::new();

    for input in inputs {
        let metadata = match std::fs::metadata(input) {
            Ok(m) => m,
            Err(source) => {
                expansion.warnings.push(TaskError::Input {
                    path: input.clone(),
                    source,
                });
                continue;
            }
        };

        if !metadata.is_dir() {
            expansion.push_file(&mut seen, input.clone());
            continue;
        }

        match read_dir_sorted(input) {
            Ok(entries) => {
                for (path, is_dir) in entries {
                    if is_dir {
                        expansion.warnings.push(TaskError::SkippedDirectory(path));
                    } else {
                        expansion.push_file(&mut seen, path);
                    }
                }
            }
            Err(source) => expansion.warnings.push(TaskError::Input {
                path: input.clone(),
                source,
            }),
        }
    }

    expansion
}

fn read_dir_sorted(dir: &Path) -> std::io::Result<Vec<(PathBuf, bool)>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let is_dir = entry.path().is_dir();
        entries.push((entry.path(), is_dir));
    }
    entries.sort();
    Ok(entries)
}
