//! Batch Processing Module
//!
//! Directory listing used by every batch tool. Results are sorted so runs are
//! reproducible and logs line up between invocations.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Still images batch-resize picks up.
pub const RESIZE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Animated sources the pipeline hands to the animation upscaler.
pub const ANIMATION_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "gif"];

/// Files under `dir` whose extension (case-insensitive, no dot) is in `extensions`.
///
/// An empty `extensions` slice matches every file.
pub fn collect_files(dir: &Path, extensions: &[&str], recursive: bool) -> Vec<PathBuf> {
    let walker = if recursive {
        WalkDir::new(dir).follow_links(true)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| extensions.is_empty() || crate::common_utils::has_extension(e.path(), extensions))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Immediate subdirectories of `dir`, sorted by name.
pub fn list_folders(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            folders.push(entry.path());
        }
    }
    folders.sort();
    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_collect_files_filters_by_extension() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("b.PNG"));
        touch(&temp.path().join("a.jpg"));
        touch(&temp.path().join("notes.txt"));

        let files = collect_files(temp.path(), RESIZE_EXTENSIONS, false);
        assert_eq!(
            files,
            vec![temp.path().join("a.jpg"), temp.path().join("b.PNG")]
        );
    }

    #[test]
    fn test_collect_files_recursive_flag() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("top.png"));
        touch(&temp.path().join("sub/deep.png"));

        assert_eq!(collect_files(temp.path(), &["png"], false).len(), 1);
        assert_eq!(collect_files(temp.path(), &["png"], true).len(), 2);
    }

    #[test]
    fn test_collect_files_empty_extensions_matches_all() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a.bin"));
        touch(&temp.path().join("b"));

        assert_eq!(collect_files(temp.path(), &[], false).len(), 2);
    }

    #[test]
    fn test_list_folders_sorted_dirs_only() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("zeta")).unwrap();
        fs::create_dir(temp.path().join("alpha")).unwrap();
        touch(&temp.path().join("file.txt"));

        let folders = list_folders(temp.path()).unwrap();
        assert_eq!(
            folders,
            vec![temp.path().join("alpha"), temp.path().join("zeta")]
        );
    }

    #[test]
    fn test_list_folders_missing_dir_errors() {
        let temp = TempDir::new().unwrap();
        assert!(list_folders(&temp.path().join("missing")).is_err());
    }
}
