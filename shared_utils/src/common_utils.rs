//! Common Utilities Module
//!
//! Small path helpers that every tool needs:
//! - extension matching (case-insensitive, no leading dot)
//! - output-path derivation (same stem, new extension)
//! - mirroring a file from one root into another
//! - stage directory naming (`<pack>_resized`, `<pack>_jxl`, ...)

use std::ffi::OsString;
use std::path::{Path, PathBuf};

// ═══════════════════════════════════════════════════════════════
// Extensions
// ═══════════════════════════════════════════════════════════════

/// Lowercase extension without the dot, or an empty string.
///
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::get_extension_lowercase;
///
/// assert_eq!(get_extension_lowercase(Path::new("test.JPG")), "jpg");
/// assert_eq!(get_extension_lowercase(Path::new("noext")), "");
/// ```
pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Case-insensitive extension check. `extensions` are given without the dot.
///
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::has_extension;
///
/// let extensions = &["jpg", "png"];
/// assert!(has_extension(Path::new("photo.JPG"), extensions));
/// assert!(!has_extension(Path::new("video.mp4"), extensions));
/// ```
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = get_extension_lowercase(path);
    !ext.is_empty() && extensions.contains(&ext.as_str())
}

// ═══════════════════════════════════════════════════════════════
// Output paths
// ═══════════════════════════════════════════════════════════════

/// Replace the extension of `path`; `ext` has no leading dot.
pub fn replace_ext(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(ext)
}

/// The path without its final extension. Two inputs with equal `strip_ext`
/// collapse onto the same output once a fixed extension is appended.
pub fn strip_ext(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// Re-root `path` from `from` into `to`, keeping the relative part.
///
/// Paths that do not live under `from` keep only their file name.
pub fn rebase_path(path: &Path, from: &Path, to: &Path) -> PathBuf {
    match path.strip_prefix(from) {
        Ok(rel) => to.join(rel),
        Err(_) => match path.file_name() {
            Some(name) => to.join(name),
            None => to.to_path_buf(),
        },
    }
}

/// A sibling directory named after `dir` plus `suffix`: `packs/a` → `packs/a_resized`.
pub fn sibling_with_suffix(dir: &Path, suffix: &str) -> PathBuf {
    match dir.file_name() {
        Some(name) => {
            let mut name: OsString = name.to_os_string();
            name.push(suffix);
            dir.with_file_name(name)
        }
        None => PathBuf::from(format!("{}{}", dir.display(), suffix)),
    }
}

pub fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_extension_lowercase() {
        assert_eq!(get_extension_lowercase(Path::new("test.JPG")), "jpg");
        assert_eq!(get_extension_lowercase(Path::new("test.mp4")), "mp4");
        assert_eq!(get_extension_lowercase(Path::new("noext")), "");
        assert_eq!(get_extension_lowercase(Path::new(".hidden")), "");
    }

    #[test]
    fn test_has_extension() {
        let extensions = &["jpg", "png", "gif"];
        assert!(has_extension(Path::new("photo.JPG"), extensions));
        assert!(has_extension(Path::new("dir/image.Png"), extensions));
        assert!(!has_extension(Path::new("video.mp4"), extensions));
        assert!(!has_extension(Path::new("jpg"), extensions));
    }

    #[test]
    fn test_replace_and_strip_ext() {
        assert_eq!(
            replace_ext(Path::new("a/b/photo.jpg"), "jxl"),
            PathBuf::from("a/b/photo.jxl")
        );
        assert_eq!(
            replace_ext(Path::new("archive.7z"), "7z.par2"),
            PathBuf::from("archive.7z.par2")
        );
        assert_eq!(
            strip_ext(Path::new("a/photo.jpg")),
            strip_ext(Path::new("a/photo.png"))
        );
        assert_ne!(
            strip_ext(Path::new("a/photo.jpg")),
            strip_ext(Path::new("b/photo.jpg"))
        );
    }

    #[test]
    fn test_rebase_path() {
        assert_eq!(
            rebase_path(
                Path::new("in/sub/x.png"),
                Path::new("in"),
                Path::new("out")
            ),
            PathBuf::from("out/sub/x.png")
        );
        assert_eq!(
            rebase_path(Path::new("else/x.png"), Path::new("in"), Path::new("out")),
            PathBuf::from("out/x.png")
        );
    }

    #[test]
    fn test_sibling_with_suffix() {
        assert_eq!(
            sibling_with_suffix(Path::new("/data/packs/a"), "_resized"),
            PathBuf::from("/data/packs/a_resized")
        );
        assert_eq!(
            sibling_with_suffix(Path::new("pack"), "_jxl"),
            PathBuf::from("pack_jxl")
        );
    }

    #[test]
    fn test_file_size_missing_is_zero() {
        let temp = TempDir::new().unwrap();
        let f = temp.path().join("f.bin");
        assert_eq!(file_size(&f), 0);
        std::fs::write(&f, b"12345").unwrap();
        assert_eq!(file_size(&f), 5);
    }
}
