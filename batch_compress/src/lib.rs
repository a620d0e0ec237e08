//! Batch compress
//!
//! Packs each immediate sub-folder of a directory into `<folder>.7z` or
//! `<folder>.zip` beside it, one `7z` run at a time.

pub mod archive;

pub use archive::{
    archive_command, archive_path, compress_all, compress_folder, parse_patterns, ArchiveFormat,
    CompressConfig, FolderResult, FormatError, SEVEN_ZIP,
};
