//! Shared Utilities for the gallery preprocessing tools
//!
//! This crate provides common functionality shared across gallery-tasks,
//! batch-resize, batch-convert, batch-compress and gallery-complete:
//! - Logging (tracing subscriber + timestamped subprocess log)
//! - Directory listing provider
//! - Extension / path helpers
//! - External tools detection
//! - Progress line rendering and batch reporting
//! - Worker pool sizing

pub mod batch;
pub mod common_utils;
pub mod logging;
pub mod path_safety;
pub mod progress;
pub mod report;
pub mod thread_manager;
pub mod tool_log;
pub mod tools;

pub use batch::{collect_files, list_folders, ANIMATION_EXTENSIONS, RESIZE_EXTENSIONS};
pub use common_utils::{
    file_size, get_extension_lowercase, has_extension, rebase_path, replace_ext,
    sibling_with_suffix, strip_ext,
};
pub use path_safety::safe_path_arg;
pub use thread_manager::{resolve_threads, DEFAULT_BATCH_THREADS, DEFAULT_TASK_THREADS};
pub use progress::{create_progress_bar, format_bytes, format_duration, render_progress_line};
pub use report::{print_summary_report, BatchResult, BatchStats};
pub use tool_log::ToolLog;
pub use tools::{is_command_available, missing_tools};
