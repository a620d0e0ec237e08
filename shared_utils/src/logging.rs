//! Logging Module
//!
//! tracing-based logging shared by every binary:
//! - daily-rolling log file in the system temp dir, plain text or JSON lines
//! - coloured stderr output (can be turned off while a progress bar owns the terminal)
//! - `RUST_LOG` overrides the default filter
//!
//! # Examples
//!
//! ```no_run
//! use shared_utils::logging::{LogConfig, init_logging};
//! use tracing::info;
//!
//! let config = LogConfig::default();
//! init_logging("batch-resize", config).expect("Failed to initialize logging");
//!
//! info!("Program started");
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose events the default filter lets through.
const WORKSPACE_TARGETS: &[&str] = &[
    "shared_utils",
    "task_engine",
    "batch_resize",
    "batch_convert",
    "batch_compress",
    "gallery_complete",
];

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Defaults to the system temp dir.
    pub log_dir: PathBuf,
    /// Log files kept per program after pruning.
    pub max_files: usize,
    pub level: Level,
    /// Mirror events to stderr.
    pub stderr: bool,
    /// One JSON object per line in the log file instead of plain text.
    pub json_file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: std::env::temp_dir(),
            max_files: 5,
            level: Level::INFO,
            stderr: true,
            json_file: false,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.log_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_stderr(mut self, stderr: bool) -> Self {
        self.stderr = stderr;
        self
    }

    pub fn with_json_file(mut self, json: bool) -> Self {
        self.json_file = json;
        self
    }
}

/// Default `EnvFilter` directive: the program plus every workspace crate at `level`.
fn default_directive(program_name: &str, level: Level) -> String {
    let program_target = program_name.replace('-', "_");
    std::iter::once(program_target.as_str())
        .chain(WORKSPACE_TARGETS.iter().copied())
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. Log file: `{program_name}.log.<date>` in `config.log_dir`.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(program_name: &str, config: LogConfig) -> Result<()> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", config.log_dir))?;

    let log_file_name = format!("{}.log", program_name);
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, &log_file_name);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(program_name, config.level)));

    let (plain_file_layer, json_file_layer) = if config.json_file {
        let layer = fmt::layer()
            .json()
            .with_writer(file_appender)
            .with_current_span(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true);
        (None, Some(layer))
    } else {
        let layer = fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true);
        (Some(layer), None)
    };

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
            .with_line_number(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(plain_file_layer)
        .with(json_file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        program = program_name,
        log_dir = ?config.log_dir,
        log_file = log_file_name,
        max_files = config.max_files,
        level = ?config.level,
        json = config.json_file,
        "Logging system initialized"
    );

    cleanup_old_logs(&config.log_dir, program_name, config.max_files)?;

    Ok(())
}

/// Keep only the `max_files` newest `{program_name}*.log*` files.
fn cleanup_old_logs(log_dir: &Path, program_name: &str, max_files: usize) -> Result<()> {
    use std::fs;

    let entries = fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory: {:?}", log_dir))?;

    let prefix = format!("{}.log", program_name);
    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let matches = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with(&prefix))
            .unwrap_or(false);
        if !matches {
            continue;
        }

        if let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) {
            log_files.push((path, modified));
        }
    }

    if log_files.len() > max_files {
        log_files.sort_by(|a, b| b.1.cmp(&a.1));

        for (path, _) in log_files.iter().skip(max_files) {
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!(path = ?path, error = %e, "Failed to remove old log file");
            } else {
                tracing::debug!(path = ?path, "Removed old log file");
            }
        }
    }

    Ok(())
}
