//! Subprocess log
//!
//! Plain-text file in the working directory that receives every external tool
//! invocation: command line, exit status and combined output. One file per
//! run, shared by all workers.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Debug)]
pub struct ToolLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ToolLog {
    /// Create `<dir>/<program>_<YYYY-MM-DD-HH-MM-SS>.log`.
    pub fn create(dir: &Path, program: &str) -> Result<Self> {
        let name = format!(
            "{}_{}.log",
            program,
            chrono::Local::now().format(TIMESTAMP_FORMAT)
        );
        Self::create_at(dir.join(name))
    }

    pub fn create_at(path: PathBuf) -> Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one invocation record. Write errors are traced, never returned:
    /// a broken log file must not fail the batch.
    pub fn append_invocation(&self, command_line: &str, exit_code: Option<i32>, output: &str) {
        let status = match exit_code {
            Some(code) => code.to_string(),
            None => "terminated".to_string(),
        };
        let record = format!(
            "$ {}\n[exit: {}]\n{}{}\n",
            command_line,
            status,
            output,
            if output.ends_with('\n') || output.is_empty() { "" } else { "\n" }
        );
        self.write_all(record.as_bytes());
    }

    pub fn append_line(&self, line: &str) {
        self.write_all(format!("{}\n", line).as_bytes());
    }

    fn write_all(&self, bytes: &[u8]) {
        let Ok(mut file) = self.file.lock() else {
            tracing::warn!(path = %self.path.display(), "Subprocess log lock poisoned");
            return;
        };
        if let Err(e) = file.write_all(bytes) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write subprocess log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_create_uses_timestamped_name() {
        let temp = TempDir::new().unwrap();
        let log = ToolLog::create(temp.path(), "BatchResize").unwrap();

        let name = log.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("BatchResize_"));
        assert!(name.ends_with(".log"));
        // BatchResize_ + 19 timestamp chars + .log
        assert_eq!(name.len(), "BatchResize_".len() + 19 + ".log".len());
        assert!(log.path().exists());
    }

    #[test]
    fn test_append_invocation_format() {
        let temp = TempDir::new().unwrap();
        let log = ToolLog::create_at(temp.path().join("t.log")).unwrap();
        log.append_invocation("cjxl a.png a.jxl", Some(0), "done");
        log.append_invocation("djxl x.jxl x.jpg", None, "");

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            text,
            "$ cjxl a.png a.jxl\n[exit: 0]\ndone\n\n$ djxl x.jxl x.jpg\n[exit: terminated]\n\n"
        );
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(ToolLog::create_at(temp.path().join("c.log")).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        log.append_line(&format!("worker-{}-line", i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().count(), 200);
        assert!(text.lines().all(|l| l.starts_with("worker-") && l.ends_with("-line")));
    }
}
