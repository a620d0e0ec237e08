//! Per-file conversion as an engine executor

use crate::formats::OutputFormat;
use shared_utils::{
    collect_files, file_size, has_extension, rebase_path, replace_ext, strip_ext, BatchStats,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use task_engine::{verify_output_created, ItemScope, TaskError, TaskExecutor, WorkItem};

const NAME: &str = "batch-convert";

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
}

impl ConvertConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            format,
        }
    }

    /// `output_<format>` next to the working directory.
    pub fn default_output(format: OutputFormat) -> PathBuf {
        PathBuf::from(format!("output_{}", format.name()))
    }

    /// Input files, leaving out anything under the output folder when that
    /// folder sits inside the input tree.
    pub fn collect_inputs(&self) -> Vec<PathBuf> {
        let output = fs::canonicalize(&self.output).unwrap_or_else(|_| self.output.clone());
        collect_files(&self.input, self.format.input_extensions(), true)
            .into_iter()
            .filter(|file| {
                let inside = file.starts_with(&self.output)
                    || fs::canonicalize(file).is_ok_and(|f| f.starts_with(&output));
                if inside {
                    tracing::debug!(file = %file.display(), "Skipping file in output folder");
                }
                !inside
            })
            .collect()
    }

    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        replace_ext(
            &rebase_path(input, &self.input, &self.output),
            self.format.output_extension(),
        )
    }
}

/// Every input sharing its path-without-extension with another input,
/// grouped in path order.
pub fn find_duplicate_stems(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut by_stem: BTreeMap<PathBuf, Vec<&PathBuf>> = BTreeMap::new();
    for file in files {
        by_stem.entry(strip_ext(file)).or_default().push(file);
    }
    by_stem
        .into_values()
        .filter(|group| group.len() > 1)
        .flatten()
        .cloned()
        .collect()
}

pub struct ConvertExecutor {
    config: ConvertConfig,
    stats: Arc<BatchStats>,
}

impl ConvertExecutor {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            stats: Arc::new(BatchStats::new()),
        }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<BatchStats> {
        Arc::clone(&self.stats)
    }

    /// `Ok(false)` when the output already exists and nothing ran.
    fn convert(&self, input: &Path, output: &Path, scope: &ItemScope<'_>) -> Result<bool, TaskError> {
        let present = output.try_exists().map_err(|source| TaskError::OutputCheck {
            path: output.to_path_buf(),
            source,
        })?;
        if present {
            return Ok(false);
        }
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                TaskError::io(format!("can't create directory '{}'", parent.display()), e)
            })?;
        }
        let cmd = self.config.format.command(input, output);
        scope.run_tool(&cmd.program, &cmd)?;
        verify_output_created(output)?;
        Ok(true)
    }
}

impl TaskExecutor for ConvertExecutor {
    fn name(&self) -> &str {
        NAME
    }

    fn is_eligible(&self, path: &Path) -> bool {
        has_extension(path, self.config.format.input_extensions())
    }

    fn empty_label(&self) -> &'static str {
        self.config.format.empty_label()
    }

    fn preflight(&self, _inputs: &[PathBuf], eligible: &[PathBuf]) -> Vec<TaskError> {
        find_duplicate_stems(eligible)
            .into_iter()
            .map(TaskError::DuplicateOutput)
            .collect()
    }

    fn process(&self, item: &WorkItem, scope: &ItemScope<'_>) -> Result<(), TaskError> {
        let output = self.config.output_path_for(&item.input);
        match self.convert(&item.input, &output, scope) {
            Ok(true) => {
                self.stats
                    .record_success(file_size(&item.input), file_size(&output));
                Ok(())
            }
            Ok(false) => {
                self.stats.record_skip();
                scope.warn(NAME, &TaskError::OutputExists(output));
                Ok(())
            }
            Err(e) => {
                if !e.is_cancelled() {
                    self.stats.record_failure(item.input.clone(), e.to_string());
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use task_engine::{
        event_channel, run_executor, CancelToken, EngineContext, TaskEvent, ToolCommand,
        ToolOutput, ToolRunner,
    };
    use tempfile::TempDir;

    /// Writes the output unless an argument's file name contains "bad".
    #[derive(Default)]
    struct FakeEncoder {
        calls: Mutex<Vec<ToolCommand>>,
    }

    impl ToolRunner for FakeEncoder {
        fn run(&self, cmd: &ToolCommand, _cancel: &CancelToken) -> Result<ToolOutput, TaskError> {
            self.calls.lock().unwrap().push(cmd.clone());
            let bad = cmd.args.iter().any(|a| {
                Path::new(a)
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().contains("bad"))
            });
            if bad {
                return Ok(ToolOutput::failure(1, "Invalid data found when processing input"));
            }
            let output = match cmd.program.as_str() {
                "cjxl" | "djxl" | "avifenc" => PathBuf::from(&cmd.args[1]),
                _ => PathBuf::from(cmd.args.last().unwrap()),
            };
            fs::write(output, b"encoded").unwrap();
            Ok(ToolOutput::success(""))
        }
    }

    fn context(runner: Arc<FakeEncoder>) -> (EngineContext, std::sync::mpsc::Receiver<TaskEvent>) {
        let (events, rx) = event_channel();
        (
            EngineContext {
                runner,
                events,
                cancel: CancelToken::new(),
                threads: 4,
            },
            rx,
        )
    }

    #[test]
    fn test_find_duplicate_stems_lists_every_member() {
        let files = vec![
            PathBuf::from("in/a.jpg"),
            PathBuf::from("in/b.png"),
            PathBuf::from("in/a.png"),
            PathBuf::from("in/sub/b.png"),
            PathBuf::from("in/a.webp"),
        ];
        assert_eq!(
            find_duplicate_stems(&files),
            vec![
                PathBuf::from("in/a.jpg"),
                PathBuf::from("in/a.png"),
                PathBuf::from("in/a.webp"),
            ]
        );
    }

    #[test]
    fn test_output_path_mirrors_layout() {
        let config = ConvertConfig::new("in", "out", OutputFormat::Cjxl);
        assert_eq!(
            config.output_path_for(Path::new("in/sub/a.png")),
            PathBuf::from("out/sub/a.jxl")
        );
        assert_eq!(
            ConvertConfig::default_output(OutputFormat::Webp),
            PathBuf::from("output_webp")
        );
    }

    #[test]
    fn test_converts_tree_and_accumulates_sizes() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in");
        let output = temp.path().join("out");
        fs::create_dir_all(input.join("sub")).unwrap();
        fs::write(input.join("a.png"), b"0123456789").unwrap();
        fs::write(input.join("sub/b.jpg"), b"01234").unwrap();
        fs::write(input.join("notes.txt"), b"x").unwrap();

        let executor = Arc::new(ConvertExecutor::new(ConvertConfig::new(
            &input,
            &output,
            OutputFormat::Cjxl,
        )));
        let stats = executor.stats();
        let files = executor.config().collect_inputs();
        let runner = Arc::new(FakeEncoder::default());
        let (ctx, _rx) = context(Arc::clone(&runner));

        let outcome = run_executor(executor, files, &ctx);

        assert!(outcome.is_clean());
        assert_eq!(outcome.eligible, 2);
        assert!(output.join("a.jxl").exists());
        assert!(output.join("sub/b.jxl").exists());
        assert_eq!(stats.input_bytes(), 15);
        assert_eq!(stats.output_bytes(), 14);
        assert_eq!(runner.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_output_nested_in_input_is_not_reconverted() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in");
        let output = input.join("output_webp");
        fs::create_dir_all(&output).unwrap();
        fs::write(input.join("a.png"), b"x").unwrap();
        fs::write(output.join("old.webp"), b"x").unwrap();
        fs::write(output.join("old.gif"), b"x").unwrap();

        let config = ConvertConfig::new(&input, &output, OutputFormat::Webp);
        assert_eq!(config.collect_inputs(), vec![input.join("a.png")]);

        let dotted = ConvertConfig::new(input.join("."), &output, OutputFormat::Webp);
        let files = dotted.collect_inputs();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.png"));
    }

    #[test]
    fn test_duplicates_abort_before_any_tool() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("a.png"), b"x").unwrap();
        fs::write(input.join("a.jpg"), b"x").unwrap();
        fs::write(input.join("c.png"), b"x").unwrap();

        let executor = Arc::new(ConvertExecutor::new(ConvertConfig::new(
            &input,
            temp.path().join("out"),
            OutputFormat::Webp,
        )));
        let files = executor.config().collect_inputs();
        let runner = Arc::new(FakeEncoder::default());
        let (ctx, rx) = context(Arc::clone(&runner));

        let outcome = run_executor(executor, files, &ctx);

        assert!(outcome.aborted);
        assert_eq!(outcome.warnings, 2);
        assert!(runner.calls.lock().unwrap().is_empty());
        let messages: Vec<String> = rx
            .try_iter()
            .filter_map(|e| match e {
                TaskEvent::Warning(w) => Some(w.message),
                _ => None,
            })
            .collect();
        assert!(messages[0].contains("a.jpg"));
        assert!(messages[1].contains("a.png"));
    }

    #[test]
    fn test_existing_output_skipped_and_failures_listed() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in");
        let output = temp.path().join("out");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();
        fs::write(input.join("done.png"), b"x").unwrap();
        fs::write(output.join("done.webp"), b"x").unwrap();
        fs::write(input.join("bad.gif"), b"x").unwrap();
        fs::write(input.join("ok.mp4"), b"x").unwrap();

        let executor = Arc::new(ConvertExecutor::new(ConvertConfig::new(
            &input,
            &output,
            OutputFormat::Webp,
        )));
        let stats = executor.stats();
        let files = executor.config().collect_inputs();
        let (ctx, _rx) = context(Arc::new(FakeEncoder::default()));

        let outcome = run_executor(executor, files, &ctx);

        assert_eq!(outcome.warnings, 2);
        let result = stats.to_result();
        assert_eq!((result.succeeded, result.skipped, result.failed), (1, 1, 1));
        assert_eq!(result.errors[0].0, input.join("bad.gif"));
        assert_eq!(
            result.errors[0].1,
            "ffmpeg error: Invalid data found when processing input"
        );
        assert_eq!(fs::read(output.join("done.webp")).unwrap(), b"x");
    }
}
