//! Per-file resize as an engine executor
//!
//! One work item is one image. The output mirrors the input's relative
//! path under the output root with a `.png` extension. An intermediate
//! `<output>.upscaled.png` carries the upscaled (or verbatim copied) image between
//! the two passes and never outlives the item.

use crate::error::ResizeError;
use crate::plan::plan_resize;
use crate::target::{ResizeMode, ResizeSpec, DEFAULT_MODEL};
use shared_utils::{
    collect_files, file_size, has_extension, rebase_path, replace_ext, BatchStats,
    RESIZE_EXTENSIONS,
};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use task_engine::{
    probe_dimensions, verify_output_created, ItemScope, TaskError, TaskExecutor, ToolCommand,
    WorkItem,
};

pub const UPSCALER: &str = "realesrgan-ncnn-vulkan";
pub const FFMPEG: &str = "ffmpeg";

const NAME: &str = "batch-resize";
const INTERMEDIATE_SUFFIX: &str = ".upscaled.png";

#[derive(Debug, Clone)]
pub struct ResizeConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub spec: ResizeSpec,
    /// Run the upscaler even when the source already reaches the target.
    pub force_upscale: bool,
    pub model: String,
}

impl ResizeConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            spec: ResizeSpec::default(),
            force_upscale: false,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_spec(mut self, spec: ResizeSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn with_force_upscale(mut self, force: bool) -> Self {
        self.force_upscale = force;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Every resizable image under the input root, recursively, leaving out
    /// anything already under the output root.
    pub fn collect_inputs(&self) -> Vec<PathBuf> {
        collect_files(&self.input, RESIZE_EXTENSIONS, true)
            .into_iter()
            .filter(|p| !p.starts_with(&self.output))
            .collect()
    }
}

/// `<output root>/<relative path of input>.png`
pub fn output_path_for(input: &Path, input_root: &Path, output_root: &Path) -> PathBuf {
    replace_ext(&rebase_path(input, input_root, output_root), "png")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeOutcome {
    Written(PathBuf),
    /// The output was already there; nothing ran.
    Skipped(PathBuf),
}

/// Removes the intermediate file when dropped.
struct Intermediate(PathBuf);

impl Intermediate {
    fn for_output(output: &Path) -> Self {
        let mut name = OsString::from(output.as_os_str());
        name.push(INTERMEDIATE_SUFFIX);
        Self(PathBuf::from(name))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for Intermediate {
    fn drop(&mut self) {
        match fs::remove_file(&self.0) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.0.display(),
                error = %e,
                "Failed to remove intermediate file"
            ),
        }
    }
}

pub struct ResizeExecutor {
    config: ResizeConfig,
    stats: Arc<BatchStats>,
}

impl ResizeExecutor {
    pub fn new(config: ResizeConfig) -> Self {
        Self {
            config,
            stats: Arc::new(BatchStats::new()),
        }
    }

    pub fn config(&self) -> &ResizeConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<BatchStats> {
        Arc::clone(&self.stats)
    }

    pub fn resize_file(
        &self,
        input: &Path,
        scope: &ItemScope<'_>,
    ) -> Result<ResizeOutcome, ResizeError> {
        let output = output_path_for(input, &self.config.input, &self.config.output);
        match output.try_exists() {
            Ok(true) => return Ok(ResizeOutcome::Skipped(output)),
            Ok(false) => {}
            Err(source) => return Err(TaskError::OutputCheck { path: output, source }.into()),
        }
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                TaskError::io(format!("can't create directory '{}'", parent.display()), e)
            })?;
        }

        let spec = &self.config.spec;
        if spec.mode == ResizeMode::Ratio {
            tracing::debug!(input = %input.display(), ratio = spec.target, "Direct upscale");
            self.upscale(input, &output, spec.target, scope)?;
            verify_output_created(&output)?;
            return Ok(ResizeOutcome::Written(output));
        }

        let dims = probe_dimensions(input, scope.runner, scope.cancel).map_err(|source| {
            ResizeError::Probe {
                path: input.to_path_buf(),
                source,
            }
        })?;
        let plan = plan_resize(input, spec, dims, self.config.force_upscale, &self.config.model)?;
        tracing::debug!(
            input = %input.display(),
            source_size = plan.source_size,
            target = plan.target,
            ratio = plan.ratio,
            upscale = plan.upscale,
            downscale = plan.downscale,
            "Resize plan"
        );

        let intermediate = Intermediate::for_output(&output);
        if plan.upscale {
            self.upscale(input, intermediate.path(), plan.ratio, scope)?;
        } else {
            // Verbatim; ffmpeg reads the content, not the name.
            fs::copy(input, intermediate.path()).map_err(|e| {
                TaskError::io(format!("can't copy '{}'", input.display()), e)
            })?;
        }
        verify_output_created(intermediate.path())?;

        if plan.downscale {
            let cmd = ToolCommand::new(FFMPEG)
                .arg("-i")
                .path(intermediate.path())
                .args(["-q:v", "2", "-vf"])
                .arg(plan.bound.scale_filter(plan.target))
                .path(&output);
            scope.run_tool(FFMPEG, &cmd)?;
        } else {
            fs::rename(intermediate.path(), &output).map_err(|e| {
                TaskError::io(
                    format!("can't move '{}' into place", intermediate.path().display()),
                    e,
                )
            })?;
        }
        verify_output_created(&output)?;
        Ok(ResizeOutcome::Written(output))
    }

    fn upscale(
        &self,
        input: &Path,
        output: &Path,
        ratio: u32,
        scope: &ItemScope<'_>,
    ) -> Result<(), TaskError> {
        let cmd = ToolCommand::new(UPSCALER)
            .arg("-i")
            .path(input)
            .arg("-o")
            .path(output)
            .arg("-s")
            .arg(ratio.to_string())
            .arg("-n")
            .arg(&self.config.model);
        scope.run_tool(UPSCALER, &cmd).map(|_| ())
    }
}

impl TaskExecutor for ResizeExecutor {
    fn name(&self) -> &str {
        NAME
    }

    fn is_eligible(&self, path: &Path) -> bool {
        has_extension(path, RESIZE_EXTENSIONS)
    }

    fn empty_label(&self) -> &'static str {
        "png, jpg, jpeg or webp"
    }

    /// Existing outputs are skipped per item rather than aborting the batch.
    fn preflight(&self, _inputs: &[PathBuf], _eligible: &[PathBuf]) -> Vec<TaskError> {
        Vec::new()
    }

    fn process(&self, item: &WorkItem, scope: &ItemScope<'_>) -> Result<(), TaskError> {
        match self.resize_file(&item.input, scope) {
            Ok(ResizeOutcome::Written(output)) => {
                self.stats
                    .record_success(file_size(&item.input), file_size(&output));
                Ok(())
            }
            Ok(ResizeOutcome::Skipped(output)) => {
                self.stats.record_skip();
                scope.warn(NAME, &TaskError::OutputExists(output));
                Ok(())
            }
            Err(e) => {
                let e = TaskError::from(e);
                if !e.is_cancelled() {
                    self.stats.record_failure(item.input.clone(), e.to_string());
                }
                Err(e)
            }
        }
    }
}
