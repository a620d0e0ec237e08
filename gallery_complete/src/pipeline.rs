//! Pack orchestration
//!
//! Stages run in a fixed order and are not transactional: a failed stage
//! is recorded and the next one still runs against whatever is on disk.

use crate::config::{PipelineConfig, SourceFormat};
use crate::stage::{Stage, StageError, StageRunner};
use batch_compress::{archive_command, archive_path, ArchiveFormat};
use console::style;
use shared_utils::{
    collect_files, list_folders, rebase_path, replace_ext, sibling_with_suffix,
    ANIMATION_EXTENSIONS,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use task_engine::{probe_dimensions, CancelToken, SystemRunner, ToolCommand, ToolRunner};

pub const BATCH_RESIZE: &str = "batch-resize";
pub const BATCH_CONVERT: &str = "batch-convert";
pub const UPSCALE_ANI: &str = "UpscaleAni";
pub const SEVEN_ZIP: &str = batch_compress::SEVEN_ZIP;

const RESIZED_SUFFIX: &str = "_resized";
const TRANSCODED_SUFFIX: &str = "_transcoded";
const JXL_SUFFIX: &str = "_jxl";
const ANIMATION_BOUND: u32 = 900;

const PACK_PATTERNS: &[&str] = &["*.mp4", "*.webp", "*.gif", "*.jxl"];
const TRANSCODED_PATTERNS: &[&str] = &["*.avif", "*.webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Done,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub pack: PathBuf,
    pub stages: Vec<StageRecord>,
}

impl PipelineReport {
    pub fn new(pack: impl Into<PathBuf>) -> Self {
        Self {
            pack: pack.into(),
            stages: Vec::new(),
        }
    }

    fn record(&mut self, stage: Stage, status: StageStatus) {
        self.stages.push(StageRecord { stage, status });
    }

    pub fn status(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.status)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageRecord> {
        self.stages
            .iter()
            .filter(|r| matches!(r.status, StageStatus::Failed(_)))
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// The packs to process: the input itself in single mode, otherwise its
/// immediate sub-folders by name, leaving out stage folders of earlier runs.
pub fn list_packs(config: &PipelineConfig) -> io::Result<Vec<PathBuf>> {
    if config.single {
        return Ok(vec![config.input.clone()]);
    }
    Ok(list_folders(&config.input)?
        .into_iter()
        .filter(|dir| {
            let name = dir.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            let stage_dir = [RESIZED_SUFFIX, TRANSCODED_SUFFIX, JXL_SUFFIX]
                .iter()
                .any(|suffix| name.ends_with(suffix));
            if stage_dir {
                tracing::warn!(dir = %dir.display(), "Skipping folder named like a stage folder");
            }
            !stage_dir
        })
        .collect())
}

pub struct Pipeline {
    config: PipelineConfig,
    runner: Box<dyn StageRunner>,
    probe_runner: Arc<dyn ToolRunner>,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, runner: impl StageRunner + 'static, cancel: CancelToken) -> Self {
        Self {
            config,
            runner: Box::new(runner),
            probe_runner: Arc::new(SystemRunner::new()),
            cancel,
        }
    }

    /// Runner for the ffprobe calls that size animations without a readable header.
    pub fn with_probe_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.probe_runner = runner;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Every pack in order; stops between packs once cancelled.
    pub fn run(&self, mut on_pack: impl FnMut(&PipelineReport)) -> io::Result<Vec<PipelineReport>> {
        let packs = list_packs(&self.config)?;
        let mut reports = Vec::with_capacity(packs.len());
        for pack in packs {
            if self.cancel.is_cancelled() {
                break;
            }
            let report = self.process_pack(&pack);
            on_pack(&report);
            reports.push(report);
        }
        Ok(reports)
    }

    pub fn process_pack(&self, pack: &Path) -> PipelineReport {
        let resized = sibling_with_suffix(pack, RESIZED_SUFFIX);
        let transcoded = sibling_with_suffix(pack, TRANSCODED_SUFFIX);
        let source = self.config.source_format;
        let mut report = PipelineReport::new(pack);

        println!("\n{}", style(format!("━━━ {} ━━━", pack.display())).cyan().bold());
        tracing::info!(pack = %pack.display(), "Processing pack");

        match source {
            SourceFormat::Jxl => self.stage(&mut report, Stage::ConvertSource, || {
                println!("Decode JXL to PNG");
                self.convert(pack, pack, "djxl", false)
            }),
            SourceFormat::Png => self.stage(&mut report, Stage::ConvertSource, || {
                println!("Encode to JXL");
                self.convert(pack, pack, "cjxl", false)
            }),
            SourceFormat::Webp => self.skip(
                &mut report,
                Stage::ConvertSource,
                "source is lossy webp, converting to jxl brings no size benefit",
            ),
        }

        self.stage(&mut report, Stage::Resize, || self.resize(pack, &resized));
        self.stage(&mut report, Stage::ResizeAnimations, || {
            self.resize_animations(pack, &transcoded)
        });
        self.stage(&mut report, Stage::Transcode, || {
            self.convert(
                &resized,
                &transcoded,
                self.config.target_format.convert_format(),
                true,
            )
        });

        if !self.config.single {
            if source == SourceFormat::Jxl {
                self.skip(&mut report, Stage::ArchivePack, "jxl source is kept as is");
            } else {
                self.stage(&mut report, Stage::ArchivePack, || {
                    self.archive(pack, pack, ArchiveFormat::SevenZip, PACK_PATTERNS)
                });
            }
            self.stage(&mut report, Stage::ArchiveTranscoded, || {
                self.archive(&transcoded, pack, ArchiveFormat::Zip, TRANSCODED_PATTERNS)
            });
        } else if source == SourceFormat::Jxl {
            self.skip(&mut report, Stage::MoveJxl, "jxl source is kept as is");
        } else {
            self.stage(&mut report, Stage::MoveJxl, || self.move_jxl(pack));
        }

        self.stage(&mut report, Stage::Cleanup, || {
            remove_dir_if_present(&resized)?;
            if !self.config.single {
                remove_dir_if_present(&transcoded)?;
            }
            Ok(())
        });

        report
    }

    fn stage(
        &self,
        report: &mut PipelineReport,
        stage: Stage,
        body: impl FnOnce() -> Result<(), StageError>,
    ) {
        println!("\n{}", style(stage.label()).green());
        let result = if self.cancel.is_cancelled() {
            Err(StageError::Cancelled)
        } else {
            body()
        };
        match result {
            Ok(()) => {
                tracing::info!(pack = %report.pack.display(), stage = %stage, "Stage done");
                report.record(stage, StageStatus::Done);
            }
            Err(e) => {
                tracing::error!(pack = %report.pack.display(), stage = %stage, error = %e, "Stage failed");
                eprintln!("{} {}", style("==> Error:").red(), e);
                report.record(stage, StageStatus::Failed(e.to_string()));
            }
        }
    }

    fn skip(&self, report: &mut PipelineReport, stage: Stage, reason: &str) {
        println!("\n{} {}", style(stage.label()).green(), style(format!("skipped: {}", reason)).dim());
        tracing::info!(pack = %report.pack.display(), stage = %stage, reason, "Stage skipped");
        report.record(stage, StageStatus::Skipped(reason.to_string()));
    }

    fn exec(&self, cmd: &ToolCommand) -> Result<(), StageError> {
        self.runner.run(cmd, &self.cancel)
    }

    fn convert(&self, input: &Path, output: &Path, format: &str, log: bool) -> Result<(), StageError> {
        let mut cmd = ToolCommand::new(BATCH_CONVERT)
            .arg("--input")
            .path(input)
            .arg("--output")
            .path(output)
            .args(["--format", format]);
        if log {
            cmd = cmd.arg("--log");
        }
        self.exec(&cmd)
    }

    fn resize(&self, pack: &Path, resized: &Path) -> Result<(), StageError> {
        create_dir(resized)?;
        let mut cmd = ToolCommand::new(BATCH_RESIZE)
            .arg("--input")
            .path(pack)
            .arg("--output")
            .path(resized)
            .arg("--threads")
            .arg(self.config.resize_threads.to_string())
            .arg("--target-size")
            .arg(self.config.target_size.to_string())
            .arg("--model")
            .arg(self.config.model.model_name())
            .arg("--log");
        if self.config.force_upscale {
            cmd = cmd.arg("--srgan");
        }
        self.exec(&cmd)
    }

    /// Animations skip the resize folder and land in `transcoded` as webp.
    fn resize_animations(&self, pack: &Path, transcoded: &Path) -> Result<(), StageError> {
        create_dir(transcoded)?;
        let files = collect_files(pack, ANIMATION_EXTENSIONS, true);
        let mut failed = 0;
        for file in &files {
            let output = replace_ext(&rebase_path(file, pack, transcoded), "webp");
            if let Some(parent) = output.parent() {
                create_dir(parent)?;
            }
            let mut cmd = ToolCommand::new(UPSCALE_ANI)
                .arg("-i")
                .path(file)
                .arg("-o")
                .path(&output)
                .arg("-cleanup")
                .arg("-max")
                .arg(self.animation_bound(file));
            if self.config.force_upscale {
                cmd = cmd.arg("-force");
            }
            println!("==> {}", file.display());
            match self.exec(&cmd) {
                Ok(()) => {}
                Err(StageError::Cancelled) => return Err(StageError::Cancelled),
                Err(e) => {
                    failed += 1;
                    eprintln!("{} {}", style("==> Error:").red(), e);
                    tracing::warn!(file = %file.display(), error = %e, "Animation failed");
                }
            }
        }
        if failed > 0 {
            return Err(StageError::Items {
                failed,
                total: files.len(),
            });
        }
        Ok(())
    }

    /// `folder` packed into `<pack><ext>` beside the pack.
    fn archive(
        &self,
        folder: &Path,
        pack: &Path,
        format: ArchiveFormat,
        patterns: &[&str],
    ) -> Result<(), StageError> {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        let archive = archive_path(pack, format);
        self.exec(&archive_command(folder, &archive, format, &patterns))?;
        println!("==> {}", archive.display());
        Ok(())
    }

    fn move_jxl(&self, pack: &Path) -> Result<(), StageError> {
        let jxl_dir = sibling_with_suffix(pack, JXL_SUFFIX);
        create_dir(&jxl_dir)?;
        let files = collect_files(pack, &["jxl"], true);
        let mut failed = 0;
        for file in &files {
            let dest = rebase_path(file, pack, &jxl_dir);
            let moved = dest
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| fs::rename(file, &dest));
            if let Err(e) = moved {
                failed += 1;
                tracing::warn!(file = %file.display(), error = %e, "Failed to move jxl file");
            }
        }
        if failed > 0 {
            return Err(StageError::Items {
                failed,
                total: files.len(),
            });
        }
        Ok(())
    }

    /// `w900` for landscape animations, `h900` otherwise or when unknown.
    fn animation_bound(&self, file: &Path) -> String {
        match probe_dimensions(file, self.probe_runner.as_ref(), &self.cancel) {
            Ok(dims) if dims.is_landscape() => format!("w{}", ANIMATION_BOUND),
            Ok(_) => format!("h{}", ANIMATION_BOUND),
            Err(e) => {
                tracing::debug!(file = %file.display(), error = %e, "Unknown animation size");
                format!("h{}", ANIMATION_BOUND)
            }
        }
    }
}

fn create_dir(dir: &Path) -> Result<(), StageError> {
    fs::create_dir_all(dir)
        .map_err(|e| StageError::io(format!("can't create '{}'", dir.display()), e))
}

fn remove_dir_if_present(dir: &Path) -> Result<(), StageError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StageError::io(format!("can't remove '{}'", dir.display()), e)),
    }
}
