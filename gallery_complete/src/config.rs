//! Pipeline options.

use batch_resize::{ResizeMode, ResizeSpec, DEFAULT_MODEL, DETAIL_MODEL};
use clap::ValueEnum;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_TARGET_SIZE: ResizeSpec = ResizeSpec {
    mode: ResizeMode::Width,
    target: 2000,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jxl,
    Webp,
    /// Also covers jpg.
    Png,
}

impl SourceFormat {
    /// Unknown names fall back to png; the second value is the warning to show.
    pub fn parse_lenient(s: &str) -> (Self, Option<String>) {
        match s.trim().to_ascii_lowercase().as_str() {
            "jxl" => (SourceFormat::Jxl, None),
            "webp" => (SourceFormat::Webp, None),
            "png" => (SourceFormat::Png, None),
            _ => (
                SourceFormat::Png,
                Some(format!(
                    "Source format must be 'jxl', 'webp' or 'png', got '{}'; using png",
                    s
                )),
            ),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceFormat::Jxl => "jxl",
            SourceFormat::Webp => "webp",
            SourceFormat::Png => "png",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetFormat {
    Avif,
    Webp,
}

impl TargetFormat {
    /// Value for `batch-convert --format`.
    pub fn convert_format(self) -> &'static str {
        match self {
            TargetFormat::Avif => "avif",
            TargetFormat::Webp => "webp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Model {
    Fast,
    Details,
}

impl Model {
    pub fn model_name(self) -> &'static str {
        match self {
            Model::Fast => DEFAULT_MODEL,
            Model::Details => DETAIL_MODEL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub source_format: SourceFormat,
    pub target_format: TargetFormat,
    pub target_size: ResizeSpec,
    pub force_upscale: bool,
    /// The input folder is the pack instead of a folder of packs.
    pub single: bool,
    pub model: Model,
    pub resize_threads: usize,
}

impl PipelineConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            source_format: SourceFormat::Png,
            target_format: TargetFormat::Webp,
            target_size: DEFAULT_TARGET_SIZE,
            force_upscale: false,
            single: false,
            model: Model::Fast,
            resize_threads: 4,
        }
    }
}
