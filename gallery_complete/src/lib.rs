//! Gallery pipeline
//!
//! Drives one pack, or every pack of a folder, through the stand-alone
//! tools in order: source conversion, image resize, animation resize,
//! final transcode, archiving and cleanup. Each stage is a child process
//! talking to the next one through the pack's folder layout.

pub mod config;
pub mod pipeline;
pub mod stage;

pub use config::{Model, PipelineConfig, SourceFormat, TargetFormat};
pub use pipeline::{list_packs, Pipeline, PipelineReport, StageRecord, StageStatus};
pub use stage::{ProcessStageRunner, Stage, StageError, StageRunner};
