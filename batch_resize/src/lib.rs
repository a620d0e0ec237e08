//! Batch resize
//!
//! Every image under an input folder is brought to a target size on one
//! axis: upscaled with `realesrgan-ncnn-vulkan` when it is too small, then
//! bounded with an `ffmpeg` scale filter, and written as `.png` under the
//! output folder with the same relative path.

pub mod error;
pub mod plan;
pub mod resizer;
pub mod target;

pub use error::ResizeError;
pub use plan::{plan_resize, select_ratio, Bound, ResizePlan};
pub use resizer::{output_path_for, ResizeConfig, ResizeExecutor, ResizeOutcome};
pub use target::{ResizeMode, ResizeSpec, DETAIL_MODEL, DEFAULT_MODEL};
