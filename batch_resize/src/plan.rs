//! Ratio and pass selection for one image
//!
//! Pure: takes the parsed target and the measured dimensions, decides which
//! axis bounds the image, the upscale ratio, and which passes run.

use crate::error::ResizeError;
use crate::target::{ResizeMode, ResizeSpec, DETAIL_MODEL};
use task_engine::Dimensions;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Width,
    Height,
}

impl Bound {
    /// ffmpeg `-vf` value limiting this axis to `target`, keeping aspect.
    pub fn scale_filter(self, target: u32) -> String {
        match self {
            Bound::Width => format!("scale='min({},iw)':-1", target),
            Bound::Height => format!("scale=-1:'min({},ih)'", target),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub bound: Bound,
    pub source_size: u32,
    pub target: u32,
    pub ratio: u32,
    /// Run the upscaler; otherwise the source is copied as is.
    pub upscale: bool,
    /// Bound the intermediate with ffmpeg; otherwise it becomes the output.
    pub downscale: bool,
}

/// 3 when 3x reaches `target`, else 4 when 4x does, else 2.
pub fn select_ratio(source_size: u32, target: u32) -> u32 {
    let source = u64::from(source_size);
    let target = u64::from(target);
    if source * 3 >= target {
        3
    } else if source * 4 >= target {
        4
    } else {
        2
    }
}

/// Plan a bounded resize. `ResizeMode::Ratio` has no plan: it is a direct
/// upscale and never inspects dimensions.
pub fn plan_resize(
    input: &Path,
    spec: &ResizeSpec,
    dims: Dimensions,
    force_upscale: bool,
    model: &str,
) -> Result<ResizePlan, ResizeError> {
    if dims.is_empty() {
        return Err(ResizeError::InvalidImage(input.to_path_buf()));
    }

    let bound = match spec.mode {
        ResizeMode::Width => Bound::Width,
        ResizeMode::Height => Bound::Height,
        ResizeMode::Auto | ResizeMode::Ratio => {
            if dims.width >= dims.height {
                Bound::Width
            } else {
                Bound::Height
            }
        }
    };
    let source_size = match bound {
        Bound::Width => dims.width,
        Bound::Height => dims.height,
    };
    let target = spec.target;

    let ratio = if model == DETAIL_MODEL {
        4
    } else {
        select_ratio(source_size, target)
    };

    Ok(ResizePlan {
        bound,
        source_size,
        target,
        ratio,
        upscale: force_upscale || source_size < target,
        downscale: !spec.disables_downscale()
            && u64::from(source_size) * u64::from(ratio) > u64::from(target),
    })
}
