//! Image and video dimensions
//!
//! Reads width/height from the image header when the `image` crate knows the
//! format, otherwise asks ffprobe (videos, animated formats, anything exotic).
//! ffprobe goes through a [`ToolRunner`] like every other tool, so it is
//! logged and stops with the request.

use crate::cancel::CancelToken;
use crate::error::TaskError;
use crate::runner::{ToolCommand, ToolRunner};
use std::path::Path;
use thiserror::Error;

pub const FFPROBE: &str = "ffprobe";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Tool(#[from] TaskError),

    #[error("could not parse ffprobe output: {0}")]
    Parse(String),
}

impl ProbeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProbeError::Tool(e) if e.is_cancelled())
    }
}

pub fn ffprobe_command(path: &Path) -> ToolCommand {
    ToolCommand::new(FFPROBE)
        .args(["-v", "error", "-select_streams", "v:0"])
        .args(["-show_entries", "stream=width,height", "-of", "json"])
        .path(path)
}

pub fn probe_dimensions(
    path: &Path,
    runner: &dyn ToolRunner,
    cancel: &CancelToken,
) -> Result<Dimensions, ProbeError> {
    match image::image_dimensions(path) {
        Ok((width, height)) => return Ok(Dimensions::new(width, height)),
        Err(e) => tracing::debug!(path = %path.display(), error = %e, "Header probe failed, trying ffprobe"),
    }

    if cancel.is_cancelled() {
        return Err(TaskError::Cancelled.into());
    }
    let output = runner.run(&ffprobe_command(path), cancel)?.into_result(FFPROBE)?;
    parse_dimensions_json(&output)
}

/// Parse `{"streams":[{"width":W,"height":H}]}`.
pub fn parse_dimensions_json(json: &str) -> Result<Dimensions, ProbeError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| ProbeError::Parse(e.to_string()))?;
    let stream = value
        .get("streams")
        .and_then(|s| s.get(0))
        .ok_or_else(|| ProbeError::Parse("no video stream".to_string()))?;

    let field = |name: &str| -> Result<u32, ProbeError> {
        stream
            .get(name)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| ProbeError::Parse(format!("missing {}", name)))
    };

    Ok(Dimensions::new(field("width")?, field("height")?))
}
