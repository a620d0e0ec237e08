use std::path::PathBuf;
use task_engine::{ProbeError, TaskError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("invalid target size '{0}': expected w<N>, h<N>, r<N> or <N>")]
    InvalidSpec(String),

    #[error("unsupported upscale ratio {0}: realesrgan accepts 2, 3 or 4")]
    InvalidRatio(u32),

    #[error("{} is not a valid image", .0.display())]
    InvalidImage(PathBuf),

    #[error("can't read dimensions of '{}': {source}", .path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: ProbeError,
    },

    #[error(transparent)]
    Task(#[from] TaskError),
}

impl From<ResizeError> for TaskError {
    fn from(error: ResizeError) -> Self {
        match error {
            ResizeError::Task(inner) => inner,
            ResizeError::Probe { source, .. } if source.is_cancelled() => TaskError::Cancelled,
            other => TaskError::other(other),
        }
    }
}
