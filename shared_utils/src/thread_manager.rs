//! Worker pool sizing
//!
//! Every pool size goes through [`resolve_threads`]: an explicit flag wins,
//! then `GALLERY_THREADS`, then the per-tool default.

/// Pool size per task kind in `gallery-tasks`. The external encoders are
/// multi-threaded themselves.
pub const DEFAULT_TASK_THREADS: usize = 2;

/// Pool size for batch-resize and batch-convert.
pub const DEFAULT_BATCH_THREADS: usize = 4;

pub const MAX_THREADS: usize = 64;

pub const THREADS_ENV: &str = "GALLERY_THREADS";

pub fn resolve_threads(requested: Option<usize>, default: usize) -> usize {
    let from_env = std::env::var(THREADS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok());
    pick_threads(requested, from_env, default)
}

fn pick_threads(requested: Option<usize>, from_env: Option<usize>, default: usize) -> usize {
    requested
        .or(from_env)
        .unwrap_or(default)
        .clamp(1, MAX_THREADS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_threads_precedence() {
        assert_eq!(pick_threads(Some(3), Some(7), 2), 3);
        assert_eq!(pick_threads(None, Some(7), 2), 7);
        assert_eq!(pick_threads(None, None, 2), 2);
    }

    #[test]
    fn test_pick_threads_bounds() {
        assert_eq!(pick_threads(Some(0), None, 2), 1);
        assert_eq!(pick_threads(Some(10_000), None, 2), MAX_THREADS);
    }
}
