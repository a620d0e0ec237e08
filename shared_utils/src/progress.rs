//! Progress Module
//!
//! Terminal progress for batch runs:
//! - indicatif bar in the house style: ████████▓▓░░░░░░
//! - plain one-line renderer for log files and non-TTY output
//! - byte and duration formatting shared with the summary report

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

pub mod progress_style {
    pub const BATCH_TEMPLATE: &str = "{spinner:.green} {prefix:.cyan.bold} ▕{bar:35.green/black}▏ {percent:>3}% • {pos}/{len} • ⏱️ {elapsed_precise} (ETA: {eta}) • {msg}";
    pub const PROGRESS_CHARS: &str = "█▓░";
    pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
}

/// Batch progress bar. Hidden when stderr is not a terminal.
pub fn create_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);

    if !console::Term::stderr().is_term() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }

    let style = ProgressStyle::default_bar()
        .template(progress_style::BATCH_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(progress_style::PROGRESS_CHARS)
        .tick_chars(progress_style::SPINNER_CHARS);
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// `"<cur> / <total> [====    ] 12.50% <elapsed> / <eta> (HH:MM:SS)"`
///
/// The ETA extrapolates the average time per finished item; the last field is
/// the local wall-clock time the batch is expected to finish at.
pub fn render_progress_line(current: usize, total: usize, started: Instant, bar_len: usize) -> String {
    let fraction = if total == 0 {
        1.0
    } else {
        (current as f64 / total as f64).clamp(0.0, 1.0)
    };

    let filled = ((fraction * bar_len as f64) as usize).min(bar_len);
    let bar = format!("{}{}", "=".repeat(filled), " ".repeat(bar_len - filled));

    let elapsed = started.elapsed();
    let eta = if current == 0 {
        Duration::ZERO
    } else {
        let per_item = elapsed.as_secs_f64() / current as f64;
        Duration::from_secs_f64(per_item * total.saturating_sub(current) as f64)
    };
    let finish_at = chrono::Local::now()
        + chrono::Duration::from_std(eta).unwrap_or_else(|_| chrono::Duration::zero());

    format!(
        "{} / {} [{}] {:.2}% {} / {} ({})",
        current,
        total,
        bar,
        fraction * 100.0,
        format_duration(elapsed),
        format_duration(eta),
        finish_at.format("%H:%M:%S")
    )
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_render_progress_line_shape() {
        let line = render_progress_line(1, 8, Instant::now(), 16);
        assert!(line.starts_with("1 / 8 [==              ] 12.50% "), "{}", line);
        assert!(line.ends_with(')'));
    }

    #[test]
    fn test_render_progress_line_complete() {
        let line = render_progress_line(4, 4, Instant::now(), 10);
        assert!(line.starts_with("4 / 4 [==========] 100.00% "), "{}", line);
    }

    #[test]
    fn test_render_progress_line_zero_current_and_total() {
        let line = render_progress_line(0, 5, Instant::now(), 5);
        assert!(line.starts_with("0 / 5 [     ] 0.00% "), "{}", line);

        let line = render_progress_line(0, 0, Instant::now(), 5);
        assert!(line.contains("100.00%"), "{}", line);
    }

    #[test]
    fn test_progress_bar_counts() {
        let pb = create_progress_bar(3, "test");
        pb.inc(2);
        assert_eq!(pb.position(), 2);
        assert_eq!(pb.length(), Some(3));
        pb.finish_and_clear();
    }

    proptest::proptest! {
        #[test]
        fn prop_bar_width_is_fixed(current in 0usize..500, total in 0usize..500, bar_len in 0usize..60) {
            let line = render_progress_line(current, total, Instant::now(), bar_len);
            let open = line.find('[').unwrap();
            let close = line.find(']').unwrap();
            proptest::prop_assert_eq!(close - open - 1, bar_len);
        }
    }
}
