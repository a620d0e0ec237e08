//! Report Module
//!
//! Reporting sink for batch operations: counters shared across workers,
//! a one-line result for logs and the boxed summary for the terminal.

use crate::progress::{format_bytes, format_duration};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<(PathBuf, String)>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn fail(&mut self, path: PathBuf, error: String) {
        self.total += 1;
        self.failed += 1;
        self.errors.push((path, error));
    }

    pub fn skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }
}

/// Counters updated concurrently from pool workers.
#[derive(Debug, Default)]
pub struct BatchStats {
    input_bytes: AtomicU64,
    output_bytes: AtomicU64,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    failures: Mutex<Vec<(PathBuf, String)>>,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, input_bytes: u64, output_bytes: u64) {
        self.input_bytes.fetch_add(input_bytes, Ordering::Relaxed);
        self.output_bytes.fetch_add(output_bytes, Ordering::Relaxed);
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, path: PathBuf, error: impl Into<String>) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut failures) = self.failures.lock() {
            failures.push((path, error.into()));
        }
    }

    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn input_bytes(&self) -> u64 {
        self.input_bytes.load(Ordering::Relaxed)
    }

    pub fn output_bytes(&self) -> u64 {
        self.output_bytes.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Snapshot as a plain [`BatchResult`]; failures sorted by path.
    pub fn to_result(&self) -> BatchResult {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let skipped = self.skipped.load(Ordering::Relaxed);
        let mut errors = self
            .failures
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default();
        errors.sort();
        BatchResult {
            total: succeeded + failed + skipped,
            succeeded,
            failed,
            skipped,
            errors,
        }
    }

    /// `"Processed 3 files (1 skipped, 0 failed): 1.00 MB → 512.00 KB (50.00%) in 4s"`
    pub fn report_line(&self, elapsed: Duration) -> String {
        let result = self.to_result();
        let input = self.input_bytes();
        let output = self.output_bytes();
        let ratio = if input == 0 {
            0.0
        } else {
            output as f64 / input as f64 * 100.0
        };
        format!(
            "Processed {} files ({} skipped, {} failed): {} → {} ({:.2}%) in {}",
            result.succeeded,
            result.skipped,
            result.failed,
            format_bytes(input),
            format_bytes(output),
            ratio,
            format_duration(elapsed)
        )
    }
}

pub fn print_summary_report(
    result: &BatchResult,
    duration: Duration,
    input_bytes: u64,
    output_bytes: u64,
    operation_name: &str,
) {
    let reduction = if input_bytes > 0 {
        (1.0 - output_bytes as f64 / input_bytes as f64) * 100.0
    } else {
        0.0
    };

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  📊 {:<56} ║", format!("{} Summary", operation_name));
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  📁 Files Processed:    {:>10}                           ║", result.total);
    println!("║  ✅ Succeeded:          {:>10}                           ║", result.succeeded);
    println!("║  ❌ Failed:             {:>10}                           ║", result.failed);
    println!("║  ⏭️  Skipped:            {:>10}                           ║", result.skipped);
    println!("║  📈 Success Rate:       {:>9.1}%                           ║", result.success_rate());
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  💾 Input Size:         {:>10}                           ║", format_bytes(input_bytes));
    println!("║  💾 Output Size:        {:>10}                           ║", format_bytes(output_bytes));
    println!("║  📉 Size Reduction:     {:>9.1}%                           ║", reduction);
    println!("║  ⏱️  Total Time:         {:>10}                           ║", format_duration(duration));
    println!("╚══════════════════════════════════════════════════════════════╝");

    if !result.errors.is_empty() {
        println!();
        println!("❌ Errors encountered:");
        for (path, error) in &result.errors {
            println!("   {} → {}", path.display(), error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_batch_result_mixed() {
        let mut result = BatchResult::new();
        result.success();
        result.success();
        result.fail(PathBuf::from("test.png"), "Error".to_string());
        result.skip();

        assert_eq!(result.total, 4);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.total, result.succeeded + result.failed + result.skipped);
    }

    #[test]
    fn test_success_rate() {
        let mut result = BatchResult::new();
        assert!((result.success_rate() - 100.0).abs() < 0.01);
        result.success();
        result.fail(PathBuf::from("x.png"), "E".to_string());
        assert!((result.success_rate() - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_batch_stats_concurrent_updates() {
        let stats = Arc::new(BatchStats::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record_success(10, 4);
                    }
                    stats.record_failure(PathBuf::from(format!("f{}.png", i)), "boom");
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let result = stats.to_result();
        assert_eq!(result.succeeded, 800);
        assert_eq!(result.failed, 8);
        assert_eq!(stats.input_bytes(), 8000);
        assert_eq!(stats.output_bytes(), 3200);
        assert_eq!(result.errors[0].0, PathBuf::from("f0.png"));
    }

    #[test]
    fn test_report_line() {
        let stats = BatchStats::new();
        stats.record_success(2048, 1024);
        stats.record_skip();

        let line = stats.report_line(Duration::from_secs(65));
        assert_eq!(
            line,
            "Processed 1 files (1 skipped, 0 failed): 2.00 KB → 1.00 KB (50.00%) in 1m 5s"
        );
    }

    #[test]
    fn test_report_line_empty_input() {
        let stats = BatchStats::new();
        assert!(stats.report_line(Duration::ZERO).contains("(0.00%)"));
    }

    #[test]
    fn test_print_summary_report_no_panic() {
        let mut result = BatchResult::new();
        result.success();
        result.fail(PathBuf::from("a.png"), "bad".to_string());
        print_summary_report(&result, Duration::from_secs(3), 100, 50, "Convert");
        print_summary_report(&BatchResult::new(), Duration::ZERO, 0, 0, "Empty");
    }
}
