//! Terminal front end for the event stream
//!
//! Shared by every binary that drives the engine: an indicatif bar with
//! warnings printed above it, plain progress lines for logs and pipes, or
//! one JSON object per line.

use crate::events::TaskEvent;
use console::style;
use shared_utils::{create_progress_bar, render_progress_line};
use std::io::IsTerminal;
use std::sync::mpsc::Receiver;
use std::time::Instant;

const BAR_SCALE: u64 = 1000;
const LINE_BAR_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMode {
    ProgressBar,
    /// One rendered progress line per finished item.
    Lines,
    JsonLines,
}

impl ConsoleMode {
    /// Bar on a terminal, lines otherwise.
    pub fn detect() -> Self {
        if std::io::stderr().is_terminal() {
            ConsoleMode::ProgressBar
        } else {
            ConsoleMode::Lines
        }
    }
}

/// Drain `rx` until every sender is gone. Runs on its own thread.
pub fn print_events(rx: Receiver<TaskEvent>, mode: ConsoleMode) {
    match mode {
        ConsoleMode::JsonLines => {
            for event in rx {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::error!(error = %e, "Failed to serialize event"),
                }
            }
        }
        ConsoleMode::ProgressBar => {
            let pb = create_progress_bar(BAR_SCALE, "Task");
            for event in rx {
                match event {
                    TaskEvent::Started { task } => {
                        pb.reset();
                        pb.set_prefix(task);
                    }
                    TaskEvent::Progress { fraction, .. } => {
                        pb.set_position(scaled_position(fraction))
                    }
                    TaskEvent::Warning(warning) => pb.println(format!(
                        "{} {}",
                        style("⚠️ ").yellow(),
                        style(&warning).yellow()
                    )),
                    TaskEvent::Finished {
                        task,
                        eligible,
                        warnings,
                    } => {
                        pb.finish_and_clear();
                        println!("{}", finished_line(&task, eligible, warnings));
                    }
                }
            }
        }
        ConsoleMode::Lines => {
            let mut started = Instant::now();
            for event in rx {
                match event {
                    TaskEvent::Started { task } => {
                        started = Instant::now();
                        println!("==> {}", task);
                    }
                    TaskEvent::Progress {
                        completed, total, ..
                    } => println!(
                        "{}",
                        render_progress_line(completed, total, started, LINE_BAR_LEN)
                    ),
                    TaskEvent::Warning(warning) => eprintln!("{}", warning),
                    TaskEvent::Finished {
                        task,
                        eligible,
                        warnings,
                    } => println!("{}", finished_line(&task, eligible, warnings)),
                }
            }
        }
    }
}

fn scaled_position(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * BAR_SCALE as f64).round() as u64
}

fn finished_line(task: &str, eligible: usize, warnings: usize) -> String {
    if warnings == 0 {
        format!("✅ {}: {} files, no warnings", task, eligible)
    } else {
        format!(
            "❌ {}: {} files, {}",
            task,
            eligible,
            style(format!("{} warning(s)", warnings)).red()
        )
    }
}
