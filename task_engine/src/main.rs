use anyhow::{Context, Result};
use clap::Parser;
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{resolve_threads, ToolLog, DEFAULT_TASK_THREADS};
use std::path::PathBuf;
use std::sync::Arc;
use task_engine::{
    event_channel, perform_task, print_events, CancelToken, ConsoleMode, EngineContext,
    SystemRunner, TaskKind, TaskRequest,
};

#[derive(Parser)]
#[command(name = "gallery-tasks")]
#[command(version, about = "Run one batch image task over files and folders", long_about = None)]
struct Cli {
    #[arg(value_enum)]
    kind: TaskKind,

    /// Files, or folders whose immediate files are used
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Concurrent tool processes
    #[arg(short, long)]
    threads: Option<usize>,

    /// Write every tool invocation to GalleryTasks_<timestamp>.log in the current folder
    #[arg(long)]
    log: bool,

    /// Print events as JSON lines instead of a progress bar; the log file is JSON too
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = init_logging(
        "gallery-tasks",
        LogConfig::default()
            .with_stderr(false)
            .with_json_file(cli.json),
    );

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("\n⚠️  Cancelling: running tools are stopped, queued files are skipped");
            cancel.cancel();
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let mut runner = SystemRunner::new();
    if cli.log {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let log = ToolLog::create(&cwd, "GalleryTasks")?;
        eprintln!("📝 Tool log: {}", log.path().display());
        runner = runner.with_log(Arc::new(log));
    }

    let mode = if cli.json {
        ConsoleMode::JsonLines
    } else {
        ConsoleMode::detect()
    };
    let (events, rx) = event_channel();
    let consumer = std::thread::spawn(move || print_events(rx, mode));

    let ctx = EngineContext {
        runner: Arc::new(runner),
        events,
        cancel,
        threads: resolve_threads(cli.threads, DEFAULT_TASK_THREADS),
    };
    let outcome = perform_task(&TaskRequest::new(cli.kind, cli.inputs), &ctx);
    drop(ctx);

    if consumer.join().is_err() {
        tracing::error!("Event consumer panicked");
    }

    if !outcome.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}
