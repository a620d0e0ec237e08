use anyhow::{bail, Context, Result};
use batch_convert::{ConvertConfig, ConvertExecutor, OutputFormat};
use clap::Parser;
use console::style;
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{
    missing_tools, print_summary_report, resolve_threads, ToolLog, DEFAULT_BATCH_THREADS,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use task_engine::{
    event_channel, print_events, run_executor, CancelToken, ConsoleMode, EngineContext,
    SystemRunner,
};

#[derive(Parser)]
#[command(name = "batch-convert")]
#[command(version, about = "Transcode every image of a folder into one format", long_about = None)]
struct Cli {
    /// Folder searched recursively
    #[arg(long, default_value = ".")]
    input: PathBuf,

    /// Output root (default: output_<format>)
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Avif)]
    format: OutputFormat,

    /// Concurrent conversions
    #[arg(long)]
    threads: Option<usize>,

    /// Write every tool invocation to BatchConvert_<timestamp>.log in the current folder
    #[arg(long)]
    log: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = init_logging("batch-convert", LogConfig::default().with_stderr(false));

    let output = match cli.output {
        Some(dir) if dir != Path::new(".") && !dir.as_os_str().is_empty() => dir,
        _ => ConvertConfig::default_output(cli.format),
    };
    let input = std::path::absolute(&cli.input)
        .with_context(|| format!("Invalid input path: {}", cli.input.display()))?;
    let output = std::path::absolute(&output)
        .with_context(|| format!("Invalid output path: {}", output.display()))?;

    if !input.is_dir() {
        bail!("Input is not a directory: {}", input.display());
    }
    let missing = missing_tools(cli.format.required_tools());
    if !missing.is_empty() {
        bail!(
            "{} needs {} on PATH",
            cli.format,
            missing.join(" and ")
        );
    }

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
        let log = ToolLog::create(&cwd, "BatchConvert")?;
        eprintln!("📝 Tool log: {}", log.path().display());
        runner = runner.with_log(Arc::new(log));
    }

    let config = ConvertConfig::new(&input, &output, cli.format);
    let files = config.collect_inputs();
    println!(
        "{} {} files in {} → {} ({})",
        style("🔄").cyan(),
        files.len(),
        input.display(),
        output.display(),
        cli.format
    );

    let executor = Arc::new(ConvertExecutor::new(config));
    let stats = executor.stats();

    let (events, rx) = event_channel();
    let consumer = std::thread::spawn(move || print_events(rx, ConsoleMode::detect()));

    let started = Instant::now();
    let ctx = EngineContext {
        runner: Arc::new(runner),
        events,
        cancel,
        threads: resolve_threads(cli.threads, DEFAULT_BATCH_THREADS),
    };
    let outcome = run_executor(executor, files, &ctx);
    drop(ctx);
    if consumer.join().is_err() {
        tracing::error!("Event consumer panicked");
    }

    if outcome.aborted && outcome.eligible > 0 {
        eprintln!(
            "{}",
            style("Error: found duplicated file names, nothing was converted").red()
        );
        std::process::exit(1);
    }

    let elapsed = started.elapsed();
    let failed = stats.failed();
    if failed > 0 {
        eprintln!();
        eprintln!(
            "{}",
            style(format!("{} files were failed to convert to {}.", failed, cli.format)).red()
        );
    }
    println!("{}", stats.report_line(elapsed));
    print_summary_report(
        &stats.to_result(),
        elapsed,
        stats.input_bytes(),
        stats.output_bytes(),
        "Batch Convert",
    );

    if failed > 0 || outcome.cancelled {
        std::process::exit(1);
    }
    Ok(())
}
