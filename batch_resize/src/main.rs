use anyhow::{bail, Context, Result};
use batch_resize::{ResizeConfig, ResizeExecutor, ResizeSpec, DEFAULT_MODEL};
use batch_resize::resizer::{FFMPEG, UPSCALER};
use clap::Parser;
use console::style;
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{
    missing_tools, print_summary_report, resolve_threads, ToolLog, DEFAULT_BATCH_THREADS,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use task_engine::{
    event_channel, print_events, run_executor, CancelToken, ConsoleMode, EngineContext,
    SystemRunner,
};

#[derive(Parser)]
#[command(name = "batch-resize")]
#[command(version, about = "Upscale and bound every image of a folder", long_about = None)]
struct Cli {
    /// Folder searched recursively for png, jpg, jpeg and webp
    #[arg(long, default_value = ".")]
    input: PathBuf,

    /// Output root; relative paths are kept, extensions become .png
    #[arg(long, default_value = "resize_output")]
    output: PathBuf,

    /// Concurrent images
    #[arg(long)]
    threads: Option<usize>,

    /// w<N> bounds the width, h<N> the height, r<N> upscales by N, <N> picks the longer side
    #[arg(long = "target-size", default_value = "w2500")]
    target_size: String,

    /// Upscale even when the source already reaches the target
    #[arg(long)]
    srgan: bool,

    /// realesrgan model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Write every tool invocation to BatchResize_<timestamp>.log in the current folder
    #[arg(long)]
    log: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = init_logging("batch-resize", LogConfig::default().with_stderr(false));

    let spec: ResizeSpec = cli.target_size.parse()?;
    let input = std::path::absolute(&cli.input)
        .with_context(|| format!("Invalid input path: {}", cli.input.display()))?;
    let output = std::path::absolute(&cli.output)
        .with_context(|| format!("Invalid output path: {}", cli.output.display()))?;

    if input == output {
        bail!("Input and output folder must not be the same");
    }
    if !input.is_dir() {
        bail!("Input is not a directory: {}", input.display());
    }
    let missing = missing_tools(&[UPSCALER, FFMPEG]);
    if !missing.is_empty() {
        bail!("Required tools not found on PATH: {}", missing.join(", "));
    }

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("\n⚠️  Cancelling: running tools are stopped, queued images are skipped");
            cancel.cancel();
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let mut runner = SystemRunner::new();
    if cli.log {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let log = ToolLog::create(&cwd, "BatchResize")?;
        eprintln!("📝 Tool log: {}", log.path().display());
        runner = runner.with_log(Arc::new(log));
    }

    let config = ResizeConfig::new(&input, &output)
        .with_spec(spec)
        .with_force_upscale(cli.srgan)
        .with_model(cli.model);
    let files = config.collect_inputs();
    println!(
        "{} {} images in {} → {} ({})",
        style("🖼️").cyan(),
        files.len(),
        input.display(),
        output.display(),
        spec
    );

    let executor = Arc::new(ResizeExecutor::new(config));
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

    let elapsed = started.elapsed();
    println!("{}", stats.report_line(elapsed));
    print_summary_report(
        &stats.to_result(),
        elapsed,
        stats.input_bytes(),
        stats.output_bytes(),
        "Batch Resize",
    );

    if stats.failed() > 0 || outcome.cancelled {
        std::process::exit(1);
    }
    Ok(())
}
