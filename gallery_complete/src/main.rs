use anyhow::{bail, Context, Result};
use batch_resize::ResizeSpec;
use clap::Parser;
use console::{style, Term};
use gallery_complete::pipeline::{BATCH_CONVERT, BATCH_RESIZE};
use gallery_complete::{Model, Pipeline, PipelineConfig, ProcessStageRunner, SourceFormat, StageStatus, TargetFormat};
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{missing_tools, resolve_threads, DEFAULT_BATCH_THREADS};
use std::path::PathBuf;
use task_engine::CancelToken;

#[derive(Parser)]
#[command(name = "gallery-complete")]
#[command(version, about = "Convert, resize, transcode and archive gallery packs", long_about = None)]
struct Cli {
    /// Folder of packs, or the pack itself with --single
    #[arg(short = 'i', default_value = ".")]
    input: String,

    /// Source format: jxl, webp or png (jpg counts as png)
    #[arg(long = "sf", default_value = "png")]
    source_format: String,

    /// Format of the processed files
    #[arg(long = "tf", value_enum, default_value_t = TargetFormat::Webp)]
    target_format: TargetFormat,

    /// Largest image size, e.g. w2000; 0 disables downscaling
    #[arg(long = "max", default_value = "w2000")]
    max: String,

    /// Upscale with RealESRGAN even when images already reach --max
    #[arg(long)]
    force: bool,

    /// Treat the input folder as a single pack
    #[arg(long)]
    single: bool,

    #[arg(long, value_enum, default_value_t = Model::Fast)]
    model: Model,

    /// batch-resize threads
    #[arg(short = 't')]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = init_logging("gallery-complete", LogConfig::default().with_stderr(false));

    let term = Term::stdout();
    if term.is_term() {
        let _ = term.clear_screen();
    }

    let missing = missing_tools(&[BATCH_RESIZE, BATCH_CONVERT]);
    if !missing.is_empty() {
        bail!("{} not found in PATH", missing.join(" and "));
    }

    // Drag-and-drop on Windows can leave a trailing quote.
    let raw_input = PathBuf::from(cli.input.trim_end_matches('"'));
    let input = std::path::absolute(&raw_input)
        .with_context(|| format!("Invalid input path: {}", raw_input.display()))?;
    if !input.is_dir() {
        bail!("Input must be a folder: {}", input.display());
    }

    let (source_format, warning) = SourceFormat::parse_lenient(&cli.source_format);
    if let Some(warning) = warning {
        eprintln!("{}", style(warning).yellow());
    }
    let target_size: ResizeSpec = cli.max.parse()?;

    let config = PipelineConfig {
        input,
        source_format,
        target_format: cli.target_format,
        target_size,
        force_upscale: cli.force,
        single: cli.single,
        model: cli.model,
        resize_threads: resolve_threads(cli.threads, DEFAULT_BATCH_THREADS),
    };
    println!(
        "Source format: {} | Single mode: {} | Target format: {} | Model: {}",
        config.source_format,
        config.single,
        config.target_format.convert_format(),
        config.model.model_name()
    );

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("\n⚠️  Cancelling: the running stage is stopped, remaining stages are skipped");
            cancel.cancel();
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let pipeline = Pipeline::new(config, ProcessStageRunner::new(), cancel.clone());
    let reports = pipeline
        .run(|report| {
            if !report.is_clean() {
                tracing::warn!(pack = %report.pack.display(), "Pack finished with failed stages");
            }
        })
        .context("Failed to list packs")?;

    println!("\n{}", style("Summary").bold());
    let mut failed_stages = 0;
    for report in &reports {
        let mark = if report.is_clean() { "✅" } else { "❌" };
        println!("{} {}", mark, report.pack.display());
        for record in report.failures() {
            failed_stages += 1;
            if let StageStatus::Failed(error) = &record.status {
                println!("   {} → {}", record.stage, style(error).red());
            }
        }
    }

    if failed_stages > 0 || cancel.is_cancelled() {
        std::process::exit(1);
    }
    Ok(())
}
