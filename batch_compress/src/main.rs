use anyhow::{bail, Context, Result};
use batch_compress::{compress_all, parse_patterns, ArchiveFormat, CompressConfig, SEVEN_ZIP};
use clap::Parser;
use console::style;
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{create_progress_bar, list_folders, missing_tools};
use std::path::PathBuf;
use task_engine::{CancelToken, SystemRunner};

#[derive(Parser)]
#[command(name = "batch-compress")]
#[command(version, about = "Archive every sub-folder of a directory with 7z", long_about = None)]
struct Cli {
    /// Archive format, .7z or .zip
    #[arg(short = 'f', default_value = ".7z")]
    format: ArchiveFormat,

    /// Extensions to include, e.g. ".mp4 .webp", or * for all
    #[arg(short = 'e', default_value = "*")]
    extensions: String,

    /// Directory whose sub-folders are archived
    #[arg(value_name = "DIR", default_value = ".")]
    dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = init_logging("batch-compress", LogConfig::default().with_stderr(false));

    if !missing_tools(&[SEVEN_ZIP]).is_empty() {
        bail!("{} not found on PATH", SEVEN_ZIP);
    }

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("\n⚠️  Cancelling: the running archive is stopped");
            cancel.cancel();
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let root = std::path::absolute(&cli.dir)
        .with_context(|| format!("Invalid directory: {}", cli.dir.display()))?;
    let total = list_folders(&root)
        .with_context(|| format!("Failed to list {}", root.display()))?
        .len();
    let config = CompressConfig::new(&root, cli.format, parse_patterns(&cli.extensions));

    let pb = create_progress_bar(total as u64, "Compress");
    let runner = SystemRunner::new();
    let results = compress_all(&config, &runner, &cancel, |(folder, result)| {
        match result {
            Ok(_) => pb.println(format!("==> {}", folder.display())),
            Err(e) => pb.println(format!(
                "{} {}: {}",
                style("Error:").red(),
                folder.display(),
                e
            )),
        }
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    println!(
        "✅ {} folders archived, {} failed",
        results.len() - failed,
        failed
    );
    if failed > 0 || cancel.is_cancelled() {
        std::process::exit(1);
    }
    Ok(())
}
