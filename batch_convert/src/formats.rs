//! Output formats and the command each one runs.

use clap::ValueEnum;
use shared_utils::get_extension_lowercase;
use std::fmt;
use std::path::Path;
use task_engine::ToolCommand;

/// Stills and short clips avifenc/ffmpeg can read.
const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp", "gif", "mp4", "webm",
];
const CJXL_EXTENSIONS: &[&str] = &["png", "apng", "gif", "jpeg", "jpg", "ppm", "pfm", "pgx"];
const DJXL_EXTENSIONS: &[&str] = &["jxl"];

/// Sources avifenc encodes itself; anything else goes through ffmpeg.
const AVIFENC_SOURCES: &[&str] = &["jpg", "jpeg", "png", "y4m"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Avif,
    Cjxl,
    Djxl,
    Webp,
}

impl OutputFormat {
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Avif => "avif",
            OutputFormat::Cjxl => "cjxl",
            OutputFormat::Djxl => "djxl",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn input_extensions(self) -> &'static [&'static str] {
        match self {
            OutputFormat::Avif | OutputFormat::Webp => MEDIA_EXTENSIONS,
            OutputFormat::Cjxl => CJXL_EXTENSIONS,
            OutputFormat::Djxl => DJXL_EXTENSIONS,
        }
    }

    /// Without the dot.
    pub fn output_extension(self) -> &'static str {
        match self {
            OutputFormat::Avif => "avif",
            OutputFormat::Cjxl => "jxl",
            OutputFormat::Djxl => "png",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn required_tools(self) -> &'static [&'static str] {
        match self {
            OutputFormat::Avif => &["avifenc", "ffmpeg"],
            OutputFormat::Cjxl => &["cjxl"],
            OutputFormat::Djxl => &["djxl"],
            OutputFormat::Webp => &["ffmpeg"],
        }
    }

    pub fn empty_label(self) -> &'static str {
        match self {
            OutputFormat::Avif | OutputFormat::Webp => "image or video",
            OutputFormat::Cjxl => "cjxl-compatible",
            OutputFormat::Djxl => "jxl",
        }
    }

    pub fn command(self, input: &Path, output: &Path) -> ToolCommand {
        match self {
            OutputFormat::Avif if AVIFENC_SOURCES.contains(&get_extension_lowercase(input).as_str()) => {
                ToolCommand::new("avifenc")
                    .path(input)
                    .path(output)
                    .args(["-y", "444", "-d", "8", "-c", "aom"])
                    .args(["--min", "0", "--max", "63", "--minalpha", "0", "--maxalpha", "63"])
                    .args(["-a", "aq-mode=1", "-a", "cq-level=30"])
                    .args(["-a", "enable-chroma-deltaq=1", "-a", "tune=ssim"])
            }
            OutputFormat::Avif => ToolCommand::new("ffmpeg")
                .arg("-i")
                .path(input)
                .args(["-c:v", "libaom-av1", "-b:v", "0", "-qmin", "0", "-qmax", "63"])
                .args(["-crf", "30", "-cpu-used", "6", "-aq-mode", "1"])
                .args(["-pix_fmt", "yuv444p8le", "-aom-params", "enable-chroma-deltaq=1"])
                .path(output),
            OutputFormat::Cjxl => ToolCommand::new("cjxl")
                .path(input)
                .path(output)
                .args(["-e", "8", "-q", "100", "--num_threads", "4"]),
            OutputFormat::Djxl => ToolCommand::new("djxl").path(input).path(output),
            OutputFormat::Webp => ToolCommand::new("ffmpeg")
                .arg("-i")
                .path(input)
                .args(["-compression_level", "6", "-quality", "80"])
                .path(output),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
