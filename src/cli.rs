use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::detect::FallbackPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "liquidacion-splitter",
    version,
    about = "Split scanned PDFs at pages headed \"LIQUIDACIÓN PROVISIONAL\""
)]
pub struct Cli {
    /// Also append logs to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Split(SplitArgs),
    Analyze(AnalyzeArgs),
    Tools(ToolsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    pub input_pdf: PathBuf,

    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(long, default_value = "liquidacion_{}.pdf")]
    pub output_pattern: String,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[command(flatten)]
    pub detection: DetectionArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    pub input_pdf: PathBuf,

    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub detection: DetectionArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DetectionArgs {
    #[arg(long, default_value_t = 300)]
    pub dpi: u32,

    #[arg(long, default_value = "spa")]
    pub lang: String,

    #[arg(long, default_value = "tesseract")]
    pub tesseract_bin: String,

    #[arg(long, default_value = "pdftoppm")]
    pub pdftoppm_bin: String,

    #[arg(long, default_value_t = 60)]
    pub ocr_timeout_secs: u64,

    /// Worker threads for page evaluation; 0 lets rayon decide.
    #[arg(long, default_value_t = 0)]
    pub jobs: usize,

    #[arg(long, value_enum, default_value_t = FallbackPolicy::Always)]
    pub fallback_policy: FallbackPolicy,

    /// JSON pattern table replacing the built-in one.
    #[arg(long)]
    pub patterns_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ToolsArgs {
    #[arg(long, default_value = "tesseract")]
    pub tesseract_bin: String,

    #[arg(long, default_value = "pdftoppm")]
    pub pdftoppm_bin: String,

    #[arg(long, default_value = "spa")]
    pub lang: String,
}
