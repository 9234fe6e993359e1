use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use liquidacion_splitter::cli::{Cli, Commands};
use liquidacion_splitter::commands;
use liquidacion_splitter::util::ensure_directory;

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(cli.log_file.as_deref()) {
        eprintln!("failed to initialize logging: {err:#}");
        std::process::exit(1);
    }

    if let Err(err) = run(cli.command) {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Split(args) => commands::split::run(args),
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Tools(args) => commands::tools::run(args),
    }
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                ensure_directory(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}
