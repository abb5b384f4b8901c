//! `nightlift` CLI - Enhance low-light images.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nightlift::{Config, Pipeline};

/// Enhance a low-light image with a neural model, falling back to classical filtering.
#[derive(Parser, Debug)]
#[command(name = "nightlift")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input image path.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output image path. Missing parent directories are created.
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Model weights (safetensors). Defaults to the platform data directory.
    #[arg(short, long, env = "NIGHTLIFT_WEIGHTS", value_name = "PATH")]
    weights: Option<PathBuf>,

    /// Output JPEG quality (1-100).
    #[arg(short, long, default_value = "95", value_name = "INT")]
    quality: u8,

    /// Skip the neural model and use classical enhancement only.
    #[arg(long)]
    classical: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("nightlift={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    // Validate input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
            tracing::info!("Created directory: {}", dir.display());
        }
    }

    // Build configuration
    let defaults = Config::default();
    let config = Config {
        weights_path: args.weights.clone().unwrap_or(defaults.weights_path),
        force_classical: args.classical,
        output_quality: args.quality,
        ..defaults
    };

    let pipeline = Pipeline::new(config).context("Failed to initialize pipeline")?;

    let report = pipeline
        .process(&args.input, &args.output)
        .context("Failed to process image")?;

    println!(
        "Enhanced {} -> {} ({}x{}, {} path)",
        args.input.display(),
        args.output.display(),
        report.width,
        report.height,
        report.method
    );

    Ok(())
}
