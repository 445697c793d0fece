//! Atmospheric profile generator.
//!
//! Samples an atmospheric model over a time × altitude grid at one location
//! and writes the result as a profile table for the drag simulator.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use atmos_model::BackendKind;
use profile_sampler::{pipeline, ConfigResolver, Parallelism, RawConfig, RunOptions, SampleArgs};

#[derive(Parser, Debug)]
#[command(name = "profile-generator")]
#[command(about = "Generate atmospheric density/temperature profile tables")]
struct Args {
    #[command(flatten)]
    sample: SampleArgs,

    /// Atmospheric model backend
    #[arg(long, default_value = "library", env = "ATMOS_BACKEND")]
    backend: BackendKind,

    /// Path to the NRLMSISE-00 shared library
    #[arg(long, env = "NRLMSISE_LIBRARY")]
    library_path: Option<PathBuf>,

    /// YAML file replacing the built-in defaults
    #[arg(long, env = "ATMOS_DEFAULTS")]
    defaults: Option<PathBuf>,

    /// Evaluate grid points on all cores
    #[arg(long)]
    parallel: bool,

    /// Log a progress line every N samples
    #[arg(long)]
    progress_every: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info", env = "ATMOS_LOG_LEVEL")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", env = "ATMOS_LOG_FORMAT")]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = init_tracing(&args.log_level, args.log_format) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Profile generation failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    info!("Starting atmospheric profile generator");

    let resolver = match &args.defaults {
        Some(path) => {
            let defaults = RawConfig::from_yaml_file(path)
                .with_context(|| format!("loading defaults from {}", path.display()))?;
            ConfigResolver::with_defaults(defaults)
        }
        None => ConfigResolver::new(),
    };

    let command_line = RawConfig::from(args.sample);
    let config = resolver
        .resolve_layers(&RawConfig::default(), Some(&command_line))
        .context("invalid run configuration")?;

    // Chosen once; the sampling loop never revisits this
    let kind = args.backend;
    let backend = kind
        .build(args.library_path.as_deref())
        .with_context(|| format!("{} backend unavailable", kind))?;

    let options = RunOptions {
        parallelism: if args.parallel {
            Parallelism::Rayon
        } else {
            Parallelism::Serial
        },
        progress_every: args.progress_every,
    };

    let summary = pipeline::run(&config, backend.as_ref(), &options)?;

    info!(
        backend = summary.backend,
        rows = summary.rows,
        time_steps = summary.time_steps,
        altitudes = summary.altitudes,
        output = %summary.output_path.display(),
        "Profile table written"
    );
    Ok(())
}
