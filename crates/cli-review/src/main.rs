use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use review_core::report::{save_report, ExtractionReport};
use review_core::{ExtractReview, Instance, PublishContext};

#[derive(Parser, Debug)]
#[command(name = "review-extract")]
#[command(about = "Build and run ffmpeg review transcodes for a publish instance", long_about = None)]
#[command(version)]
struct Args {
    /// Instance JSON written by the collector
    #[arg(short, long, value_name = "FILE")]
    instance: PathBuf,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host application name used for profile matching
    #[arg(long, env = "AVALON_APP")]
    host: String,

    /// Task name used for profile matching
    #[arg(long, env = "AVALON_TASK")]
    task: String,

    /// Where to write the updated instance; defaults to overwriting --instance
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Directory for the JSON report of this run
    #[arg(long, value_name = "DIR")]
    report_dir: Option<PathBuf>,

    /// Do not run `ffmpeg -version` before processing
    #[arg(long)]
    skip_version_check: bool,
}

fn main() -> Result<()> {
    // Initialize logging; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_ansi(true)
        .init();

    info!("Review extract v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    // Load configuration
    info!("Loading configuration...");
    let config = match review_core::config::load_config(args.config.as_deref()) {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    info!("FFmpeg: {}", config.ffmpeg_path);
    info!("FFprobe: {}", config.ffprobe_path);
    info!("Profiles: {}", config.profiles.len());
    info!("Fill missing frames: {}", config.fill_missing_frames);

    if args.skip_version_check {
        warn!("Skipping FFmpeg version check");
    } else {
        info!("Checking FFmpeg version...");
        match review_core::runner::check_ffmpeg_version(&config.ffmpeg_path) {
            Ok(version) => info!("FFmpeg version: {}.{}.{}", version.0, version.1, version.2),
            Err(e) => {
                error!("Failed to check FFmpeg version: {}", e);
                return Err(e);
            }
        }
    }

    let contents = std::fs::read_to_string(&args.instance)
        .with_context(|| format!("Failed to read instance file {}", args.instance.display()))?;
    let mut instance: Instance =
        serde_json::from_str(&contents).context("Failed to parse instance JSON")?;

    let context = PublishContext {
        host_name: args.host.clone(),
        task_name: args.task.clone(),
        handle_start: config.default_handle_start,
        handle_end: config.default_handle_end,
    };

    let mut report = ExtractionReport::start(&instance, &context);
    let extractor = ExtractReview::new(config);

    info!("Processing instance \"{}\"", instance.display_label());
    let result = extractor.process(&mut instance, &context);

    let outcome = match &result {
        Ok(summary) => {
            info!(
                "Produced {} output(s), skipped {}, removed {}",
                summary.outputs.len(),
                summary.skipped.len(),
                summary.removed.len()
            );
            Ok(summary.clone())
        }
        Err(e) => {
            error!("Extraction failed: {}", e);
            Err(e.to_string())
        }
    };
    report.finish(outcome);

    if let Some(report_dir) = args.report_dir.as_deref() {
        let path = save_report(&report, report_dir)?;
        info!("Report written to {}", path.display());
    }

    result?;

    let output_path = args.output.unwrap_or(args.instance);
    let json = serde_json::to_string_pretty(&instance)?;
    std::fs::write(&output_path, json)
        .with_context(|| format!("Failed to write instance to {}", output_path.display()))?;
    info!("Instance written to {}", output_path.display());

    Ok(())
}
