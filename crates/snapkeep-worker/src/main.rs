//! Saved-media merge worker binary.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use snapkeep_media::Ffmpeg;
use snapkeep_models::Manifest;
use snapkeep_worker::{reconcile_leftovers, HttpFetcher, MergePipeline, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("snapkeep=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting snapkeep-worker");
    let started = Instant::now();

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // Both of these are fatal startup conditions; per-item failures are not.
    let manifest = match Manifest::load(&config.manifest_path) {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to load manifest: {}", e);
            std::process::exit(1);
        }
    };
    info!(entries = manifest.len(), "Loaded manifest");

    let ffmpeg = match &config.ffmpeg_path {
        Some(path) if path.exists() => Ffmpeg::new(path),
        Some(path) => {
            error!("Configured FFmpeg binary not found: {}", path.display());
            std::process::exit(1);
        }
        None => match Ffmpeg::locate() {
            Ok(f) => f,
            Err(e) => {
                error!("FFmpeg is required: {}", e);
                std::process::exit(1);
            }
        },
    };
    info!(binary = %ffmpeg.binary().display(), "Using FFmpeg");

    let pipeline = MergePipeline::new(config.clone(), ffmpeg.clone(), Arc::new(HttpFetcher::new()));
    match pipeline.run(&manifest).await {
        Ok(report) => info!(?report, "Merge pass finished"),
        Err(e) => {
            error!("Merge pass could not run: {}", e);
            std::process::exit(1);
        }
    }

    // Recover anything an earlier (or this) run left half-done. The
    // top-level run preserves scratch dirs unless configured otherwise.
    let delete_scratch = !config.keep_scratch_on_sweep;
    match reconcile_leftovers(&ffmpeg, &manifest, &config.output_dir, delete_scratch).await {
        Ok(report) => info!(?report, "Reconciliation sweep finished"),
        Err(e) => error!("Reconciliation sweep failed: {}", e),
    }

    info!(elapsed = ?started.elapsed(), "Run complete");
}
