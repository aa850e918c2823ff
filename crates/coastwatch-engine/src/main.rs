//! Coastal camera analysis daemon.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coastwatch_camera::HttpSourceFactory;
use coastwatch_engine::{build_detector, metrics, AnalysisSupervisor, EngineConfig};
use coastwatch_models::CameraHandle;
use coastwatch_storage::JsonlSink;

const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting coastwatch");

    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }

    info!("Coastwatch shutdown complete");
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("coastwatch=info,coastwatch_engine=info,ort=warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<()> {
    let config = EngineConfig::from_env().context("invalid configuration")?;
    info!("Engine config: {:?}", config);

    if config.metrics_enabled {
        metrics::init_metrics(config.metrics_addr).context("failed to start metrics exporter")?;
        info!(addr = %config.metrics_addr, "Metrics exporter listening");
    }

    let sink = Arc::new(JsonlSink::new(&config.analysis_log_path));
    let factory = Arc::new(
        HttpSourceFactory::new(config.http_camera_config())
            .context("failed to build camera HTTP client")?,
    );
    let detector = build_detector(&config);
    let cameras = match &config.cameras_file {
        Some(path) => load_cameras(path)?,
        None => {
            warn!("CAMERAS_FILE not set, no cameras to analyse");
            Vec::new()
        }
    };

    let supervisor = AnalysisSupervisor::new(config, factory, detector, sink);

    for handle in cameras {
        let camera_id = handle.camera_id.clone();
        match supervisor.add_camera(handle).await {
            Ok(registration) if !registration.reachable => {
                warn!(camera_id = %camera_id, "Camera not reachable, analysis not started");
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                error!(camera_id = %camera_id, error = %e, "Failed to register camera");
                continue;
            }
        }
        if let Err(e) = supervisor.start_analysis(&camera_id).await {
            warn!(camera_id = %camera_id, error = %e, "Failed to start analysis");
        }
    }

    info!(
        running = supervisor.running_count().await,
        "Analysis running, press Ctrl+C to stop"
    );

    let mut status_tick = tokio::time::interval(STATUS_LOG_INTERVAL);
    status_tick.tick().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            _ = status_tick.tick() => log_summary(&supervisor).await,
        }
    }

    supervisor.shutdown_all().await;
    Ok(())
}

fn load_cameras(path: &Path) -> anyhow::Result<Vec<CameraHandle>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read cameras file {}", path.display()))?;
    let cameras: Vec<CameraHandle> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid cameras file {}", path.display()))?;
    info!(count = cameras.len(), path = %path.display(), "Loaded camera list");
    Ok(cameras)
}

async fn log_summary(supervisor: &AnalysisSupervisor) {
    for result in supervisor.all_latest_results() {
        info!(
            camera_id = %result.camera_id,
            wave_level = result.wave.level.name(),
            intensity = result.wave.current_intensity,
            crowd_level = result.crowd.level.name(),
            people = result.crowd.people_count,
            at = %result.timestamp,
            "Latest analysis"
        );
    }
    info!(running = supervisor.running_count().await, "Status summary");
}
