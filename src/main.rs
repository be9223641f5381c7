use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod analytics;
mod api;
mod buffer;
mod codec;
mod config;
mod stats;

use analytics::{spawn_inference, Detector, RemoteDetector};
use api::{AppState, ClientRegistry, ResultDispatcher};
use buffer::FrameSlot;
use config::{Config, DetectorConfig, DetectorKind, InferenceConfig};
use stats::PipelineStats;

const STATS_INTERVAL: tokio::time::Duration = tokio::time::Duration::from_secs(30);

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("roadsense=debug".parse()?))
        .init();

    let config = Config::load()?;
    tracing::info!(
        detector = ?config.detector.kind,
        address = %config.server.address(),
        "configuration loaded"
    );

    let slot = FrameSlot::new();
    let clients = ClientRegistry::new();
    let stats = Arc::new(PipelineStats::default());
    let shutdown = Arc::new(AtomicBool::new(false));

    let dispatcher = ResultDispatcher::new(Arc::clone(&clients), config.inference.jpeg_quality);
    let mut inference_handle = {
        let detector_config = config.detector.clone();
        let inference_config = config.inference.clone();
        spawn_inference(
            move || build_detector(&detector_config, &inference_config),
            Arc::clone(&slot),
            dispatcher,
            Arc::clone(&stats),
            config.inference.idle_interval(),
            Arc::clone(&shutdown),
        )
    };

    let stats_handle = {
        let stats = Arc::clone(&stats);
        let clients = Arc::clone(&clients);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(STATS_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                let s = stats.snapshot();
                tracing::info!(
                    published = s.published,
                    overwritten = s.overwritten,
                    processed = s.processed,
                    failed = s.failed,
                    clients = clients.len(),
                    "pipeline stats"
                );
            }
        })
    };

    let state = AppState::new(Arc::clone(&slot), Arc::clone(&stats), Arc::clone(&clients));
    let server_handle = {
        let server_config = config.server.clone();
        tokio::spawn(async move {
            let signal = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for shutdown signal");
                }
                tracing::info!("shutdown signal received");
            };
            api::start_server(state, &server_config, signal).await
        })
    };

    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
                Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
            }
        }
        result = &mut inference_handle => {
            if let Err(e) = result {
                tracing::error!(error = %e, "inference task failed");
            }
            tracing::error!("inference loop exited, shutting down");
        }
    }

    shutdown.store(true, Ordering::Relaxed);
    if !inference_handle.is_finished() {
        if let Err(e) = inference_handle.await {
            tracing::error!(error = %e, "inference task failed");
        }
    }

    stats_handle.abort();

    let s = stats.snapshot();
    tracing::info!(
        published = s.published,
        processed = s.processed,
        failed = s.failed,
        "shutdown complete"
    );

    Ok(())
}

fn build_detector(
    detector: &DetectorConfig,
    inference: &InferenceConfig,
) -> Result<Box<dyn Detector>, BoxError> {
    match detector.kind {
        DetectorKind::Remote => {
            tracing::info!(url = %detector.url, "using remote detector");
            Ok(Box::new(RemoteDetector::new(detector, inference)?))
        }
        #[cfg(feature = "onnx")]
        DetectorKind::Onnx => Ok(Box::new(analytics::OnnxDetector::new(detector, inference)?)),
        #[cfg(not(feature = "onnx"))]
        DetectorKind::Onnx => Err(config::ConfigError::OnnxUnavailable.into()),
    }
}
