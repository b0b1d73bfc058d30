// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{sync::Arc, time::Duration};
use axum::{
    Router,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::clock::SystemClock;
use crate::application::engine::TelemetryEngine;
use crate::application::engine_service::EngineService;
use crate::infrastructure::config::{SourceKind, load_supervisor_config};
use crate::infrastructure::line_source::LineSource;
use crate::infrastructure::simulated_source::SimulatedSource;
use crate::infrastructure::transport_link::TransportLink;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    acknowledge_alarms, clear_history, clear_recording, force_cleanup, get_recording,
    get_snapshot, health_check, send_command, start_recording, stop_recording,
    stream_snapshots, update_calibration,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_supervisor_config()?;
    let cancel = CancellationToken::new();

    // Create the engine (application layer)
    let engine = TelemetryEngine::new(config.engine.clone(), Arc::new(SystemClock));
    let (engine_service, commands, engine_task) = EngineService::spawn(
        engine,
        config.engine.liveness_check(),
        config.engine.cleanup_interval(),
        cancel.clone(),
    );

    // Wire the sample source (infrastructure layer)
    let link_engine = engine_service.clone();
    let link_cancel = cancel.clone();
    let link_task = match config.source.kind {
        SourceKind::Simulated => {
            let source = SimulatedSource::new(
                Duration::from_millis(config.source.interval_ms),
                config.source.stall_after,
            );
            tokio::spawn(TransportLink::new(source, link_engine, commands, link_cancel).run())
        }
        SourceKind::Stdin => tokio::spawn(
            TransportLink::new(LineSource::stdin(), link_engine, commands, link_cancel).run(),
        ),
    };

    let state = Arc::new(AppState {
        engine: engine_service,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/snapshot", get(get_snapshot))
        .route("/snapshot/stream", get(stream_snapshots))
        .route("/recording", get(get_recording))
        .route("/recording/start", post(start_recording))
        .route("/recording/stop", post(stop_recording))
        .route("/recording/clear", post(clear_recording))
        .route("/alarms/acknowledge", post(acknowledge_alarms))
        .route("/calibration", post(update_calibration))
        .route("/history/clear", post(clear_history))
        .route("/history/cleanup", post(force_cleanup))
        .route("/commands", post(send_command))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.server.bind_addr;
    tracing::info!("Starting weld-supervisor on {}", addr);

    let shutdown = cancel.clone();
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    match link_task.await? {
        Ok(stats) => tracing::info!(frames = stats.frames, rejected = stats.rejected, "Link closed"),
        Err(e) => tracing::warn!("Link ended with error: {}", e),
    }
    engine_task.await?;

    Ok(())
}
