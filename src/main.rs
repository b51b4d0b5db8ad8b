//! picam-server - single-camera streaming and recording service
//!
//! Main entry point.

use picam_server::{
    device::rpicam::RpicamDevice,
    session_coordinator::SessionCoordinator,
    state::{AppConfig, AppState},
    web_api,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "picam_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting picam-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        host = %config.host,
        port = config.port,
        frame_width = config.frame_width,
        frame_height = config.frame_height,
        recording_path = %config.recording_path.display(),
        recording_duration_secs = config.recording_duration_secs,
        poll_interval_ms = config.poll_interval_ms,
        "Configuration loaded"
    );

    // Initialize the camera behind the coordinator and bring it into preview
    let device = Arc::new(RpicamDevice::new(config.frame_width, config.frame_height));
    let coordinator = SessionCoordinator::new(device, config.poll_interval());
    coordinator.startup().await?;
    tracing::info!("SessionCoordinator initialized - camera in preview");

    // Create application state
    let state = AppState {
        config: config.clone(),
        coordinator: coordinator.clone(),
    };

    // Create router
    let app = web_api::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    // Stop any active recording and release the device
    coordinator.shutdown().await;

    Ok(())
}
