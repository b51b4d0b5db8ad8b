//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes
//! - Request translation into coordinator operations
//! - Response formatting

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let camera_state = state.coordinator.query_state().await;

    Json(json!({
        "status": if camera_state.degraded { "degraded" } else { "ok" },
        "version": env!("CARGO_PKG_VERSION"),
        "mode": camera_state.mode,
    }))
}

/// Status endpoint
pub async fn device_status(State(state): State<AppState>) -> impl IntoResponse {
    let camera_state = state.coordinator.query_state().await;

    Json(json!({
        "device_type": "picam",
        "firmware_version": env!("CARGO_PKG_VERSION"),
        "status": if camera_state.degraded { "degraded" } else { "running" },
        "mode": camera_state.mode,
    }))
}
