//! API Routes

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::error::{Error, Result};
use crate::frame_source;
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/api/status", get(super::device_status))
        .route("/api/state", get(camera_state))
        // Camera
        .route("/video_feed", get(video_feed))
        .route("/capture_photo", get(capture_photo))
        .route("/start_recording", post(start_recording))
        .route("/stop_recording", post(stop_recording))
        .route("/download_video", get(download_video))
        .with_state(state)
}

/// GET /api/state
/// Coordinator mode and session summary
async fn camera_state(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.coordinator.query_state().await)
}

/// GET /video_feed
/// Live MJPEG preview stream; ends only when the client disconnects
async fn video_feed(State(state): State<AppState>) -> impl IntoResponse {
    let stream = frame_source::mjpeg_stream(
        state.coordinator.clone(),
        state.config.poll_interval(),
    );

    (
        [(header::CONTENT_TYPE, frame_source::CONTENT_TYPE)],
        Body::from_stream(stream),
    )
}

/// GET /capture_photo
/// One-shot still capture, served as an attachment
async fn capture_photo(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let frame = state.coordinator.capture_photo().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"photo.jpg\""),
        ],
        frame,
    ))
}

/// POST /start_recording
/// Launch a timed recording session; responds before the recording ends
async fn start_recording(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let sink = state.config.recording_path.clone();
    let session_id = state
        .coordinator
        .start_recording(sink.clone(), Some(state.config.recording_duration()))
        .await?;

    Ok(Json(json!({
        "status": "Recording started",
        "filename": sink.display().to_string(),
        "session_id": session_id,
    })))
}

/// POST /stop_recording
/// Signal the active session and block until teardown completes
async fn stop_recording(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let outcome = state.coordinator.stop_recording().await?;

    Ok(Json(json!({
        "status": "Recording stopped",
        "outcome": outcome,
    })))
}

/// GET /download_video
/// Serve the recorded sink file
async fn download_video(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let path = &state.config.recording_path;
    let data = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::NotFound(format!("No recorded video at {}", path.display()))
        }
        _ => Error::Io(e),
    })?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("video.h264");

    Ok((
        [
            (header::CONTENT_TYPE, "video/h264".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        data,
    ))
}
