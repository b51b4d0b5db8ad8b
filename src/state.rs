//! Application state
//!
//! Holds configuration and the shared coordinator handle

use crate::session_coordinator::SessionCoordinator;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Capture width in pixels
    pub frame_width: u32,
    /// Capture height in pixels
    pub frame_height: u32,
    /// Path the recording sink is written to
    pub recording_path: PathBuf,
    /// Duration of a recording started without an explicit stop
    pub recording_duration_secs: u64,
    /// Cancellation/deadline poll interval for recording sessions, also the
    /// retry interval when the preview stream finds the camera busy
    pub poll_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            frame_width: std::env::var("FRAME_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(640),
            frame_height: std::env::var("FRAME_HEIGHT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(480),
            recording_path: std::env::var("RECORDING_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("video.h264")),
            recording_duration_secs: std::env::var("RECORDING_DURATION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        }
    }
}

impl AppConfig {
    /// Requested duration for recordings started over HTTP
    pub fn recording_duration(&self) -> Duration {
        Duration::from_secs(self.recording_duration_secs)
    }

    /// Poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// SessionCoordinator (owns the camera device)
    pub coordinator: SessionCoordinator,
}
