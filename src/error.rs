//! Error handling for picam-server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::device::DeviceError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Camera is busy with a mode transition or an active recording.
    /// Transient - callers may retry.
    #[error("Camera busy")]
    DeviceBusy,

    /// A recording session is already active (client misuse, not retried)
    #[error("Recording already in progress")]
    AlreadyRecording,

    /// No recording session is active (client misuse, not retried)
    #[error("No recording in progress")]
    NotRecording,

    /// Hardware/driver failure
    #[error("Device fault: {0}")]
    DeviceFault(String),

    /// The device could not be recovered after a fault; every camera
    /// operation fails until the process is restarted
    #[error("Camera degraded - restart required")]
    Degraded,

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Error::DeviceFault(e.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            Error::DeviceBusy => (
                StatusCode::SERVICE_UNAVAILABLE,
                "DEVICE_BUSY",
                self.to_string(),
            ),
            Error::AlreadyRecording => (
                StatusCode::BAD_REQUEST,
                "ALREADY_RECORDING",
                self.to_string(),
            ),
            Error::NotRecording => (
                StatusCode::BAD_REQUEST,
                "NOT_RECORDING",
                self.to_string(),
            ),
            Error::DeviceFault(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DEVICE_FAULT",
                msg.clone(),
            ),
            Error::Degraded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "DEVICE_DEGRADED",
                self.to_string(),
            ),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            Error::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR", e.to_string()),
            Error::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}
