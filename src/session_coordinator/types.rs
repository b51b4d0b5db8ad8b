//! Coordinator data model

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// The camera's current operating configuration. Exactly one is active at
/// any instant, owned exclusively by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    /// Device not started (before startup / after shutdown / unrecoverable)
    Idle,
    /// Device streaming preview frames
    Preview,
    /// A recording session holds the device
    Recording,
}

/// Lifecycle status of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    /// Created, device not yet reconfigured
    Pending,
    /// Device is writing to the sink
    Active,
    /// Requested duration elapsed
    StoppedByTimeout,
    /// Stopped by an explicit stop request
    StoppedByRequest,
    /// Device fault during the session
    Failed,
}

impl RecordingStatus {
    /// Terminal statuses mean the device has left Recording mode
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecordingStatus::StoppedByTimeout
                | RecordingStatus::StoppedByRequest
                | RecordingStatus::Failed
        )
    }
}

/// One timed or manually-stopped video capture
#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub id: Uuid,
    pub sink_path: PathBuf,
    pub requested_duration: Option<Duration>,
    pub started_at: DateTime<Utc>,
    pub status: RecordingStatus,
}

impl RecordingSession {
    pub fn new(sink_path: PathBuf, requested_duration: Option<Duration>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sink_path,
            requested_duration,
            started_at: Utc::now(),
            status: RecordingStatus::Pending,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            sink_path: self.sink_path.display().to_string(),
            requested_duration_secs: self.requested_duration.map(|d| d.as_secs_f64()),
            started_at: self.started_at,
            status: self.status,
        }
    }
}

/// Serializable view of a session for state queries
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub sink_path: String,
    pub requested_duration_secs: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub status: RecordingStatus,
}

/// Result of `SessionCoordinator::query_state`
#[derive(Debug, Clone, Serialize)]
pub struct StateSummary {
    pub mode: CameraMode,
    pub degraded: bool,
    /// Active session, or the last terminal one
    pub session: Option<SessionSummary>,
}
