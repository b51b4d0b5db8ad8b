//! Recording Session task
//!
//! Runs independently of the request that created it. The device is taken
//! through stop -> configure(video) -> start -> record, then restored to
//! preview however the session ends. Faults are caught here and never reach
//! the streaming path.

use super::types::{RecordingSession, RecordingStatus};
use super::SessionCoordinator;
use crate::device::{DeviceError, DeviceProfile};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Drive one recording session to a terminal status
pub(super) async fn run(
    coordinator: SessionCoordinator,
    mut session: RecordingSession,
    cancel: watch::Receiver<bool>,
    done: watch::Sender<RecordingStatus>,
) {
    let status = match record(&coordinator, &session, cancel, &done).await {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(
                session_id = %session.id,
                error = %e,
                "Recording session failed"
            );
            RecordingStatus::Failed
        }
    };
    session.status = status;

    // Best-effort: bring the device back to preview no matter how the
    // session ended. If this fails the camera is out of service.
    let recovered = restore_preview(&coordinator, &session).await;

    coordinator.finish_session(session, recovered, &done).await;
}

async fn record(
    coordinator: &SessionCoordinator,
    session: &RecordingSession,
    cancel: watch::Receiver<bool>,
    done: &watch::Sender<RecordingStatus>,
) -> Result<RecordingStatus, DeviceError> {
    // Reconfigure for video capture. The Recording claim is already placed,
    // so no reader can touch the device while it is stopped.
    coordinator.device_call(|d| d.stop()).await?;
    coordinator
        .device_call(|d| d.configure(DeviceProfile::Video))
        .await?;
    coordinator.device_call(|d| d.start()).await?;

    let sink = session.sink_path.clone();
    coordinator
        .device_call(move |d| d.start_recording(&sink))
        .await?;

    let _ = done.send(RecordingStatus::Active);
    tracing::info!(
        session_id = %session.id,
        sink = %session.sink_path.display(),
        "Recording active"
    );

    // Cooperative stop: poll the cancel flag and the deadline at a short
    // fixed interval instead of sleeping the full duration, so a stop
    // request is honored within one poll interval.
    let deadline = session
        .requested_duration
        .map(|duration| Instant::now() + duration);
    let mut ticker =
        tokio::time::interval(coordinator.poll_interval().max(Duration::from_millis(1)));
    ticker.tick().await; // first tick completes immediately

    let status = loop {
        ticker.tick().await;
        if *cancel.borrow() {
            break RecordingStatus::StoppedByRequest;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break RecordingStatus::StoppedByTimeout;
            }
        }
    };

    coordinator.device_call(|d| d.stop_recording()).await?;
    tracing::info!(session_id = %session.id, status = ?status, "Recording stopped");
    Ok(status)
}

/// Stop, reconfigure for preview and restart. Returns false when the device
/// could not be restarted - that is a fatal device error, reported loudly
/// by the coordinator, never swallowed.
async fn restore_preview(coordinator: &SessionCoordinator, session: &RecordingSession) -> bool {
    let restore = async {
        coordinator.device_call(|d| d.stop()).await?;
        coordinator
            .device_call(|d| d.configure(DeviceProfile::Preview))
            .await?;
        coordinator.device_call(|d| d.start()).await
    };

    match restore.await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(
                session_id = %session.id,
                error = %e,
                "Device could not be restored to preview"
            );
            false
        }
    }
}
