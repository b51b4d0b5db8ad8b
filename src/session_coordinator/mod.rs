//! SessionCoordinator - exclusive-device arbitration
//!
//! ## Responsibilities
//!
//! - Owns the single camera device and its lifecycle (Idle/Preview/Recording)
//! - Serializes all mode-changing operations; concurrent claimants are
//!   rejected with `DeviceBusy`/`AlreadyRecording`, never queued
//! - Thread-safe frame capture, recording start/stop, state queries
//!
//! ## Locking discipline
//!
//! `mode` sits behind an RwLock. Frame readers hold the read guard across
//! their device read, so a transition can never reconfigure the device under
//! an in-flight capture. Transitions take the write guard only to flip the
//! flag - the slow device reconfigure calls run after the claim, unguarded,
//! with the claimed mode keeping other claimants out. The session slot has
//! its own Mutex; lock order is always session then mode.

mod recording;
mod types;

pub use types::{CameraMode, RecordingSession, RecordingStatus, SessionSummary, StateSummary};

use crate::device::{CameraDevice, DeviceError, DeviceProfile};
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use uuid::Uuid;

/// The active recording session as seen by the coordinator. The session
/// task owns the mutable state; this holds the control handles.
struct ActiveSession {
    session: RecordingSession,
    cancel: watch::Sender<bool>,
    done: watch::Receiver<RecordingStatus>,
}

impl ActiveSession {
    fn summary(&self) -> SessionSummary {
        let mut summary = self.session.summary();
        summary.status = *self.done.borrow();
        summary
    }
}

struct Inner {
    device: Arc<dyn CameraDevice>,
    mode: RwLock<CameraMode>,
    /// Invariant: `Some` iff `mode == Recording`
    session: Mutex<Option<ActiveSession>>,
    /// Last terminal session, kept so state queries can report the outcome
    last_session: RwLock<Option<RecordingSession>>,
    /// Set when a post-fault recovery reconfigure also failed; every camera
    /// operation is rejected until the process restarts
    degraded: AtomicBool,
    poll_interval: Duration,
}

/// Coordinator owning the camera device. Cheap to clone; clones share the
/// same device and state.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

impl SessionCoordinator {
    /// Create a coordinator for the given device. The device starts Idle;
    /// call [`startup`](Self::startup) to bring it into Preview.
    pub fn new(device: Arc<dyn CameraDevice>, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                device,
                mode: RwLock::new(CameraMode::Idle),
                session: Mutex::new(None),
                last_session: RwLock::new(None),
                degraded: AtomicBool::new(false),
                poll_interval,
            }),
        }
    }

    /// Configure and start the device for preview (Idle -> Preview)
    pub async fn startup(&self) -> Result<()> {
        self.ensure_live()?;
        {
            let mode = self.inner.mode.read().await;
            debug_assert_eq!(*mode, CameraMode::Idle, "startup from non-idle mode");
        }

        self.device_call(|d| d.configure(DeviceProfile::Preview))
            .await?;
        self.device_call(|d| d.start()).await?;

        *self.inner.mode.write().await = CameraMode::Preview;
        tracing::info!("Camera configured and started for preview");
        Ok(())
    }

    /// Stop the device (-> Idle), waiting out any active recording first
    pub async fn shutdown(&self) {
        match self.stop_recording().await {
            Ok(status) => {
                tracing::info!(status = ?status, "Active recording stopped for shutdown")
            }
            Err(Error::NotRecording) | Err(Error::Degraded) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to stop recording during shutdown"),
        }

        if let Err(e) = self.device_call(|d| d.stop()).await {
            tracing::warn!(error = %e, "Device stop failed during shutdown");
        }
        *self.inner.mode.write().await = CameraMode::Idle;
        tracing::info!("Camera stopped");
    }

    /// Read one preview frame.
    ///
    /// Fails with `DeviceBusy` while a recording session holds the device.
    /// Concurrent reads are fine - the read guard is shared - and a read
    /// never triggers a reconfigure.
    pub async fn get_frame(&self) -> Result<Vec<u8>> {
        self.ensure_live()?;
        let mode = self.inner.mode.read().await;
        match *mode {
            CameraMode::Preview => {}
            CameraMode::Recording | CameraMode::Idle => return Err(Error::DeviceBusy),
        }

        // Guard stays held across the device read so a transition cannot
        // reconfigure the device mid-capture.
        let frame = self.device_call(|d| d.capture_frame()).await?;
        Ok(frame)
    }

    /// One-shot still capture. Same preconditions as `get_frame`, no mode
    /// change.
    pub async fn capture_photo(&self) -> Result<Vec<u8>> {
        let frame = self.get_frame().await?;
        tracing::debug!(size = frame.len(), "Still photo captured");
        Ok(frame)
    }

    /// Claim the device for a recording session and launch it.
    ///
    /// Returns the session id immediately; the recording itself runs as a
    /// background task. A second call while one is active fails with
    /// `AlreadyRecording` - requests are rejected, never queued.
    pub async fn start_recording(
        &self,
        sink_path: PathBuf,
        duration: Option<Duration>,
    ) -> Result<Uuid> {
        self.ensure_live()?;
        let mut slot = self.inner.session.lock().await;
        if slot.is_some() {
            return Err(Error::AlreadyRecording);
        }

        // Claim Recording before any device call; the flipped mode keeps
        // readers and other claimants out while the slow reconfigure runs
        // inside the session task.
        {
            let mut mode = self.inner.mode.write().await;
            match *mode {
                CameraMode::Preview => {}
                CameraMode::Recording => {
                    debug_assert!(false, "mode Recording with an empty session slot");
                    return Err(Error::AlreadyRecording);
                }
                CameraMode::Idle => return Err(Error::DeviceBusy),
            }
            *mode = CameraMode::Recording;
        }

        let session = RecordingSession::new(sink_path, duration);
        let id = session.id;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(RecordingStatus::Pending);

        slot.replace(ActiveSession {
            session: session.clone(),
            cancel: cancel_tx,
            done: done_rx,
        });
        drop(slot);

        tracing::info!(
            session_id = %id,
            sink = %session.sink_path.display(),
            duration_secs = ?duration.map(|d| d.as_secs_f64()),
            "Recording session launched"
        );

        let coordinator = self.clone();
        tokio::spawn(recording::run(coordinator, session, cancel_rx, done_tx));

        Ok(id)
    }

    /// Signal the active recording session to stop and block until it has
    /// fully torn down (device back in Preview).
    ///
    /// Blocking here is deliberate: the caller cannot issue conflicting
    /// commands against a half-torn-down device.
    pub async fn stop_recording(&self) -> Result<RecordingStatus> {
        self.ensure_live()?;
        let mut done = {
            let slot = self.inner.session.lock().await;
            let active = slot.as_ref().ok_or(Error::NotRecording)?;
            tracing::info!(session_id = %active.session.id, "Stop requested");
            // The task holds its receiver until it finishes, and it cannot
            // clear the slot while we hold the lock, so the flag lands.
            let _ = active.cancel.send(true);
            active.done.clone()
        };

        let status = *done
            .wait_for(|status| status.is_terminal())
            .await
            .map_err(|_| {
                Error::Internal("recording session dropped its completion channel".to_string())
            })?;
        Ok(status)
    }

    /// Current mode plus a summary of the active (or last terminal) session.
    /// Pure read, always succeeds.
    pub async fn query_state(&self) -> StateSummary {
        let mode = *self.inner.mode.read().await;
        let session = {
            let slot = self.inner.session.lock().await;
            match slot.as_ref() {
                Some(active) => Some(active.summary()),
                None => self
                    .inner
                    .last_session
                    .read()
                    .await
                    .as_ref()
                    .map(RecordingSession::summary),
            }
        };

        StateSummary {
            mode,
            degraded: self.is_degraded(),
            session,
        }
    }

    /// Whether a failed recovery has taken the camera out of service
    pub fn is_degraded(&self) -> bool {
        self.inner.degraded.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_degraded() {
            return Err(Error::Degraded);
        }
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Run a blocking device call off the async runtime. The mode lock may
    /// be held shared (frame reads) but never exclusively across this.
    async fn device_call<T, F>(&self, f: F) -> std::result::Result<T, DeviceError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CameraDevice) -> std::result::Result<T, DeviceError> + Send + 'static,
    {
        let device = self.inner.device.clone();
        match tokio::task::spawn_blocking(move || f(device.as_ref())).await {
            Ok(result) => result,
            Err(e) => Err(DeviceError::Fault(format!("device call panicked: {e}"))),
        }
    }

    /// Final bookkeeping for a finished session task: restore the mode,
    /// archive the session, release the Recording claim, then publish the
    /// terminal status so blocked `stop_recording` callers resume only once
    /// a new `start_recording` could succeed.
    async fn finish_session(
        &self,
        mut session: RecordingSession,
        recovered: bool,
        done: &watch::Sender<RecordingStatus>,
    ) {
        let mut slot = self.inner.session.lock().await;
        debug_assert!(slot.is_some(), "finishing a session that was never claimed");

        if !recovered {
            self.inner.degraded.store(true, Ordering::SeqCst);
            session.status = RecordingStatus::Failed;
        }

        {
            let mut mode = self.inner.mode.write().await;
            *mode = if recovered {
                CameraMode::Preview
            } else {
                CameraMode::Idle
            };
        }

        *self.inner.last_session.write().await = Some(session.clone());
        slot.take();
        drop(slot);

        let _ = done.send(session.status);

        if recovered {
            tracing::info!(
                session_id = %session.id,
                status = ?session.status,
                "Recording session finished, camera back in preview"
            );
        } else {
            tracing::error!(
                session_id = %session.id,
                "Camera could not be restored to preview - degraded until restart"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockDevice;
    use futures::future::join_all;
    use std::time::Duration;

    const POLL: Duration = Duration::from_millis(10);

    fn sink(name: &str) -> PathBuf {
        std::env::temp_dir().join(name)
    }

    async fn preview_coordinator(device: &Arc<MockDevice>) -> SessionCoordinator {
        let coordinator = SessionCoordinator::new(device.clone(), POLL);
        coordinator.startup().await.unwrap();
        coordinator
    }

    /// Poll until the coordinator leaves Recording and reports a terminal
    /// session status
    async fn wait_terminal(coordinator: &SessionCoordinator) -> RecordingStatus {
        for _ in 0..400 {
            let state = coordinator.query_state().await;
            if state.mode != CameraMode::Recording {
                if let Some(session) = state.session {
                    if session.status.is_terminal() {
                        return session.status;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("recording session never reached a terminal status");
    }

    #[tokio::test]
    async fn startup_brings_camera_into_preview() {
        let device = Arc::new(MockDevice::new());
        let coordinator = preview_coordinator(&device).await;

        let state = coordinator.query_state().await;
        assert_eq!(state.mode, CameraMode::Preview);
        assert!(state.session.is_none());
        assert!(!state.degraded);
        assert_eq!(device.configure_count(), 1);
        assert_eq!(device.start_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_preview_reads_never_reconfigure() {
        let device = Arc::new(MockDevice::new());
        let coordinator = preview_coordinator(&device).await;
        let configures_before = device.configure_count();

        let reads = (0..8).map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.get_frame().await })
        });
        for result in join_all(reads).await {
            assert!(result.unwrap().is_ok());
        }

        assert_eq!(device.configure_count(), configures_before);
        assert_eq!(device.capture_count(), 8);
    }

    #[tokio::test]
    async fn second_start_recording_is_rejected() {
        let device = Arc::new(MockDevice::new());
        let coordinator = preview_coordinator(&device).await;

        coordinator
            .start_recording(sink("first.h264"), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        let second = coordinator
            .start_recording(sink("second.h264"), Some(Duration::from_secs(5)))
            .await;
        assert!(matches!(second, Err(Error::AlreadyRecording)));

        coordinator.stop_recording().await.unwrap();
        // Device was reconfigured for video exactly once
        assert_eq!(device.video_configure_count(), 1);
    }

    #[tokio::test]
    async fn stop_without_active_recording_fails() {
        let device = Arc::new(MockDevice::new());
        let coordinator = preview_coordinator(&device).await;

        let result = coordinator.stop_recording().await;
        assert!(matches!(result, Err(Error::NotRecording)));
        // Device untouched beyond the startup sequence
        assert_eq!(device.stop_count(), 0);
        assert_eq!(device.configure_count(), 1);
    }

    #[tokio::test]
    async fn timed_recording_returns_to_preview_autonomously() {
        let device = Arc::new(MockDevice::new());
        let coordinator = preview_coordinator(&device).await;
        let duration = Duration::from_millis(50);

        let started = std::time::Instant::now();
        coordinator
            .start_recording(sink("timed.h264"), Some(duration))
            .await
            .unwrap();

        // Tight poll so the elapsed measurement reflects the session task,
        // not this loop
        let mut status = None;
        for _ in 0..400 {
            let state = coordinator.query_state().await;
            if state.mode != CameraMode::Recording {
                if let Some(session) = state.session {
                    if session.status.is_terminal() {
                        status = Some(session.status);
                        break;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        let elapsed = started.elapsed();

        assert_eq!(status, Some(RecordingStatus::StoppedByTimeout));
        // The deadline is honored by the cancel/deadline poll loop, not a
        // full-duration sleep: a few poll intervals of slack, no more.
        assert!(
            elapsed <= duration + POLL * 5,
            "recording overran its deadline: {elapsed:?}"
        );
        assert_eq!(coordinator.query_state().await.mode, CameraMode::Preview);
        assert!(coordinator.get_frame().await.is_ok());
    }

    #[tokio::test]
    async fn frames_are_busy_while_recording() {
        let device = Arc::new(MockDevice::new());
        let coordinator = preview_coordinator(&device).await;

        coordinator
            .start_recording(sink("busy.h264"), Some(Duration::from_millis(80)))
            .await
            .unwrap();

        // The Recording claim is placed before start_recording returns
        assert!(matches!(
            coordinator.get_frame().await,
            Err(Error::DeviceBusy)
        ));

        wait_terminal(&coordinator).await;
        assert!(coordinator.get_frame().await.is_ok());
    }

    #[tokio::test]
    async fn manual_stop_beats_the_deadline() {
        let device = Arc::new(MockDevice::new());
        let coordinator = preview_coordinator(&device).await;

        coordinator
            .start_recording(sink("manual.h264"), Some(Duration::from_secs(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let status = coordinator.stop_recording().await.unwrap();
        assert_eq!(status, RecordingStatus::StoppedByRequest);
        assert_eq!(coordinator.query_state().await.mode, CameraMode::Preview);
    }

    #[tokio::test]
    async fn device_fault_marks_session_failed_and_recovers() {
        let device = Arc::new(MockDevice::new());
        let coordinator = preview_coordinator(&device).await;
        device
            .fail_start_recording
            .store(true, std::sync::atomic::Ordering::SeqCst);

        coordinator
            .start_recording(sink("fault.h264"), Some(Duration::from_secs(5)))
            .await
            .unwrap();

        let status = wait_terminal(&coordinator).await;
        assert_eq!(status, RecordingStatus::Failed);

        // Best-effort recovery brought preview back
        let state = coordinator.query_state().await;
        assert_eq!(state.mode, CameraMode::Preview);
        assert!(!state.degraded);
        assert!(coordinator.get_frame().await.is_ok());
    }

    #[tokio::test]
    async fn failed_recovery_degrades_the_camera() {
        let device = Arc::new(MockDevice::new());
        let coordinator = preview_coordinator(&device).await;
        // Session fails at the video reconfigure, and the recovery
        // reconfigure back to preview fails too
        device
            .fail_configure
            .store(true, std::sync::atomic::Ordering::SeqCst);

        coordinator
            .start_recording(sink("degraded.h264"), Some(Duration::from_secs(5)))
            .await
            .unwrap();

        let status = wait_terminal(&coordinator).await;
        assert_eq!(status, RecordingStatus::Failed);

        let state = coordinator.query_state().await;
        assert!(state.degraded);
        assert_eq!(state.mode, CameraMode::Idle);
        assert!(matches!(
            coordinator.get_frame().await,
            Err(Error::Degraded)
        ));
        assert!(matches!(
            coordinator.start_recording(sink("after.h264"), None).await,
            Err(Error::Degraded)
        ));
    }

    #[tokio::test]
    async fn stop_then_restart_works() {
        let device = Arc::new(MockDevice::new());
        let coordinator = preview_coordinator(&device).await;

        coordinator
            .start_recording(sink("one.h264"), Some(Duration::from_secs(10)))
            .await
            .unwrap();
        coordinator.stop_recording().await.unwrap();

        // The claim is released; a new session can start
        coordinator
            .start_recording(sink("two.h264"), Some(Duration::from_millis(40)))
            .await
            .unwrap();
        let status = wait_terminal(&coordinator).await;
        assert_eq!(status, RecordingStatus::StoppedByTimeout);
        assert_eq!(device.video_configure_count(), 2);
    }
}
