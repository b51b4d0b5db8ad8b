//! Raspberry Pi camera handle backed by the rpicam-apps binaries
//!
//! Frames come from `rpicam-still` (one JPEG per invocation on stdout);
//! recordings are an `rpicam-vid` child process writing H.264 to the sink
//! until it is killed. The subprocess-per-operation model means the hardware
//! is only held for the duration of a call, which is what lets preview and
//! recording share one sensor.

use super::{CameraDevice, DeviceError, DeviceProfile};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Mutex;
use std::time::Duration;

/// How long a recorder gets to finalize its output after SIGTERM before it
/// is killed outright
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Stop a recorder child without truncating its sink: SIGTERM lets
/// `rpicam-vid` flush the final NAL units, SIGKILL is the fallback for a
/// recorder that ignores it.
fn shutdown_recorder(mut child: Child) -> Result<ExitStatus, DeviceError> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM).is_ok() {
            let deadline = std::time::Instant::now() + STOP_GRACE;
            while std::time::Instant::now() < deadline {
                if let Some(status) = child.try_wait()? {
                    return Ok(status);
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            tracing::warn!(pid = child.id(), "Recorder ignored SIGTERM, killing it");
        }
    }

    child.kill()?;
    Ok(child.wait()?)
}

/// Tracked device state. The hardware itself is stateful: it must be
/// stopped to reconfigure, and started to produce anything.
struct DeviceState {
    profile: DeviceProfile,
    running: bool,
    recorder: Option<Child>,
}

/// Camera handle for the Raspberry Pi camera stack
pub struct RpicamDevice {
    width: u32,
    height: u32,
    state: Mutex<DeviceState>,
}

impl RpicamDevice {
    /// Create a handle capturing at the given geometry
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            state: Mutex::new(DeviceState {
                profile: DeviceProfile::Preview,
                running: false,
                recorder: None,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, DeviceState>, DeviceError> {
        self.state
            .lock()
            .map_err(|_| DeviceError::Fault("device state poisoned".to_string()))
    }
}

impl CameraDevice for RpicamDevice {
    fn configure(&self, profile: DeviceProfile) -> Result<(), DeviceError> {
        let mut state = self.lock()?;
        if state.running {
            return Err(DeviceError::Fault(
                "cannot reconfigure a started camera".to_string(),
            ));
        }
        state.profile = profile;
        tracing::debug!(profile = profile.as_str(), "Camera configured");
        Ok(())
    }

    fn start(&self) -> Result<(), DeviceError> {
        let mut state = self.lock()?;
        state.running = true;
        tracing::debug!(profile = state.profile.as_str(), "Camera started");
        Ok(())
    }

    fn stop(&self) -> Result<(), DeviceError> {
        let mut state = self.lock()?;
        state.running = false;
        // A recorder left behind would keep the sensor open
        if let Some(child) = state.recorder.take() {
            tracing::warn!("Camera stopped with an active recorder, shutting it down");
            let _ = shutdown_recorder(child);
        }
        tracing::debug!("Camera stopped");
        Ok(())
    }

    fn capture_frame(&self) -> Result<Vec<u8>, DeviceError> {
        {
            let state = self.lock()?;
            if !state.running {
                return Err(DeviceError::Fault("camera is not started".to_string()));
            }
            if state.profile != DeviceProfile::Preview {
                return Err(DeviceError::Fault(
                    "camera is not configured for preview capture".to_string(),
                ));
            }
        }

        let output = Command::new("rpicam-still")
            .args([
                "-n",
                "--immediate",
                "-t",
                "1",
                "--width",
                &self.width.to_string(),
                "--height",
                &self.height.to_string(),
                "-e",
                "jpg",
                "-o",
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeviceError::Fault(format!(
                "rpicam-still failed: {}",
                stderr.trim()
            )));
        }

        if output.stdout.is_empty() {
            return Err(DeviceError::Fault(
                "rpicam-still returned empty output".to_string(),
            ));
        }

        Ok(output.stdout)
    }

    fn start_recording(&self, sink: &Path) -> Result<(), DeviceError> {
        let mut state = self.lock()?;
        if !state.running {
            return Err(DeviceError::Fault("camera is not started".to_string()));
        }
        if state.profile != DeviceProfile::Video {
            return Err(DeviceError::Fault(
                "camera is not configured for video capture".to_string(),
            ));
        }
        if state.recorder.is_some() {
            return Err(DeviceError::Fault(
                "a recorder is already running".to_string(),
            ));
        }

        let child = Command::new("rpicam-vid")
            .args([
                "-n",
                "-t",
                "0",
                "--width",
                &self.width.to_string(),
                "--height",
                &self.height.to_string(),
                "-o",
            ])
            .arg(sink)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        tracing::info!(sink = %sink.display(), pid = child.id(), "rpicam-vid recorder spawned");
        state.recorder = Some(child);
        Ok(())
    }

    fn stop_recording(&self) -> Result<(), DeviceError> {
        let mut state = self.lock()?;
        let child = state
            .recorder
            .take()
            .ok_or_else(|| DeviceError::Fault("no active recorder".to_string()))?;

        let status = shutdown_recorder(child)?;
        tracing::info!(exit = %status, "rpicam-vid recorder stopped");
        Ok(())
    }
}
