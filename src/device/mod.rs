//! Device Handle - opaque camera hardware contract
//!
//! ## Responsibilities
//!
//! - Thin abstraction over the physical camera
//! - Synchronous, blocking, fault-raising calls (the coordinator runs them
//!   on the blocking pool and never under its mode lock)
//!
//! Only the `SessionCoordinator` may call these operations.

pub mod rpicam;

#[cfg(test)]
pub mod mock;

/// Operating configuration the camera can be programmed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceProfile {
    /// Still/preview capture (JPEG frames)
    Preview,
    /// Video capture (H.264 to a sink)
    Video,
}

impl DeviceProfile {
    /// Label for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceProfile::Preview => "preview",
            DeviceProfile::Video => "video",
        }
    }
}

/// Device-level fault raised by any camera operation
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Hardware/driver failure
    #[error("device fault: {0}")]
    Fault(String),

    /// IO failure talking to the device
    #[error("device io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Contract of the physical camera.
///
/// All calls are synchronous and may block for hundreds of milliseconds
/// (reconfiguring is slow and stateful). The device must be stopped before
/// it can be reconfigured, and started before frames or recordings can be
/// produced.
pub trait CameraDevice: Send + Sync {
    /// Program the device for the given profile. Only valid while stopped.
    fn configure(&self, profile: DeviceProfile) -> Result<(), DeviceError>;

    /// Start the device in its current configuration
    fn start(&self) -> Result<(), DeviceError>;

    /// Stop the device
    fn stop(&self) -> Result<(), DeviceError>;

    /// Read one encoded JPEG frame. Only valid started + Preview profile.
    fn capture_frame(&self) -> Result<Vec<u8>, DeviceError>;

    /// Begin writing encoded video to `sink`. Only valid started + Video
    /// profile.
    fn start_recording(&self, sink: &std::path::Path) -> Result<(), DeviceError>;

    /// Stop writing the active recording sink
    fn stop_recording(&self) -> Result<(), DeviceError>;
}
