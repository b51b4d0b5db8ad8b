//! Call-counting, fault-injectable camera double for coordinator tests

use super::{CameraDevice, DeviceError, DeviceProfile};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Minimal JPEG (SOI + EOI) so stream assertions can check the magic bytes
const FAKE_JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xD9];

#[derive(Default)]
pub struct MockDevice {
    configures: Mutex<Vec<DeviceProfile>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    captures: AtomicUsize,
    recording: AtomicBool,
    pub fail_configure: AtomicBool,
    pub fail_capture: AtomicBool,
    pub fail_start_recording: AtomicBool,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure_count(&self) -> usize {
        self.configures.lock().unwrap().len()
    }

    pub fn video_configure_count(&self) -> usize {
        self.configures
            .lock()
            .unwrap()
            .iter()
            .filter(|p| **p == DeviceProfile::Video)
            .count()
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

impl CameraDevice for MockDevice {
    fn configure(&self, profile: DeviceProfile) -> Result<(), DeviceError> {
        if self.fail_configure.load(Ordering::SeqCst) {
            return Err(DeviceError::Fault("injected configure fault".to_string()));
        }
        self.configures.lock().unwrap().push(profile);
        Ok(())
    }

    fn start(&self) -> Result<(), DeviceError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), DeviceError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn capture_frame(&self) -> Result<Vec<u8>, DeviceError> {
        if self.fail_capture.load(Ordering::SeqCst) {
            return Err(DeviceError::Fault("injected capture fault".to_string()));
        }
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(FAKE_JPEG.to_vec())
    }

    fn start_recording(&self, _sink: &Path) -> Result<(), DeviceError> {
        if self.fail_start_recording.load(Ordering::SeqCst) {
            return Err(DeviceError::Fault(
                "injected start_recording fault".to_string(),
            ));
        }
        self.recording.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_recording(&self) -> Result<(), DeviceError> {
        if !self.recording.swap(false, Ordering::SeqCst) {
            return Err(DeviceError::Fault("no active recording".to_string()));
        }
        Ok(())
    }
}
