//! FrameSource - continuous multipart JPEG producer for live streaming
//!
//! ## Responsibilities
//!
//! - Lazy, infinite, restartable sequence of encoded frames
//! - Stalls (rather than erroring the stream) while a recording session
//!   holds the camera - recordings are short-lived
//!
//! The sequence only terminates when the HTTP connection closes and the
//! stream is dropped.

use crate::error::Error;
use crate::session_coordinator::SessionCoordinator;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use std::convert::Infallible;
use std::time::Duration;

/// Multipart boundary token, matched by [`CONTENT_TYPE`]
pub const BOUNDARY: &str = "frame";

/// Content-Type for the `/video_feed` response
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Infinite stream of multipart JPEG parts drawn from the coordinator
pub fn mjpeg_stream(
    coordinator: SessionCoordinator,
    poll_interval: Duration,
) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> {
    async_stream::stream! {
        let mut stalled = false;
        loop {
            match coordinator.get_frame().await {
                Ok(frame) => {
                    stalled = false;
                    yield Ok(part(&frame));
                }
                Err(Error::DeviceBusy) => {
                    // Recording in progress or mode transition; stall and retry
                    tokio::time::sleep(poll_interval).await;
                }
                Err(e) => {
                    // Warn once per stall, not once per poll
                    if !stalled {
                        stalled = true;
                        tracing::warn!(error = %e, "Frame source stalled on device error");
                    } else {
                        tracing::debug!(error = %e, "Frame source still stalled");
                    }
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }
}

fn part(frame: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(frame.len() + 64);
    buf.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
    buf.extend_from_slice(frame);
    buf.extend_from_slice(b"\r\n");
    buf.freeze()
}
