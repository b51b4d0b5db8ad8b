//! picam-server - single-camera streaming and recording service
//!
//! ## Architecture (5 Components)
//!
//! 1. Device Handle (`device`) - opaque camera hardware contract
//! 2. SessionCoordinator (`session_coordinator`) - exclusive-device arbitration
//! 3. FrameSource (`frame_source`) - multipart JPEG stream for live preview
//! 4. WebAPI (`web_api`) - REST API endpoints
//! 5. AppState (`state`) - configuration and shared handles
//!
//! ## Design Principles
//!
//! - The camera is a single shared resource; only the coordinator touches it
//! - Mode changes are claimed before any device call; concurrent claimants
//!   are rejected, never queued
//! - Frame readers hold the mode lock shared across their device read;
//!   transitions take it exclusively only to flip the flag, never across a
//!   blocking device call

pub mod device;
pub mod error;
pub mod frame_source;
pub mod session_coordinator;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
