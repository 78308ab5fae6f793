//! Frame Capture Library for the Line Camera
//!
//! The camera driver itself is an external collaborator: it owns the V4L2
//! buffer queue and invokes a callback per captured frame. This crate provides
//! what the processing side needs from those callbacks:
//! - the grayscale working `Frame` extracted from the packed 2-byte/pixel data
//! - the capture configuration handed to the driver
//! - PNG snapshots of the working buffer for diagnostics

pub mod frame;

pub use frame::Frame;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capture error types
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Short frame: got {got} bytes, need at least {need}")]
    ShortFrame { got: usize, need: usize },

    #[error("Frame dimension mismatch: {0}")]
    Dimensions(String),

    #[error("Snapshot write failed: {0}")]
    Snapshot(#[from] image::ImageError),
}

/// Capture configuration, passed through to the camera collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 320,
            height: 240,
            fps: 60,
        }
    }
}

/// Receiver half of the camera collaborator's frame callback.
///
/// The driver guarantees `raw.len() >= 2 * width * height` per call and
/// throttles itself on its own buffer queue, so the implementation must
/// return before the next frame is due.
pub trait FrameSink {
    fn on_frame(&mut self, raw: &[u8]);
}
