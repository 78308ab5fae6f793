//! Diagnostic frame broadcast
//!
//! The control loop publishes a thresholded frame plus its slice data into a
//! single buffered slot; a worker thread serves it to at most one TCP viewer.
//! Publishing is strictly non-blocking: if the worker is mid-send the frame
//! is dropped, and an unconsumed frame is overwritten by the next publish.
//! The viewer link is best effort only — losing it never disturbs control.

pub mod channel;
pub mod packet;

pub use channel::FrameBroadcaster;
pub use packet::{ViewerPacket, HEADER_BYTES};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broadcast error types
#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("Listener setup failed: {0}")]
    Listen(#[from] std::io::Error),

    #[error("Worker thread failed to spawn: {0}")]
    Spawn(String),
}

/// Broadcast configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// TCP port the viewer connects to (0 picks an ephemeral port)
    pub port: u16,
    /// Publish every Nth processed frame
    pub frame_divisor: u32,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            port: 24000,
            frame_divisor: 4,
        }
    }
}
