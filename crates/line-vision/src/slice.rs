//! Band centroid slice

use serde::{Deserialize, Serialize};

/// Centroid and pixel count for one vertical band.
///
/// `error` is the lateral offset of the line from the image center,
/// `width/2 - x`, in pixels. A band with no line pixels is the all-zero
/// slice; downstream code keys off `mass == 0` rather than a sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    /// Centroid column
    pub x: i32,
    /// Centroid row
    pub y: i32,
    /// Number of pixels classified as line
    pub mass: i32,
    /// Lateral error: `width/2 - x`
    pub error: i32,
}

impl Slice {
    /// Whether the band contained any line pixels
    pub fn visible(&self) -> bool {
        self.mass > 0
    }
}
