//! Floor-line segmentation
//!
//! Splits a grayscale frame into horizontal bands and, per band:
//! - picks an adaptive threshold from the histogram valley between the
//!   "line" and "floor" intensity peaks
//! - re-thresholds the band in place (LINE black, FLOOR white)
//! - extracts the line centroid ("slice") and pixel mass
//!
//! Per-band thresholds are independent so a lighting gradient across the
//! track does not drag one global threshold off.

pub mod segmenter;
pub mod slice;

pub use segmenter::{LineSegmenter, SegmenterConfig};
pub use slice::Slice;

/// Pixel value assigned to line pixels after thresholding
pub const LINE: u8 = 0;

/// Pixel value assigned to floor pixels after thresholding
pub const FLOOR: u8 = 255;
