//! Adaptive per-band thresholding and centroid extraction

use crate::{Slice, FLOOR, LINE};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::trace;

/// Segmenter tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Frame width in pixels
    pub width: usize,
    /// Histogram split between the line peak search `[0, split)` and the
    /// floor peak search `[split, 255)`
    pub split: u8,
    /// Offset added to the valley before thresholding
    pub bias: i32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            width: 320,
            split: 100,
            bias: 0,
        }
    }
}

/// Per-band adaptive threshold + centroid extraction.
///
/// Each band gets its own histogram and its own threshold, so the two bands
/// of a frame can sit under different lighting.
pub struct LineSegmenter {
    width: usize,
    split: usize,
    bias: i32,
}

impl LineSegmenter {
    pub fn new(config: &SegmenterConfig) -> Self {
        Self {
            width: config.width,
            // split must leave at least one bin on each side
            split: (config.split as usize).clamp(1, 254),
            bias: config.bias,
        }
    }

    /// Threshold the band in place and extract its slice
    pub fn extract_band(&self, buffer: &mut [u8], rows: Range<usize>) -> Slice {
        self.threshold_band(buffer, rows.clone());
        self.centroid(buffer, rows)
    }

    /// Re-threshold every pixel of the band in place against the adaptive
    /// valley. Returns the valley intensity that was used.
    ///
    /// The valley is the minimum-count bin strictly between the modal bin of
    /// `[0, split)` (line peak) and the modal bin of `[split, 255)` (floor
    /// peak). A degenerate histogram (peaks inverted or adjacent) falls back
    /// to the line peak itself, which classifies the whole band as floor at
    /// zero bias.
    pub fn threshold_band(&self, buffer: &mut [u8], rows: Range<usize>) -> u8 {
        let band = &mut buffer[rows.start * self.width..rows.end * self.width];

        let mut histogram = [0u32; 256];
        for &v in band.iter() {
            histogram[v as usize] += 1;
        }

        let line_peak = modal_bin(&histogram[..self.split], 0);
        let floor_peak = modal_bin(&histogram[self.split..255], self.split);

        let mut valley = line_peak;
        if line_peak < floor_peak {
            let mut min_count = u32::MAX;
            for bin in (line_peak + 1)..floor_peak {
                if histogram[bin] < min_count {
                    min_count = histogram[bin];
                    valley = bin;
                }
            }
        }
        trace!(line_peak, floor_peak, valley, "band threshold");

        let cut = valley as i32 + self.bias;
        for v in band.iter_mut() {
            *v = if (*v as i32) < cut { LINE } else { FLOOR };
        }
        valley as u8
    }

    /// Centroid of the LINE pixels within the band rows.
    ///
    /// Caller guarantees the buffer covers the requested rows. A band with no
    /// line pixels yields the all-zero slice.
    pub fn centroid(&self, buffer: &[u8], rows: Range<usize>) -> Slice {
        let mut x_sum: u64 = 0;
        let mut y_sum: u64 = 0;
        let mut count: u32 = 0;

        for i in rows.start * self.width..rows.end * self.width {
            if buffer[i] == LINE {
                x_sum += (i % self.width) as u64;
                y_sum += (i / self.width) as u64;
                count += 1;
            }
        }

        if count == 0 {
            return Slice::default();
        }

        let x = (x_sum / count as u64) as i32;
        let y = (y_sum / count as u64) as i32;
        Slice {
            x,
            y,
            mass: count as i32,
            error: (self.width / 2) as i32 - x,
        }
    }
}

/// Index of the largest bin, offset back into full histogram coordinates.
/// Ties resolve to the lowest index.
fn modal_bin(bins: &[u32], offset: usize) -> usize {
    let mut peak = 0;
    let mut peak_count = 0u32;
    for (i, &count) in bins.iter().enumerate() {
        if count > peak_count {
            peak_count = count;
            peak = i;
        }
    }
    peak + offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const W: usize = 320;

    fn segmenter() -> LineSegmenter {
        LineSegmenter::new(&SegmenterConfig::default())
    }

    fn band_of(rows: usize, value: u8) -> Vec<u8> {
        vec![value; W * rows]
    }

    #[test]
    fn test_bimodal_band_splits_on_valley() {
        // Dark line cluster at 20, bright floor at 200
        let mut buffer = band_of(4, 200);
        for px in buffer.iter_mut().take(W) {
            *px = 20;
        }
        let valley = segmenter().threshold_band(&mut buffer, 0..4);
        assert!(valley > 20 && valley < 200);
        assert!(buffer[..W].iter().all(|&v| v == LINE));
        assert!(buffer[W..].iter().all(|&v| v == FLOOR));
    }

    #[test]
    fn test_unimodal_band_engages_fallback() {
        // Whole band at split-1: no floor mass, valley falls back near the
        // line peak and everything classifies as floor at zero bias.
        let mut buffer = band_of(2, 99);
        let valley = segmenter().threshold_band(&mut buffer, 0..2);
        assert_eq!(valley, 99);
        assert!(buffer.iter().all(|&v| v == FLOOR));
    }

    #[test]
    fn test_centroid_of_known_block() {
        let seg = segmenter();
        let mut buffer = band_of(4, FLOOR);
        // 2x2 LINE block at columns 10..12, rows 1..3
        for row in 1..3 {
            for col in 10..12 {
                buffer[row * W + col] = LINE;
            }
        }
        let slice = seg.centroid(&buffer, 0..4);
        assert_eq!(slice.mass, 4);
        assert_eq!(slice.x, 10); // (10+11)/2 truncated
        assert_eq!(slice.y, 1); // (1+2)/2 truncated
        assert_eq!(slice.error, 160 - 10);
    }

    #[test]
    fn test_empty_band_yields_zero_slice() {
        let seg = segmenter();
        let buffer = band_of(3, FLOOR);
        let slice = seg.centroid(&buffer, 0..3);
        assert_eq!(slice, Slice::default());
        assert!(!slice.visible());
    }

    #[test]
    fn test_bias_widens_line_class() {
        let mut buffer = band_of(2, 99);
        let seg = LineSegmenter::new(&SegmenterConfig {
            bias: 1,
            ..SegmenterConfig::default()
        });
        seg.threshold_band(&mut buffer, 0..2);
        // valley 99 + bias 1 puts the 99s below the cut
        assert!(buffer.iter().all(|&v| v == LINE));
    }

    proptest! {
        #[test]
        fn prop_threshold_never_panics_and_binarizes(band in proptest::collection::vec(any::<u8>(), W * 2)) {
            let mut buffer = band;
            segmenter().threshold_band(&mut buffer, 0..2);
            prop_assert!(buffer.iter().all(|&v| v == LINE || v == FLOOR));
        }

        #[test]
        fn prop_centroid_error_tracks_x(cols in proptest::collection::vec(0usize..W, 1..50)) {
            let seg = segmenter();
            let mut buffer = vec![FLOOR; W];
            for &c in &cols {
                buffer[c] = LINE;
            }
            let slice = seg.centroid(&buffer, 0..1);
            prop_assert_eq!(slice.error, 160 - slice.x);
            prop_assert!(slice.mass >= 1);
        }
    }
}
