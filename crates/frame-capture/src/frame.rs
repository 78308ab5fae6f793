//! Grayscale working frame

use crate::FrameError;
use image::GrayImage;
use std::path::Path;

/// Grayscale working frame, `width * height` bytes.
///
/// The source delivers packed 2-byte/pixel data; only the first channel of
/// each pixel carries luminance, so extraction reads every other byte. The
/// segmenter thresholds this buffer destructively, which is why it is a copy
/// and not a view into the driver's mmap'd buffer.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Create a zeroed frame
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; (width * height) as usize],
            width,
            height,
        }
    }

    /// Build a frame by sampling the luminance plane of a packed buffer
    pub fn from_packed(raw: &[u8], width: u32, height: u32) -> Result<Self, FrameError> {
        let mut frame = Self::new(width, height);
        frame.copy_from_packed(raw)?;
        Ok(frame)
    }

    /// Re-fill this frame from a packed buffer, reusing the allocation
    pub fn copy_from_packed(&mut self, raw: &[u8]) -> Result<(), FrameError> {
        let pixels = (self.width * self.height) as usize;
        let need = pixels * 2;
        if raw.len() < need {
            return Err(FrameError::ShortFrame {
                got: raw.len(),
                need,
            });
        }
        for (dst, src) in self.data.iter_mut().zip(raw.iter().step_by(2)) {
            *dst = *src;
        }
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel data, row-major
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel data for in-place thresholding
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[(y * self.width + x) as usize])
    }

    /// Write the frame as a PNG snapshot (diagnostic dump)
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), FrameError> {
        let img = GrayImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| FrameError::Dimensions("buffer/dimension mismatch".into()))?;
        img.save(path.as_ref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_packed_takes_every_other_byte() {
        // 2x2 frame, packed as [Y0, U, Y1, V, ...]
        let raw = vec![10, 99, 20, 99, 30, 99, 40, 99];
        let frame = Frame::from_packed(&raw, 2, 2).unwrap();
        assert_eq!(frame.data(), &[10, 20, 30, 40]);
    }

    #[test]
    fn test_short_frame_rejected() {
        let raw = vec![0u8; 7];
        let err = Frame::from_packed(&raw, 2, 2).unwrap_err();
        match err {
            FrameError::ShortFrame { got, need } => {
                assert_eq!(got, 7);
                assert_eq!(need, 8);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_copy_reuses_allocation() {
        let mut frame = Frame::new(2, 2);
        let ptr = frame.data().as_ptr();
        frame.copy_from_packed(&[1, 0, 2, 0, 3, 0, 4, 0]).unwrap();
        assert_eq!(frame.data().as_ptr(), ptr);
        assert_eq!(frame.data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_get_pixel_bounds() {
        let frame = Frame::from_packed(&[5, 0, 6, 0, 7, 0, 8, 0], 2, 2).unwrap();
        assert_eq!(frame.get_pixel(1, 1), Some(8));
        assert_eq!(frame.get_pixel(2, 0), None);
    }

    proptest! {
        #[test]
        fn prop_extraction_reads_first_channel(raw in proptest::collection::vec(any::<u8>(), 32..256)) {
            let frame = Frame::from_packed(&raw, 4, 4).unwrap();
            prop_assert_eq!(frame.data().len(), 16);
            for (i, px) in frame.data().iter().enumerate() {
                prop_assert_eq!(*px, raw[i * 2]);
            }
        }
    }
}
