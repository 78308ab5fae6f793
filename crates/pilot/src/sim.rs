//! Hardware-free rig
//!
//! Stand-ins for the motor controller, distance sensors, indicator and
//! camera so the pilot runs on a desk. The real drivers plug in behind the
//! same `navigation` traits without touching anything else.

use frame_capture::CaptureConfig;
use navigation::{DistanceSensors, DriveMode, HardwareError, Indicator, MotorController};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Motor stand-in; remembers the last command for inspection
#[derive(Debug, Default)]
pub struct SimMotors {
    pub last_speed: (u8, u8),
    pub braked: bool,
}

impl MotorController for SimMotors {
    fn set_speed(&mut self, left: u8, right: u8) -> Result<(), HardwareError> {
        self.last_speed = (left, right);
        self.braked = false;
        debug!(left, right, "sim speed");
        Ok(())
    }

    fn set_dir(&mut self, mask: u8) -> Result<(), HardwareError> {
        debug!(mask, "sim direction");
        Ok(())
    }

    fn set_mode(&mut self, mode: DriveMode) -> Result<(), HardwareError> {
        debug!(?mode, "sim drive mode");
        Ok(())
    }

    fn goto_position(&mut self, left: i32, right: i32) -> Result<(), HardwareError> {
        debug!(left, right, "sim position move");
        Ok(())
    }

    fn brake(&mut self) -> Result<(), HardwareError> {
        self.last_speed = (0, 0);
        self.braked = true;
        debug!("sim brake");
        Ok(())
    }

    fn wait(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Distance-sensor stand-in with fixed readings
#[derive(Debug)]
pub struct SimSensors {
    pub front_cm: f32,
    pub side_front_cm: f32,
    pub side_rear_cm: f32,
}

impl Default for SimSensors {
    fn default() -> Self {
        Self {
            front_cm: 120.0,
            side_front_cm: 30.0,
            side_rear_cm: 30.0,
        }
    }
}

impl DistanceSensors for SimSensors {
    fn read_raw(&mut self) -> Result<[u16; 3], HardwareError> {
        Ok([
            cm_to_raw(self.front_cm),
            cm_to_raw(self.side_front_cm),
            cm_to_raw(self.side_rear_cm),
        ])
    }
}

/// Inverse of the sensor linearization, for synthesizing raw codes
fn cm_to_raw(cm: f32) -> u16 {
    (6787.0 / (cm + 4.0) + 3.0).round() as u16
}

/// Indicator stand-in; logs instead of driving LEDs
#[derive(Debug, Default)]
pub struct SimIndicator {
    pub last_mask: u8,
}

impl Indicator for SimIndicator {
    fn set_lights(&mut self, mask: u8) {
        self.last_mask = mask;
        debug!("sim lights {mask:04b}");
    }

    fn beep(&mut self, count: u8) {
        info!(count, "sim beep");
    }
}

/// Synthetic camera: a dark line wandering over a bright floor, delivered in
/// the packed 2-byte/pixel layout the real driver uses.
pub struct SyntheticCamera {
    width: usize,
    height: usize,
    tick: u64,
    buffer: Vec<u8>,
}

impl SyntheticCamera {
    pub fn new(config: &CaptureConfig) -> Self {
        let width = config.width as usize;
        let height = config.height as usize;
        Self {
            width,
            height,
            tick: 0,
            buffer: vec![0; width * height * 2],
        }
    }

    /// Render the next frame and return the packed buffer
    pub fn next_frame(&mut self) -> &[u8] {
        const LINE_WIDTH: usize = 14;
        const FLOOR_LEVEL: u8 = 200;
        const LINE_LEVEL: u8 = 20;

        let drift = ((self.tick as f32) * 0.05).sin() * (self.width as f32 * 0.12);
        let line_x = (self.width / 2) as i64 + drift as i64;

        for row in 0..self.height {
            for col in 0..self.width {
                let in_line =
                    (col as i64) >= line_x && (col as i64) < line_x + LINE_WIDTH as i64;
                self.buffer[(row * self.width + col) * 2] =
                    if in_line { LINE_LEVEL } else { FLOOR_LEVEL };
            }
        }
        self.tick += 1;
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use line_vision::{LineSegmenter, SegmenterConfig};

    #[test]
    fn test_synthetic_frame_segments_to_a_line() {
        let config = CaptureConfig::default();
        let mut camera = SyntheticCamera::new(&config);
        let raw = camera.next_frame().to_vec();

        let mut frame =
            frame_capture::Frame::from_packed(&raw, config.width, config.height).unwrap();
        let segmenter = LineSegmenter::new(&SegmenterConfig::default());
        let slice = segmenter.extract_band(frame.data_mut(), 160..240);

        assert!(slice.mass > 0);
        assert!((slice.x - 160).abs() < 30);
    }

    #[test]
    fn test_sensor_codes_roundtrip_through_linearization() {
        let mut sensors = SimSensors {
            front_cm: 25.0,
            side_front_cm: 40.0,
            side_rear_cm: 60.0,
        };
        let reading = sensors.read_cm().unwrap();
        assert!((reading.front - 25.0).abs() < 1.0);
        assert!((reading.side_front - 40.0).abs() < 1.0);
        assert!((reading.side_rear - 60.0).abs() < 1.5);
    }
}
