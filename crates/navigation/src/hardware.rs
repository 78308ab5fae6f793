//! Hardware collaborator traits
//!
//! The real motor controller, distance sensors and LED/beeper sit behind an
//! I2C bus owned by driver code outside this crate. The machine only ever
//! sees these traits, so tests and the simulator substitute mocks.

use thiserror::Error;

/// Sensor ceiling returned when a raw code is out of the linearizable range
pub const MAX_RANGE_CM: f32 = 150.0;

/// Direction mask: both wheels forward
pub const DIR_FORWARD: u8 = 0b0101;

/// Hardware error types
#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("Bus transfer failed: {0}")]
    Bus(String),

    #[error("Device not responding: {0}")]
    NotResponding(String),
}

/// Motor drive mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    /// Open differential speed control
    Speed,
    /// Pulse-counted position moves (rotations)
    Position,
    /// Regulated straight driving
    Straight,
}

/// Motor controller collaborator.
///
/// Speeds are `[0, 255]`. `wait` blocks for the driver's own settling time
/// after position moves and brakes; the mock implementations make it a no-op
/// so tests run at full speed.
pub trait MotorController: Send {
    fn set_speed(&mut self, left: u8, right: u8) -> Result<(), HardwareError>;
    fn set_dir(&mut self, mask: u8) -> Result<(), HardwareError>;
    fn set_mode(&mut self, mode: DriveMode) -> Result<(), HardwareError>;
    fn goto_position(&mut self, left_pulses: i32, right_pulses: i32) -> Result<(), HardwareError>;
    fn brake(&mut self) -> Result<(), HardwareError>;
    fn wait(&mut self, ms: u64);

    /// Pulse counters, when the driver exposes them
    fn tachometer(&mut self) -> Result<Option<(i32, i32)>, HardwareError> {
        Ok(None)
    }
}

/// One distance-sensor sweep, in centimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceReading {
    pub front: f32,
    pub side_front: f32,
    pub side_rear: f32,
}

/// Distance sensor collaborator
pub trait DistanceSensors: Send {
    /// Raw sensor codes: `[front, side_front, side_rear]`
    fn read_raw(&mut self) -> Result<[u16; 3], HardwareError>;

    /// All three channels converted to centimeters
    fn read_cm(&mut self) -> Result<DistanceReading, HardwareError> {
        let [front, side_front, side_rear] = self.read_raw()?;
        Ok(DistanceReading {
            front: raw_to_cm(front),
            side_front: raw_to_cm(side_front),
            side_rear: raw_to_cm(side_rear),
        })
    }
}

/// LED / beeper collaborator
pub trait Indicator: Send {
    fn set_lights(&mut self, mask: u8);
    fn beep(&mut self, count: u8);
}

/// Sensor linearization: raw code to centimeters.
///
/// Inverse-distance characteristic of the IR rangers; codes at or below the
/// offset are out of range and clamp to [`MAX_RANGE_CM`].
pub fn raw_to_cm(raw: u16) -> f32 {
    if raw <= 3 {
        return MAX_RANGE_CM;
    }
    let cm = 6787.0 / (raw as f32 - 3.0) - 4.0;
    cm.clamp(0.0, MAX_RANGE_CM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_to_cm_monotonic_decreasing() {
        assert!(raw_to_cm(100) > raw_to_cm(200));
        assert!(raw_to_cm(200) > raw_to_cm(400));
    }

    #[test]
    fn test_raw_to_cm_out_of_range_clamps() {
        assert_eq!(raw_to_cm(0), MAX_RANGE_CM);
        assert_eq!(raw_to_cm(3), MAX_RANGE_CM);
        assert!(raw_to_cm(4) <= MAX_RANGE_CM);
    }
}
