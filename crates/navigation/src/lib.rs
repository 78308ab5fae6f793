//! Navigation state machine
//!
//! Drives the vehicle through the scripted track: acquire the line, follow
//! it, leave for the wall, return to the line, speed up, and finish with two
//! wall-following legs. The machine consumes one segmentation result per
//! camera frame and talks to the motor, distance-sensor and indicator
//! collaborators through the traits in [`hardware`].

pub mod approach;
pub mod config;
pub mod hardware;
pub mod machine;
pub mod record;
pub mod state;

pub use approach::WallApproach;
pub use config::NavigationConfig;
pub use hardware::{
    DistanceReading, DistanceSensors, DriveMode, HardwareError, Indicator, MotorController,
};
pub use machine::NavigationMachine;
pub use record::LogRecord;
pub use state::{NavigationHandle, NavigationState, WallPhase};

use thiserror::Error;

/// Navigation error types
#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("hardware fault: {0}")]
    Hardware(#[from] HardwareError),

    #[error("shared state poisoned")]
    Poisoned,
}
