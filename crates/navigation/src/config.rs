//! Navigation configuration

use motion_control::PidGains;
use serde::{Deserialize, Serialize};

/// Navigation thresholds, speeds and gains.
///
/// The mass windows are pixel counts from the lower band; they mark the
/// painted track features (acquisition stripe, crossing marker, end marker)
/// and were measured on the reference track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Raw-mass window that confirms line acquisition in `GotoLine`
    pub mass_acquire: (i32, i32),
    /// Smoothed-mass window of the crossing marker ending `FollowLine`
    pub mass_cross: (i32, i32),
    /// Smoothed-mass window that re-acquires the line after the wall leg
    pub mass_wall_to_line: (i32, i32),
    /// Smoothed mass ending `FollowLineAfterWall`
    pub mass_after_wall: i32,
    /// Smoothed mass ending `FollowLineSpeedy`
    pub mass_speedy_end: i32,
    /// Above this the follow states ignore the frame entirely
    pub mass_freeze: i32,
    /// Moving-average window for the smoothed mass
    pub mass_window: usize,

    /// Speed while hunting for the line
    pub speed_search: u8,
    /// Base speed in `FollowLine`
    pub speed_slow: u8,
    /// Base speed in `FollowLineAfterWall`
    pub speed_normal: u8,
    /// Base speed in `FollowLineSpeedy`
    pub speed_fast: u8,
    /// Base speed along the wall
    pub speed_wall: u8,
    /// Speed while driving up to a wall
    pub speed_approach: u8,

    /// Line-follow gains (slow and normal legs)
    pub line_gains: PidGains,
    /// Line-follow gains for the speedy leg
    pub line_gains_fast: PidGains,
    /// Wall-follow gains
    pub wall_gains: PidGains,
    /// Upper-band look-ahead damping: slowdown = k_error * |upper error|
    pub k_error: f32,
    /// Error clamp fed to both PIDs
    pub max_error: f32,
    /// Anti-windup trip level
    pub integral_clamp: f32,

    /// Side-distance set point while wall following (cm)
    pub wall_set_point: f32,
    /// Weight of the front/rear side-sensor difference in the process value
    pub wall_diff_gain: f32,
    /// Front-distance acceptance band for the wall approach (cm)
    pub wall_front_band: (f32, f32),
    /// Front-distance acceptance band for `StickToWall` (cm)
    pub stick_front_band: (f32, f32),
    /// Max max-min spread of the debounce window (cm)
    pub wall_spread_limit: f32,
    /// Rear-side clearance ending the first straight leg (cm)
    pub wall_clear_1: f32,
    /// Rear-side clearance ending the second straight leg (cm)
    pub wall_clear_2: f32,

    /// Settle frames armed entering `FromWallToLine` and `FollowLineAfterWall`
    pub settle_after_wall: u32,
    /// Settle frames armed entering `FollowLineSpeedy`
    pub settle_speedy: u32,

    /// Encoder pulses per degree of in-place rotation
    pub pulses_per_degree: f32,
    /// Driver settling time after a position move (ms)
    pub rotate_wait_ms: u64,
    /// Driver settling time after a brake (ms)
    pub brake_wait_ms: u64,
    /// Pause in `EndOfLine` before heading for the wall (ms)
    pub end_of_line_delay_ms: u64,
    /// Short straight run after wall-corner turns (ms)
    pub straight_wait_ms: u64,
    /// Corner turn between the two wall legs (degrees)
    pub wall_corner_degrees: f32,
    /// Beeps in the track-completed celebration
    pub celebration_beeps: u8,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            mass_acquire: (5000, 6000),
            mass_cross: (26000, 33000),
            mass_wall_to_line: (10000, 33000),
            mass_after_wall: 20000,
            mass_speedy_end: 23000,
            mass_freeze: 40000,
            mass_window: 10,

            speed_search: 80,
            speed_slow: 100,
            speed_normal: 140,
            speed_fast: 180,
            speed_wall: 120,
            speed_approach: 90,

            line_gains: PidGains {
                kp: 0.5,
                ki: 0.15,
                kd: 0.3,
            },
            line_gains_fast: PidGains {
                kp: 0.7,
                ki: 0.1,
                kd: 0.45,
            },
            wall_gains: PidGains {
                kp: 2.0,
                ki: 0.2,
                kd: 1.0,
            },
            k_error: 0.5,
            max_error: 160.0,
            integral_clamp: 500.0,

            wall_set_point: 30.0,
            wall_diff_gain: 0.5,
            wall_front_band: (10.0, 40.0),
            stick_front_band: (10.0, 30.0),
            wall_spread_limit: 4.0,
            wall_clear_1: 60.0,
            wall_clear_2: 60.0,

            settle_after_wall: 100,
            settle_speedy: 30,

            pulses_per_degree: 3.2,
            rotate_wait_ms: 800,
            brake_wait_ms: 300,
            end_of_line_delay_ms: 1000,
            straight_wait_ms: 400,
            wall_corner_degrees: 98.0,
            celebration_beeps: 3,
        }
    }
}
