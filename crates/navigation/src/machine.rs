//! The navigation machine

use crate::approach::WallApproach;
use crate::config::NavigationConfig;
use crate::hardware::{
    DistanceReading, DistanceSensors, DriveMode, Indicator, MotorController, DIR_FORWARD,
};
use crate::record::LogRecord;
use crate::state::{NavigationHandle, NavigationState, WallPhase};
use crate::NavigationError;
use chrono::Utc;
use line_vision::Slice;
use motion_control::{differential_speeds, MovingAverage, PidController, PidOutput};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Frames spent blinking in the track-completed celebration
const CELEBRATION_TICKS: u8 = 13;

/// Scripted navigation machine.
///
/// `update` is called once per captured frame with the segmentation result
/// and never blocks on anything but the hardware driver itself: the wall
/// maneuvers that historically looped over the distance sensors are ticked
/// one sample per frame through [`WallApproach`], so an external stop takes
/// effect at the next frame no matter where the script is.
pub struct NavigationMachine<M, D, I>
where
    M: MotorController,
    D: DistanceSensors,
    I: Indicator,
{
    config: NavigationConfig,
    handle: NavigationHandle,
    motors: Arc<Mutex<M>>,
    sensors: D,
    indicator: Arc<Mutex<I>>,
    line_pid: PidController,
    wall_pid: PidController,
    mass_avg: MovingAverage,
    settle: u32,
    approach: Option<WallApproach>,
    step: u8,
    last_state: NavigationState,
    frame_index: u64,
    log_tx: Option<Sender<LogRecord>>,
}

impl<M, D, I> NavigationMachine<M, D, I>
where
    M: MotorController,
    D: DistanceSensors,
    I: Indicator,
{
    pub fn new(
        config: NavigationConfig,
        handle: NavigationHandle,
        motors: Arc<Mutex<M>>,
        sensors: D,
        indicator: Arc<Mutex<I>>,
    ) -> Self {
        let line_pid = PidController::new(
            config.line_gains,
            0.0,
            config.max_error,
            config.integral_clamp,
        );
        let wall_pid = PidController::new(
            config.wall_gains,
            config.wall_set_point,
            config.max_error,
            config.integral_clamp,
        );
        let mass_avg = MovingAverage::new(config.mass_window.max(1));
        let last_state = handle.state();
        Self {
            config,
            handle,
            motors,
            sensors,
            indicator,
            line_pid,
            wall_pid,
            mass_avg,
            settle: 0,
            approach: None,
            step: 0,
            last_state,
            frame_index: 0,
            log_tx: None,
        }
    }

    /// Attach the control-log channel
    pub fn with_log_channel(mut self, tx: Sender<LogRecord>) -> Self {
        self.log_tx = Some(tx);
        self
    }

    /// Advance the script by one frame
    pub fn update(&mut self, mass: i32, upper: Slice, lower: Slice) -> Result<(), NavigationError> {
        self.frame_index += 1;

        if self.handle.take_stop() {
            self.discard_maneuver();
        }

        let state = self.handle.state();
        if state != self.last_state {
            // externally forced state: drop any in-flight maneuver progress
            self.step = 0;
            self.approach = None;
            self.last_state = state;
        }

        let smoothed = self.mass_avg.add(mass as f32) as i32;

        match state {
            NavigationState::Calibrate | NavigationState::Waiting => Ok(()),
            NavigationState::Start => self.on_start(),
            NavigationState::GotoLine => self.on_goto_line(mass),
            NavigationState::FollowLine => self.on_follow_line(smoothed, upper, lower, mass),
            NavigationState::GotoWall => self.on_goto_wall(upper, lower),
            NavigationState::FromWallToLine => self.on_from_wall_to_line(smoothed),
            NavigationState::FollowLineAfterWall => {
                self.on_follow_after_wall(smoothed, upper, lower, mass)
            }
            NavigationState::FollowLineSpeedy => {
                self.on_follow_speedy(smoothed, upper, lower, mass)
            }
            NavigationState::EndOfLine => self.on_end_of_line(),
            NavigationState::StickToWall => self.on_stick_to_wall(),
            NavigationState::StraightUntilWallGone(phase) => self.on_straight_until_gone(phase),
            NavigationState::FollowWall(phase) => self.on_follow_wall(phase, mass),
            NavigationState::TrackCompleted => self.on_track_completed(),
        }
    }

    fn on_start(&mut self) -> Result<(), NavigationError> {
        {
            let mut motors = self.motors()?;
            motors.set_dir(DIR_FORWARD)?;
            motors.set_mode(DriveMode::Speed)?;
            motors.set_speed(self.config.speed_search, self.config.speed_search)?;
        }
        self.transition(NavigationState::GotoLine);
        Ok(())
    }

    fn on_goto_line(&mut self, mass: i32) -> Result<(), NavigationError> {
        let (lo, hi) = self.config.mass_acquire;
        if mass >= lo && mass <= hi {
            self.rotate(45.0)?;
            self.motors()?.set_mode(DriveMode::Speed)?;
            self.transition(NavigationState::FollowLine);
        }
        Ok(())
    }

    fn on_follow_line(
        &mut self,
        smoothed: i32,
        upper: Slice,
        lower: Slice,
        mass: i32,
    ) -> Result<(), NavigationError> {
        let (lo, hi) = self.config.mass_cross;
        if smoothed >= lo && smoothed <= hi {
            self.brake_and_wait()?;
            self.transition(NavigationState::GotoWall);
            return Ok(());
        }
        if smoothed > hi {
            // Freeze: leave the previous motor command in effect this frame
            return Ok(());
        }
        self.line_control(self.config.speed_slow, upper, lower, mass)
    }

    fn on_goto_wall(&mut self, upper: Slice, lower: Slice) -> Result<(), NavigationError> {
        if self.step == 0 {
            // Square up against the line before leaving it
            let heading = heading_degrees(upper, lower);
            self.rotate(90.0 - heading)?;
            {
                let mut motors = self.motors()?;
                motors.set_dir(DIR_FORWARD)?;
                motors.set_mode(DriveMode::Straight)?;
                motors.set_speed(self.config.speed_approach, self.config.speed_approach)?;
            }
            self.approach = Some(WallApproach::new(
                self.config.wall_front_band,
                self.config.wall_spread_limit,
            ));
            self.step = 1;
            return Ok(());
        }

        if self.approach_reached()? {
            self.brake_and_wait()?;
            self.rotate(135.0)?;
            {
                let mut motors = self.motors()?;
                motors.set_mode(DriveMode::Straight)?;
                motors.set_speed(self.config.speed_normal, self.config.speed_normal)?;
            }
            self.mass_avg.clear();
            self.settle = self.config.settle_after_wall;
            self.transition(NavigationState::FromWallToLine);
        }
        Ok(())
    }

    fn on_from_wall_to_line(&mut self, smoothed: i32) -> Result<(), NavigationError> {
        if self.settle > 0 {
            self.settle -= 1;
            return Ok(());
        }
        let (lo, hi) = self.config.mass_wall_to_line;
        if smoothed > lo && smoothed < hi {
            self.settle = self.config.settle_after_wall;
            self.transition(NavigationState::FollowLineAfterWall);
        }
        Ok(())
    }

    fn on_follow_after_wall(
        &mut self,
        smoothed: i32,
        upper: Slice,
        lower: Slice,
        mass: i32,
    ) -> Result<(), NavigationError> {
        self.line_control(self.config.speed_normal, upper, lower, mass)?;
        if self.settle > 0 {
            self.settle -= 1;
            return Ok(());
        }
        if smoothed > self.config.mass_after_wall {
            self.line_pid.set_gains(self.config.line_gains_fast);
            self.settle = self.config.settle_speedy;
            self.transition(NavigationState::FollowLineSpeedy);
        }
        Ok(())
    }

    fn on_follow_speedy(
        &mut self,
        smoothed: i32,
        upper: Slice,
        lower: Slice,
        mass: i32,
    ) -> Result<(), NavigationError> {
        if smoothed > self.config.mass_freeze {
            // Freeze: no control action this frame
            return Ok(());
        }
        if self.settle > 0 {
            self.settle -= 1;
            return self.line_control(self.config.speed_fast, upper, lower, mass);
        }
        if smoothed > self.config.mass_speedy_end {
            self.brake_and_wait()?;
            self.transition(NavigationState::EndOfLine);
            return Ok(());
        }
        self.line_control(self.config.speed_fast, upper, lower, mass)
    }

    fn on_end_of_line(&mut self) -> Result<(), NavigationError> {
        let delay = self.config.end_of_line_delay_ms;
        self.motors()?.wait(delay);
        self.transition(NavigationState::StickToWall);
        Ok(())
    }

    fn on_stick_to_wall(&mut self) -> Result<(), NavigationError> {
        if self.step == 0 {
            {
                let mut motors = self.motors()?;
                motors.set_dir(DIR_FORWARD)?;
                motors.set_mode(DriveMode::Straight)?;
                motors.set_speed(self.config.speed_approach, self.config.speed_approach)?;
            }
            self.approach = Some(WallApproach::new(
                self.config.stick_front_band,
                self.config.wall_spread_limit,
            ));
            self.step = 1;
            return Ok(());
        }

        if self.approach_reached()? {
            self.brake_and_wait()?;
            self.rotate(90.0)?;
            {
                let mut motors = self.motors()?;
                motors.set_mode(DriveMode::Straight)?;
                motors.set_speed(self.config.speed_wall, self.config.speed_wall)?;
                let wait = self.config.straight_wait_ms;
                motors.wait(wait);
            }
            self.transition(NavigationState::StraightUntilWallGone(WallPhase::First));
        }
        Ok(())
    }

    fn on_straight_until_gone(&mut self, phase: WallPhase) -> Result<(), NavigationError> {
        let Some(reading) = self.read_distances() else {
            return Ok(());
        };
        let threshold = match phase {
            WallPhase::First => self.config.wall_clear_1,
            WallPhase::Second => self.config.wall_clear_2,
        };
        if reading.side_rear <= threshold {
            return Ok(());
        }

        // The wall behind us is gone: turn back toward it and run its face
        self.rotate(-90.0)?;
        {
            let mut motors = self.motors()?;
            motors.set_mode(DriveMode::Straight)?;
            motors.set_speed(self.config.speed_wall, self.config.speed_wall)?;
            let wait = self.config.straight_wait_ms;
            motors.wait(wait);
        }
        match phase {
            WallPhase::First => {
                self.transition(NavigationState::StraightUntilWallGone(WallPhase::Second));
            }
            WallPhase::Second => {
                self.wall_pid.reset();
                self.transition(NavigationState::FollowWall(WallPhase::First));
            }
        }
        Ok(())
    }

    fn on_follow_wall(&mut self, phase: WallPhase, mass: i32) -> Result<(), NavigationError> {
        if self.approach.is_none() {
            self.approach = Some(WallApproach::new(
                self.config.wall_front_band,
                self.config.wall_spread_limit,
            ));
        }
        let Some(reading) = self.read_distances() else {
            return Ok(());
        };

        let pv = (self.config.wall_set_point - reading.side_front)
            + (reading.side_rear - reading.side_front) * self.config.wall_diff_gain;
        let out = self.wall_pid.step(pv);
        let correction = out.correction();
        let base = self.config.speed_wall as f32;
        let (left, right) = differential_speeds(base, 0.0, correction);
        let tacho = {
            let mut motors = self.motors()?;
            motors.set_speed(left, right)?;
            motors.tachometer().unwrap_or(None)
        };
        self.emit_log(
            pv as i32,
            0,
            mass,
            out,
            left,
            right,
            base - correction,
            base + correction,
            tacho,
        );

        let settled = match self.approach.as_mut() {
            Some(approach) => approach.tick(reading.front),
            None => false,
        };
        if settled {
            self.brake_and_wait()?;
            match phase {
                WallPhase::First => {
                    self.rotate(self.config.wall_corner_degrees)?;
                    self.wall_pid.reset();
                    {
                        let mut motors = self.motors()?;
                        motors.set_mode(DriveMode::Straight)?;
                        motors.set_speed(self.config.speed_wall, self.config.speed_wall)?;
                    }
                    self.transition(NavigationState::FollowWall(WallPhase::Second));
                }
                WallPhase::Second => {
                    self.transition(NavigationState::TrackCompleted);
                }
            }
        }
        Ok(())
    }

    fn on_track_completed(&mut self) -> Result<(), NavigationError> {
        match self.step {
            0 => {
                self.rotate(360.0)?;
                self.step = 1;
            }
            step if step < CELEBRATION_TICKS => {
                let lights = if step % 2 == 1 { 0x0F } else { 0x00 };
                self.indicator()?.set_lights(lights);
                self.step += 1;
            }
            _ => {
                {
                    let mut indicator = self.indicator()?;
                    indicator.set_lights(0);
                    indicator.beep(self.config.celebration_beeps);
                }
                self.transition(NavigationState::Waiting);
            }
        }
        Ok(())
    }

    /// Run the line PID against the lower-slice error and drive the motors.
    /// The upper-slice error damps the base speed ahead of curves.
    fn line_control(
        &mut self,
        speed: u8,
        upper: Slice,
        lower: Slice,
        mass: i32,
    ) -> Result<(), NavigationError> {
        let out = self.line_pid.step(lower.error as f32);
        let correction = out.correction();
        let slowdown = self.config.k_error * (upper.error as f32).abs();
        let base = speed as f32;
        let (left, right) = differential_speeds(base, slowdown, correction);
        let tacho = {
            let mut motors = self.motors()?;
            motors.set_speed(left, right)?;
            motors.tachometer().unwrap_or(None)
        };
        self.emit_log(
            lower.error,
            upper.error,
            mass,
            out,
            left,
            right,
            base - slowdown - correction,
            base - slowdown + correction,
            tacho,
        );
        Ok(())
    }

    /// Feed one front-distance sample to the active approach window
    fn approach_reached(&mut self) -> Result<bool, NavigationError> {
        let Some(reading) = self.read_distances() else {
            return Ok(false);
        };
        Ok(match self.approach.as_mut() {
            Some(approach) => approach.tick(reading.front),
            None => false,
        })
    }

    /// A failed read is "no new information": the current frame makes no
    /// distance-based decision rather than acting on stale or zero data.
    fn read_distances(&mut self) -> Option<DistanceReading> {
        match self.sensors.read_cm() {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!(error = %e, "distance read failed; holding state");
                None
            }
        }
    }

    fn brake_and_wait(&mut self) -> Result<(), NavigationError> {
        let mut motors = self.motors()?;
        motors.brake()?;
        let wait = self.config.brake_wait_ms;
        motors.wait(wait);
        Ok(())
    }

    /// In-place rotation by the given angle via a pulse-counted position move
    fn rotate(&mut self, degrees: f32) -> Result<(), NavigationError> {
        let pulses = (degrees * self.config.pulses_per_degree).round() as i32;
        let mut motors = self.motors()?;
        motors.set_mode(DriveMode::Position)?;
        motors.goto_position(pulses, -pulses)?;
        let wait = self.config.rotate_wait_ms;
        motors.wait(wait);
        Ok(())
    }

    fn transition(&mut self, next: NavigationState) {
        self.handle.set_state(next);
        self.last_state = next;
        self.step = 0;
        self.approach = None;
    }

    fn discard_maneuver(&mut self) {
        self.line_pid.reset();
        self.line_pid.set_gains(self.config.line_gains);
        self.wall_pid.reset();
        self.mass_avg.clear();
        self.settle = 0;
        self.step = 0;
        self.approach = None;
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_log(
        &self,
        error_lower: i32,
        error_upper: i32,
        mass: i32,
        out: PidOutput,
        left: u8,
        right: u8,
        ref_left: f32,
        ref_right: f32,
        tacho: Option<(i32, i32)>,
    ) {
        let Some(tx) = &self.log_tx else {
            return;
        };
        // The collector disappearing mid-shutdown is not an error here
        let _ = tx.send(LogRecord {
            timestamp: Utc::now(),
            frame_index: self.frame_index,
            error_lower,
            error_upper,
            mass,
            p: out.p,
            i: out.i,
            d: out.d,
            correction: out.correction(),
            speed_left: left,
            speed_right: right,
            speed_ref_left: ref_left,
            speed_ref_right: ref_right,
            tacho_left: tacho.map(|t| t.0),
            tacho_right: tacho.map(|t| t.1),
        });
    }

    fn motors(&self) -> Result<MutexGuard<'_, M>, NavigationError> {
        self.motors.lock().map_err(|_| NavigationError::Poisoned)
    }

    fn indicator(&self) -> Result<MutexGuard<'_, I>, NavigationError> {
        self.indicator.lock().map_err(|_| NavigationError::Poisoned)
    }
}

/// Line heading relative to straight ahead, from the two band centroids.
/// Zero when either band is empty or the centroids stack vertically.
fn heading_degrees(upper: Slice, lower: Slice) -> f32 {
    if !upper.visible() || !lower.visible() {
        return 0.0;
    }
    let dx = (upper.x - lower.x) as f32;
    let dy = (lower.y - upper.y) as f32;
    dx.atan2(dy).to_degrees()
}
