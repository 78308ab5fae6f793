//! Discrete PID controller

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Proportional/integral/derivative gains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

/// One step's term breakdown, kept for the control log
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidOutput {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

impl PidOutput {
    pub fn correction(&self) -> f32 {
        self.p + self.i + self.d
    }
}

/// Discrete PID with an exponential-forgetting integral.
///
/// Each step halves the accumulated integral before adding the new error:
/// `integral = 0.5 * integral + error`. If the magnitude exceeds the clamp
/// the integral trips to zero rather than saturating. The drive gains are
/// tuned against exactly this transfer function, so neither the 0.5 decay
/// nor the trip-to-zero may be replaced with a textbook accumulator.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    set_point: f32,
    max_error: f32,
    integral_clamp: f32,
    integral_sum: f32,
    last_error: f32,
}

impl PidController {
    pub fn new(gains: PidGains, set_point: f32, max_error: f32, integral_clamp: f32) -> Self {
        Self {
            gains,
            set_point,
            max_error,
            integral_clamp,
            integral_sum: 0.0,
            last_error: 0.0,
        }
    }

    /// Swap gains in place (slow/fast line-follow switch). Integral state
    /// carries over; callers that want a clean start call `reset`.
    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    pub fn set_point(&self) -> f32 {
        self.set_point
    }

    /// Advance the controller one sample
    pub fn step(&mut self, error: f32) -> PidOutput {
        let error = error.clamp(-self.max_error, self.max_error);

        let p = error * self.gains.kp;

        self.integral_sum = 0.5 * self.integral_sum + error;
        if self.integral_sum.abs() > self.integral_clamp {
            debug!(sum = self.integral_sum, "integral wind-up tripped");
            self.integral_sum = 0.0;
        }
        let i = self.integral_sum * self.gains.ki;

        let d = (error - self.last_error) * self.gains.kd;
        self.last_error = error;

        PidOutput { p, i, d }
    }

    /// Zero the integral and derivative history
    pub fn reset(&mut self) {
        self.integral_sum = 0.0;
        self.last_error = 0.0;
    }

    #[cfg(test)]
    fn integral_sum(&self) -> f32 {
        self.integral_sum
    }
}
