use crate::geometry::Vec2;
use serde::{Deserialize, Serialize};

/// Gain triple for a PID control loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub kd: f64,
    pub ki: f64,
}

impl PidGains {
    pub const fn new(kp: f64, kd: f64, ki: f64) -> Self {
        Self { kp, kd, ki }
    }
}

/// Scalar PID loop. The integral term accumulates across calls, so a
/// fresh instance is needed for each control episode.
#[derive(Debug, Clone)]
pub struct Pid {
    gains: PidGains,
    i_error: f64,
}

impl Pid {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            i_error: 0.0,
        }
    }

    /// Control output for the given proportional and derivative errors.
    ///
    /// The caller supplies both errors directly; this loop does not
    /// differentiate the proportional error itself.
    pub fn get_control(&mut self, p_error: f64, d_error: f64, delta: f64) -> f64 {
        self.i_error += p_error * delta;
        self.gains.kp * p_error + self.gains.kd * d_error + self.gains.ki * self.i_error
    }
}

/// Planar PID loop applying the same gains to both axes.
#[derive(Debug, Clone)]
pub struct Pid2 {
    gains: PidGains,
    i_error: Vec2,
}

impl Pid2 {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            i_error: Vec2::ZERO,
        }
    }

    pub fn get_control(&mut self, p_error: Vec2, d_error: Vec2, delta: f64) -> Vec2 {
        self.i_error += p_error * delta;
        p_error * self.gains.kp + d_error * self.gains.kd + self.i_error * self.gains.ki
    }
}
