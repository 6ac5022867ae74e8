use crate::config::DroneConfig;
use crate::geometry::{SquareExtent, Vec2, circle_intersects_square};
use crate::roomba::Roomba;
use std::f64::consts::TAU;

/// The controllable drone. Commands arrive in the body frame and
/// persist until replaced; physics advances once per tick.
#[derive(Debug, Clone)]
pub struct Drone {
    cfg: DroneConfig,
    xy_pos: Vec2,
    xy_vel: Vec2,
    xy_accel: Vec2,
    yaw: f64,
    yaw_vel: f64,
    z_pos: f64,
    z_vel: f64,
    cmd_xy_accel: Vec2,
    cmd_yaw_vel: f64,
    cmd_z_vel: f64,
}

impl Drone {
    pub fn new(cfg: DroneConfig) -> Self {
        let start_pos = cfg.start_pos;
        let start_yaw = cfg.start_yaw.rem_euclid(TAU);
        Self {
            cfg,
            xy_pos: start_pos,
            xy_vel: Vec2::ZERO,
            xy_accel: Vec2::ZERO,
            yaw: start_yaw,
            yaw_vel: 0.0,
            z_pos: 0.0,
            z_vel: 0.0,
            cmd_xy_accel: Vec2::ZERO,
            cmd_yaw_vel: 0.0,
            cmd_z_vel: 0.0,
        }
    }

    /// Returns the drone to its spawn pose with all motion cleared.
    pub fn reset(&mut self) {
        *self = Self::new(self.cfg.clone());
    }

    pub fn xy_pos(&self) -> Vec2 {
        self.xy_pos
    }

    pub fn xy_vel(&self) -> Vec2 {
        self.xy_vel
    }

    pub fn xy_accel(&self) -> Vec2 {
        self.xy_accel
    }

    /// Yaw in radians, always within [0, 2pi).
    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn yaw_vel(&self) -> f64 {
        self.yaw_vel
    }

    pub fn z_pos(&self) -> f64 {
        self.z_pos
    }

    pub fn z_vel(&self) -> f64 {
        self.z_vel
    }

    pub fn is_grounded(&self) -> bool {
        self.z_pos <= 0.0
    }

    /// Replaces the persistent control command.
    ///
    /// `xy_accel` is a body-frame acceleration; `yaw_vel` and `z_vel`
    /// are rate commands. Everything is clamped to the configured
    /// limits here, at the command boundary.
    pub fn control(&mut self, xy_accel: Vec2, yaw_vel: f64, z_vel: f64) {
        self.cmd_xy_accel = xy_accel.clamp_norm(self.cfg.max_xy_accel);
        self.cmd_yaw_vel = yaw_vel.clamp(-self.cfg.max_yaw_vel, self.cfg.max_yaw_vel);
        self.cmd_z_vel = z_vel.clamp(-self.cfg.max_z_vel, self.cfg.max_z_vel);
    }

    /// Advances the physics by one step of `delta` seconds.
    ///
    /// Altitude integrates first so a touchdown grounds the drone and
    /// skips the rest of the step. Grounding zeroes every velocity but
    /// leaves the stored command intact, so a climb command lifts the
    /// drone again on the next tick.
    pub fn update(&mut self, delta: f64) {
        self.z_vel = self.cmd_z_vel;
        self.z_pos += self.z_vel * delta;
        if self.z_pos <= 0.0 {
            self.z_pos = 0.0;
            self.z_vel = 0.0;
            self.yaw_vel = 0.0;
            self.xy_vel = Vec2::ZERO;
            self.xy_accel = Vec2::ZERO;
            return;
        }

        self.yaw_vel = self.cmd_yaw_vel;
        self.yaw = (self.yaw + self.yaw_vel * delta).rem_euclid(TAU);

        // Body-frame command rotated by the already-updated yaw.
        self.xy_accel = self.cmd_xy_accel.rotated(self.yaw);
        self.xy_vel = (self.xy_vel + self.xy_accel * delta).clamp_norm(self.cfg.max_xy_vel);
        self.xy_pos += self.xy_vel * delta;
    }

    /// True when the landed pad overlaps the roomba's top switch.
    pub fn is_touching_roomba_top(&self, roomba: &Roomba) -> bool {
        self.z_pos < self.cfg.pad_activation_height
            && self.xy_pos.distance(roomba.pos()) < self.cfg.pad_radius
    }

    /// True when the base square overlaps the roomba's bumper circle.
    pub fn is_blocking_roomba(&self, roomba: &Roomba, roomba_radius: f64) -> bool {
        self.z_pos < self.cfg.pad_activation_height
            && circle_intersects_square(
                roomba.pos(),
                roomba_radius,
                SquareExtent::new(self.xy_pos, self.yaw, self.cfg.base_width),
            )
    }
}
