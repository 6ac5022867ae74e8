use crate::arena::Arena;
use crate::config::ControlConfig;
use crate::geometry::Vec2;
use crate::pid::{Pid, Pid2};
use crate::sensors::StateController;
use crate::task::{Task, TaskOutcome, TaskUpdate};

/// Holds the drone down for the configured delay, then climbs at a
/// fixed rate until the completion height is reached.
pub struct TakeoffTask {
    velocity: f64,
    complete_height: f64,
    delay_ms: f64,
    started_at_ms: Option<f64>,
}

impl TakeoffTask {
    pub fn new(cfg: &ControlConfig) -> Self {
        Self {
            velocity: cfg.takeoff_velocity,
            complete_height: cfg.takeoff_complete_height,
            delay_ms: cfg.takeoff_delay_s * 1000.0,
            started_at_ms: None,
        }
    }

    fn step(
        &mut self,
        elapsed_ms: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> Result<TaskUpdate, TaskOutcome> {
        let odometry = sensors.drone(arena)?;
        let started_at = *self.started_at_ms.get_or_insert(elapsed_ms);
        if elapsed_ms - started_at < self.delay_ms {
            arena.drone_mut().control(Vec2::ZERO, 0.0, 0.0);
            return Ok(TaskUpdate::Continue);
        }
        if odometry.z_pos >= self.complete_height {
            arena.drone_mut().control(Vec2::ZERO, 0.0, 0.0);
            return Ok(TaskUpdate::Done(TaskOutcome::success()));
        }
        arena.drone_mut().control(Vec2::ZERO, 0.0, self.velocity);
        Ok(TaskUpdate::Continue)
    }
}

impl Task for TakeoffTask {
    fn name(&self) -> &'static str {
        "takeoff"
    }

    fn update(
        &mut self,
        _delta: f64,
        elapsed_ms: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> TaskUpdate {
        self.step(elapsed_ms, sensors, arena)
            .unwrap_or_else(TaskUpdate::Done)
    }
}

/// Descends at a fixed rate and finishes once the drone is close
/// enough to the floor. The descent command is left standing on the
/// completion tick; touchdown grounding absorbs it.
pub struct LandTask {
    velocity: f64,
    height_tolerance: f64,
}

impl LandTask {
    pub fn new(cfg: &ControlConfig) -> Self {
        Self {
            velocity: cfg.land_velocity,
            height_tolerance: cfg.land_height_tolerance,
        }
    }

    fn step(
        &mut self,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> Result<TaskUpdate, TaskOutcome> {
        let odometry = sensors.drone(arena)?;
        if odometry.z_pos > self.height_tolerance {
            arena.drone_mut().control(Vec2::ZERO, 0.0, self.velocity);
            return Ok(TaskUpdate::Continue);
        }
        Ok(TaskUpdate::Done(TaskOutcome::success()))
    }
}

impl Task for LandTask {
    fn name(&self) -> &'static str {
        "land"
    }

    fn update(
        &mut self,
        _delta: f64,
        _elapsed_ms: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> TaskUpdate {
        self.step(sensors, arena).unwrap_or_else(TaskUpdate::Done)
    }
}

/// Station-keeps at the pose observed on the first update. With a
/// duration the task succeeds once it elapses; without one it holds
/// until replaced.
pub struct HoldPositionTask {
    duration_ms: Option<f64>,
    pid_xy: Pid2,
    pid_z: Pid,
    anchor: Option<(Vec2, f64)>,
    started_at_ms: Option<f64>,
}

impl HoldPositionTask {
    pub fn new(cfg: &ControlConfig, duration_s: Option<f64>) -> Self {
        Self {
            duration_ms: duration_s.map(|seconds| seconds * 1000.0),
            pid_xy: Pid2::new(cfg.pid_xy),
            pid_z: Pid::new(cfg.pid_z),
            anchor: None,
            started_at_ms: None,
        }
    }

    fn step(
        &mut self,
        delta: f64,
        elapsed_ms: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> Result<TaskUpdate, TaskOutcome> {
        let odometry = sensors.drone(arena)?;
        let (anchor_xy, anchor_z) = *self
            .anchor
            .get_or_insert((odometry.xy_pos, odometry.z_pos));
        let started_at = *self.started_at_ms.get_or_insert(elapsed_ms);

        if let Some(duration_ms) = self.duration_ms {
            if elapsed_ms - started_at > duration_ms {
                return Ok(TaskUpdate::Done(TaskOutcome::success()));
            }
        }

        let control_xy =
            self.pid_xy
                .get_control(anchor_xy - odometry.xy_pos, -odometry.xy_vel, delta);
        let control_z = self
            .pid_z
            .get_control(anchor_z - odometry.z_pos, -odometry.z_vel, delta);
        arena
            .drone_mut()
            .control(control_xy.rotated(-odometry.yaw), 0.0, control_z);
        Ok(TaskUpdate::Continue)
    }
}

impl Task for HoldPositionTask {
    fn name(&self) -> &'static str {
        "hold_position"
    }

    fn update(
        &mut self,
        delta: f64,
        elapsed_ms: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> TaskUpdate {
        self.step(delta, elapsed_ms, sensors, arena)
            .unwrap_or_else(TaskUpdate::Done)
    }
}

/// Flies to an absolute position. Succeeds as soon as the drone is
/// within the arrival radius in the plane, without issuing any further
/// command on that tick.
pub struct XyzTranslationTask {
    target_xy: Vec2,
    target_z: f64,
    accuracy: f64,
    pid_xy: Pid2,
    pid_z: Pid,
}

impl XyzTranslationTask {
    pub fn new(cfg: &ControlConfig, target: [f64; 3]) -> Self {
        Self {
            target_xy: Vec2::new(target[0], target[1]),
            target_z: target[2],
            accuracy: cfg.translation_accuracy,
            pid_xy: Pid2::new(cfg.pid_xy),
            pid_z: Pid::new(cfg.pid_z),
        }
    }

    fn step(
        &mut self,
        delta: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> Result<TaskUpdate, TaskOutcome> {
        let odometry = sensors.drone(arena)?;
        if (self.target_xy - odometry.xy_pos).norm() < self.accuracy {
            return Ok(TaskUpdate::Done(TaskOutcome::success()));
        }

        let control_xy =
            self.pid_xy
                .get_control(self.target_xy - odometry.xy_pos, -odometry.xy_vel, delta);
        let control_z =
            self.pid_z
                .get_control(self.target_z - odometry.z_pos, -odometry.z_vel, delta);
        arena
            .drone_mut()
            .control(control_xy.rotated(-odometry.yaw), 0.0, control_z);
        Ok(TaskUpdate::Continue)
    }
}

impl Task for XyzTranslationTask {
    fn name(&self) -> &'static str {
        "xyz_translation"
    }

    fn update(
        &mut self,
        delta: f64,
        _elapsed_ms: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> TaskUpdate {
        self.step(delta, sensors, arena)
            .unwrap_or_else(TaskUpdate::Done)
    }
}

/// Accelerates until the planar velocity matches the target. The z
/// component of the target is passed through as a direct climb rate.
pub struct VelocityTask {
    target_xy: Vec2,
    target_z_vel: f64,
    tolerance: f64,
    pid_xy: Pid2,
}

impl VelocityTask {
    pub fn new(cfg: &ControlConfig, target: [f64; 3]) -> Self {
        Self {
            target_xy: Vec2::new(target[0], target[1]),
            target_z_vel: target[2],
            tolerance: cfg.velocity_tolerance,
            pid_xy: Pid2::new(cfg.pid_xy),
        }
    }

    fn step(
        &mut self,
        delta: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> Result<TaskUpdate, TaskOutcome> {
        let odometry = sensors.drone(arena)?;
        if (self.target_xy - odometry.xy_vel).norm() < self.tolerance {
            return Ok(TaskUpdate::Done(TaskOutcome::success()));
        }

        let control_xy =
            self.pid_xy
                .get_control(self.target_xy - odometry.xy_vel, Vec2::ZERO, delta);
        arena
            .drone_mut()
            .control(control_xy.rotated(-odometry.yaw), 0.0, self.target_z_vel);
        Ok(TaskUpdate::Continue)
    }
}

impl Task for VelocityTask {
    fn name(&self) -> &'static str {
        "velocity"
    }

    fn update(
        &mut self,
        delta: f64,
        _elapsed_ms: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> TaskUpdate {
        self.step(delta, sensors, arena)
            .unwrap_or_else(TaskUpdate::Done)
    }
}
