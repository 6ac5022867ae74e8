use crate::arena::Arena;
use crate::config::{ControlConfig, SimConfig};
use crate::geometry::Vec2;
use crate::pid::{Pid, Pid2};
use crate::sensors::StateController;
use crate::task::{Task, TaskOutcome, TaskUpdate};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// Finite-difference estimate of where the chase point is heading,
/// used as a velocity feed-forward. The first sample reports zero.
fn chase_velocity(last: &mut Option<Vec2>, current: Vec2, delta: f64) -> Vec2 {
    let previous = last.replace(current).unwrap_or(current);
    if delta > 0.0 {
        (current - previous) * (1.0 / delta)
    } else {
        Vec2::ZERO
    }
}

/// Target yaw that squares a bumper side up against the roomba's
/// direction of motion while turning less than a quarter circle.
fn block_yaw(drone_yaw: f64, roomba_heading: f64) -> f64 {
    let diff = (drone_yaw - roomba_heading).rem_euclid(FRAC_PI_2);
    if diff < FRAC_PI_4 {
        drone_yaw - diff
    } else {
        drone_yaw - diff + FRAC_PI_2
    }
}

/// Flies to a point at a fixed offset from a target roomba, expressed
/// in the roomba's frame, and succeeds on arrival.
pub struct GoToRoombaTask {
    target: u32,
    offset: Vec2,
    accuracy: f64,
    track_height: f64,
    pid_xy: Pid2,
    pid_z: Pid,
    last_target_xy: Option<Vec2>,
}

impl GoToRoombaTask {
    pub fn new(cfg: &ControlConfig, target: u32, offset: Vec2) -> Self {
        Self {
            target,
            offset,
            accuracy: cfg.translation_accuracy,
            track_height: cfg.track_height,
            pid_xy: Pid2::new(cfg.pid_xy),
            pid_z: Pid::new(cfg.pid_z),
            last_target_xy: None,
        }
    }

    fn step(
        &mut self,
        delta: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> Result<TaskUpdate, TaskOutcome> {
        let targets = sensors.target_roombas(arena)?;
        let odometry = sensors.drone(arena)?;
        let roomba = *targets
            .get(&self.target)
            .ok_or_else(|| TaskOutcome::failure("target roomba not found"))?;

        let chase_xy = roomba.pos + self.offset.rotated(roomba.heading);
        if (chase_xy - odometry.xy_pos).norm() < self.accuracy {
            return Ok(TaskUpdate::Done(TaskOutcome::success()));
        }

        let target_vel = chase_velocity(&mut self.last_target_xy, chase_xy, delta);
        let control_xy = self.pid_xy.get_control(
            chase_xy - odometry.xy_pos,
            target_vel - odometry.xy_vel,
            delta,
        );
        let control_z = self.pid_z.get_control(
            self.track_height - odometry.z_pos,
            -odometry.z_vel,
            delta,
        );
        arena
            .drone_mut()
            .control(control_xy.rotated(-odometry.yaw), 0.0, control_z);
        Ok(TaskUpdate::Continue)
    }
}

impl Task for GoToRoombaTask {
    fn name(&self) -> &'static str {
        "go_to_roomba"
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

/// Hovers above a target roomba at tracking height, indefinitely. The
/// task only ends if the roomba vanishes or a sensor drops out.
pub struct TrackRoombaTask {
    target: u32,
    track_height: f64,
    pid_xy: Pid2,
    pid_z: Pid,
    last_target_xy: Option<Vec2>,
}

impl TrackRoombaTask {
    pub fn new(cfg: &ControlConfig, target: u32) -> Self {
        Self {
            target,
            track_height: cfg.track_height,
            pid_xy: Pid2::new(cfg.pid_xy),
            pid_z: Pid::new(cfg.pid_z),
            last_target_xy: None,
        }
    }

    fn step(
        &mut self,
        delta: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> Result<TaskUpdate, TaskOutcome> {
        let targets = sensors.target_roombas(arena)?;
        let odometry = sensors.drone(arena)?;
        let roomba = *targets
            .get(&self.target)
            .ok_or_else(|| TaskOutcome::failure("target roomba not found"))?;

        let target_vel = chase_velocity(&mut self.last_target_xy, roomba.pos, delta);
        let control_xy = self.pid_xy.get_control(
            roomba.pos - odometry.xy_pos,
            target_vel - odometry.xy_vel,
            delta,
        );
        let control_z = self.pid_z.get_control(
            self.track_height - odometry.z_pos,
            -odometry.z_vel,
            delta,
        );
        arena
            .drone_mut()
            .control(control_xy.rotated(-odometry.yaw), 0.0, control_z);
        Ok(TaskUpdate::Continue)
    }
}

impl Task for TrackRoombaTask {
    fn name(&self) -> &'static str {
        "track_roomba"
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

/// Dives onto a target roomba to trip its top switch. Fails upfront if
/// the roomba is out of diving range; succeeds once the drone sinks
/// below the pad activation height.
pub struct HitRoombaTask {
    target: u32,
    max_start_dist: f64,
    pad_height: f64,
    pid_xy: Pid2,
    pid_z: Pid,
    last_target_xy: Option<Vec2>,
}

impl HitRoombaTask {
    pub fn new(cfg: &SimConfig, target: u32) -> Self {
        Self {
            target,
            max_start_dist: cfg.control.hit_max_start_dist,
            pad_height: cfg.drone.pad_activation_height,
            pid_xy: Pid2::new(cfg.control.pid_xy),
            pid_z: Pid::new(cfg.control.pid_z),
            last_target_xy: None,
        }
    }

    fn step(
        &mut self,
        delta: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> Result<TaskUpdate, TaskOutcome> {
        let targets = sensors.target_roombas(arena)?;
        let odometry = sensors.drone(arena)?;
        let roomba = *targets
            .get(&self.target)
            .ok_or_else(|| TaskOutcome::failure("target roomba not found"))?;

        if (roomba.pos - odometry.xy_pos).norm() > self.max_start_dist {
            return Err(TaskOutcome::failure("target roomba is too far away"));
        }

        let target_vel = chase_velocity(&mut self.last_target_xy, roomba.pos, delta);
        let control_xy = self.pid_xy.get_control(
            roomba.pos - odometry.xy_pos,
            target_vel - odometry.xy_vel,
            delta,
        );
        let control_z = self
            .pid_z
            .get_control(-odometry.z_pos, -odometry.z_vel, delta);
        arena
            .drone_mut()
            .control(control_xy.rotated(-odometry.yaw), 0.0, control_z);

        if odometry.z_pos < self.pad_height {
            return Ok(TaskUpdate::Done(TaskOutcome::success()));
        }
        Ok(TaskUpdate::Continue)
    }
}

impl Task for HitRoombaTask {
    fn name(&self) -> &'static str {
        "hit_roomba"
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

/// Lands in a roomba's path to trip its bumper. The landing point and
/// yaw are latched from the first sighting so the descent does not
/// chase the roomba it is trying to block.
pub struct BlockRoombaTask {
    target: u32,
    block_vector: Vec2,
    pad_height: f64,
    target_yaw: Option<f64>,
    target_xy: Option<Vec2>,
    pid_xy: Pid2,
    pid_z: Pid,
    pid_yaw: Pid,
}

impl BlockRoombaTask {
    pub fn new(cfg: &SimConfig, target: u32, block_vector: Vec2) -> Self {
        Self {
            target,
            block_vector,
            pad_height: cfg.drone.pad_activation_height,
            target_yaw: None,
            target_xy: None,
            pid_xy: Pid2::new(cfg.control.pid_xy),
            pid_z: Pid::new(cfg.control.pid_z),
            pid_yaw: Pid::new(cfg.control.pid_yaw),
        }
    }

    fn step(
        &mut self,
        delta: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> Result<TaskUpdate, TaskOutcome> {
        let targets = sensors.target_roombas(arena)?;
        let odometry = sensors.drone(arena)?;
        let roomba = *targets
            .get(&self.target)
            .ok_or_else(|| TaskOutcome::failure("target roomba not found"))?;

        let target_yaw = *self
            .target_yaw
            .get_or_insert_with(|| block_yaw(odometry.yaw, roomba.heading));
        let target_xy = *self.target_xy.get_or_insert(roomba.pos + self.block_vector);

        if odometry.z_pos < self.pad_height {
            return Ok(TaskUpdate::Done(TaskOutcome::success()));
        }

        let control_xy =
            self.pid_xy
                .get_control(target_xy - odometry.xy_pos, -odometry.xy_vel, delta);
        let control_z = self
            .pid_z
            .get_control(-odometry.z_pos, -odometry.z_vel, delta);
        let control_yaw =
            self.pid_yaw
                .get_control(target_yaw - odometry.yaw, -odometry.yaw_vel, delta);
        arena
            .drone_mut()
            .control(control_xy.rotated(-odometry.yaw), control_yaw, control_z);
        Ok(TaskUpdate::Continue)
    }
}

impl Task for BlockRoombaTask {
    fn name(&self) -> &'static str {
        "block_roomba"
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

/// Hovers over a watch point until any target roomba wanders inside
/// the trigger radius. Both the trigger and the timeout end the task
/// with success; the caller inspects the arena to tell them apart.
pub struct SearchTask {
    center: Vec2,
    trigger_radius: f64,
    timeout_ms: f64,
    track_height: f64,
    pid_xy: Pid2,
    pid_z: Pid,
    started_at_ms: Option<f64>,
}

impl SearchTask {
    pub fn new(cfg: &ControlConfig, center: Vec2, trigger_radius: f64, timeout_s: f64) -> Self {
        Self {
            center,
            trigger_radius,
            timeout_ms: timeout_s * 1000.0,
            track_height: cfg.track_height,
            pid_xy: Pid2::new(cfg.pid_xy),
            pid_z: Pid::new(cfg.pid_z),
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
        let started_at = *self.started_at_ms.get_or_insert(elapsed_ms);
        if elapsed_ms - started_at > self.timeout_ms {
            return Ok(TaskUpdate::Done(TaskOutcome::success()));
        }

        let targets = sensors.target_roombas(arena)?;
        let odometry = sensors.drone(arena)?;
        if targets
            .values()
            .any(|roomba| self.center.distance(roomba.pos) < self.trigger_radius)
        {
            return Ok(TaskUpdate::Done(TaskOutcome::success()));
        }

        let control_xy = self.pid_xy.get_control(
            self.center - odometry.xy_pos,
            -odometry.xy_vel,
            delta,
        );
        let control_z = self.pid_z.get_control(
            self.track_height - odometry.z_pos,
            -odometry.z_vel,
            delta,
        );
        arena
            .drone_mut()
            .control(control_xy.rotated(-odometry.yaw), 0.0, control_z);
        Ok(TaskUpdate::Continue)
    }
}

impl Task for SearchTask {
    fn name(&self) -> &'static str {
        "search"
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
