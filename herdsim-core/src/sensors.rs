use crate::arena::Arena;
use crate::geometry::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

/// The readouts a controller may subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    DroneOdometry,
    TargetRoombas,
    ObstacleRoombas,
}

/// Pose and rates of the drone at the moment of the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DroneOdometry {
    pub xy_pos: Vec2,
    pub xy_vel: Vec2,
    pub z_pos: f64,
    pub z_vel: f64,
    pub yaw: f64,
    pub yaw_vel: f64,
}

/// Pose of a single roomba. Behavior state and contact flags are
/// internal to the simulation and deliberately absent here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoombaOdometry {
    pub pos: Vec2,
    pub heading: f64,
}

/// Raised when a reading is requested from an unsubscribed sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorError {
    pub kind: SensorKind,
}

impl SensorError {
    pub fn message(&self) -> &'static str {
        match self.kind {
            SensorKind::DroneOdometry => "drone odometry is unavailable",
            SensorKind::TargetRoombas => "target roomba tracking is unavailable",
            SensorKind::ObstacleRoombas => "obstacle roomba tracking is unavailable",
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Error for SensorError {}

/// Read-only gateway between tasks and the arena.
///
/// Tasks never walk the arena directly; they ask the state controller
/// for snapshots, which keeps the set of observable quantities in one
/// place and lets a round run with sensors removed.
#[derive(Debug, Clone)]
pub struct StateController {
    sensors: Vec<SensorKind>,
}

impl StateController {
    /// A controller with every sensor subscribed.
    pub fn new() -> Self {
        Self::with_sensors(&[
            SensorKind::DroneOdometry,
            SensorKind::TargetRoombas,
            SensorKind::ObstacleRoombas,
        ])
    }

    pub fn with_sensors(sensors: &[SensorKind]) -> Self {
        Self {
            sensors: sensors.to_vec(),
        }
    }

    pub fn has(&self, kind: SensorKind) -> bool {
        self.sensors.contains(&kind)
    }

    fn ensure(&self, kind: SensorKind) -> Result<(), SensorError> {
        self.has(kind).then_some(()).ok_or(SensorError { kind })
    }

    pub fn drone(&self, arena: &Arena) -> Result<DroneOdometry, SensorError> {
        self.ensure(SensorKind::DroneOdometry)?;
        let drone = arena.drone();
        Ok(DroneOdometry {
            xy_pos: drone.xy_pos(),
            xy_vel: drone.xy_vel(),
            z_pos: drone.z_pos(),
            z_vel: drone.z_vel(),
            yaw: drone.yaw(),
            yaw_vel: drone.yaw_vel(),
        })
    }

    /// Poses of all active target roombas, keyed by tag in tag order.
    /// Retired roombas simply vanish from the map.
    pub fn target_roombas(&self, arena: &Arena) -> Result<BTreeMap<u32, RoombaOdometry>, SensorError> {
        self.ensure(SensorKind::TargetRoombas)?;
        Ok(collect_roombas(arena, true))
    }

    /// Poses of all active obstacle roombas, keyed by tag in tag order.
    pub fn obstacle_roombas(
        &self,
        arena: &Arena,
    ) -> Result<BTreeMap<u32, RoombaOdometry>, SensorError> {
        self.ensure(SensorKind::ObstacleRoombas)?;
        Ok(collect_roombas(arena, false))
    }
}

impl Default for StateController {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_roombas(arena: &Arena, targets: bool) -> BTreeMap<u32, RoombaOdometry> {
    arena
        .roombas()
        .iter()
        .filter(|roomba| roomba.is_active() && roomba.is_target() == targets)
        .map(|roomba| {
            (
                roomba.tag(),
                RoombaOdometry {
                    pos: roomba.pos(),
                    heading: roomba.heading(),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn fresh_arena() -> Arena {
        let mut arena = Arena::new(SimConfig::default());
        arena.reset(1);
        arena
    }

    #[test]
    fn drone_snapshot_matches_arena_truth() {
        let arena = fresh_arena();
        let sensors = StateController::new();
        let odometry = sensors.drone(&arena).unwrap();
        assert_eq!(odometry.xy_pos, arena.drone().xy_pos());
        assert_eq!(odometry.z_pos, arena.drone().z_pos());
        assert_eq!(odometry.yaw, arena.drone().yaw());
    }

    #[test]
    fn roomba_maps_split_by_kind_and_sort_by_tag() {
        let arena = fresh_arena();
        let sensors = StateController::new();

        let targets = sensors.target_roombas(&arena).unwrap();
        assert_eq!(targets.len(), 10);
        let tags: Vec<u32> = targets.keys().copied().collect();
        assert_eq!(tags, (0..10).collect::<Vec<u32>>());

        let obstacles = sensors.obstacle_roombas(&arena).unwrap();
        assert_eq!(obstacles.len(), 4);
        assert_eq!(obstacles[&0].pos, Vec2::new(14.0, 10.0));
    }

    #[test]
    fn unsubscribed_sensor_reports_unavailable() {
        let arena = fresh_arena();
        let sensors = StateController::with_sensors(&[SensorKind::DroneOdometry]);
        assert!(sensors.drone(&arena).is_ok());
        let err = sensors.target_roombas(&arena).unwrap_err();
        assert_eq!(err.kind, SensorKind::TargetRoombas);
        assert_eq!(err.message(), "target roomba tracking is unavailable");
    }

    #[test]
    fn retired_targets_drop_out_of_the_map() {
        let mut cfg = SimConfig::default();
        cfg.mission.origin = Vec2::new(10.0, 19.5);
        cfg.mission.num_targets = 4;
        cfg.mission.num_obstacles = 0;
        let mut arena = Arena::new(cfg);
        arena.reset(0);

        let sensors = StateController::new();
        assert_eq!(sensors.target_roombas(&arena).unwrap().len(), 4);

        // Target 1 spawns past the goal edge and retires immediately.
        arena.update(1.0 / 60.0, 1000.0 / 60.0);
        let targets = sensors.target_roombas(&arena).unwrap();
        assert_eq!(targets.len(), 3);
        assert!(!targets.contains_key(&1));
    }
}
