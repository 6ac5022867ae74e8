use crate::geometry::Vec2;
use crate::pid::PidGains;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::f64::consts::PI;
use std::fmt;

/// Ground robot parameters shared by targets and obstacles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoombaConfig {
    /// Forward speed in m/s.
    pub linear_speed: f64,
    /// Turn rate in rad/s.
    pub angular_speed: f64,
    /// Body radius in m.
    pub radius: f64,
    /// Period between autonomous reversals, in ms.
    pub reverse_period_ms: f64,
    /// Period between heading noise episodes, in ms.
    pub noise_period_ms: f64,
    /// Largest heading deflection a noise episode may apply, in rad.
    pub noise_max: f64,
    /// Length of a single noise episode, in ms.
    pub noise_duration_ms: f64,
}

impl Default for RoombaConfig {
    fn default() -> Self {
        Self {
            linear_speed: 0.33,
            angular_speed: 1.279,
            radius: 0.175,
            reverse_period_ms: 20_000.0,
            noise_period_ms: 5_000.0,
            noise_max: 20.0 * PI / 180.0,
            noise_duration_ms: 850.0,
        }
    }
}

/// Arena layout and scoring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub num_targets: u32,
    /// Radius of the target spawn circle around the origin, in m.
    pub target_spawn_radius: f64,
    pub num_obstacles: u32,
    /// Radius of the obstacle patrol circle around the origin, in m.
    pub obstacle_spawn_radius: f64,
    /// Center of the arena.
    pub origin: Vec2,
    /// Side length of the square arena, in m.
    pub arena_size: f64,
    /// Points awarded per target herded over the goal edge.
    pub goal_points: u64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            num_targets: 10,
            target_spawn_radius: 1.0,
            num_obstacles: 4,
            obstacle_spawn_radius: 4.0,
            origin: Vec2::new(10.0, 10.0),
            arena_size: 20.0,
            goal_points: 1000,
        }
    }
}

/// Drone airframe geometry, spawn pose and actuation limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneConfig {
    /// Side length of the square base, in m.
    pub base_width: f64,
    /// Radius of the top-touch pad, in m.
    pub pad_radius: f64,
    /// Height below which the pad and base interact with roombas, in m.
    pub pad_activation_height: f64,
    pub start_pos: Vec2,
    pub start_yaw: f64,
    /// Largest commandable planar acceleration, in m/s^2.
    pub max_xy_accel: f64,
    /// Largest planar speed; velocity is rescaled past this, in m/s.
    pub max_xy_vel: f64,
    /// Largest commandable vertical speed, in m/s.
    pub max_z_vel: f64,
    /// Largest commandable yaw rate, in rad/s.
    pub max_yaw_vel: f64,
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            base_width: 0.57,
            pad_radius: 0.175,
            pad_activation_height: 0.03,
            start_pos: Vec2::new(1.5, 1.5),
            start_yaw: 0.0,
            max_xy_accel: 3.0,
            max_xy_vel: 3.0,
            max_z_vel: 2.0,
            max_yaw_vel: PI,
        }
    }
}

/// Gains and thresholds used by the flight tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub pid_xy: PidGains,
    pub pid_z: PidGains,
    pub pid_yaw: PidGains,
    /// Arrival radius for waypoint translation, in m.
    pub translation_accuracy: f64,
    /// Climb speed during takeoff, in m/s.
    pub takeoff_velocity: f64,
    /// Altitude at which takeoff reports success, in m.
    pub takeoff_complete_height: f64,
    /// Hold-down time before the climb begins, in s.
    pub takeoff_delay_s: f64,
    /// Descent speed during landing; must be negative, in m/s.
    pub land_velocity: f64,
    /// Altitude below which landing reports success, in m.
    pub land_height_tolerance: f64,
    /// Altitude held while following roombas, in m.
    pub track_height: f64,
    /// Largest distance from which a top-touch dive may start, in m.
    pub hit_max_start_dist: f64,
    /// Arrival radius for velocity matching, in m/s.
    pub velocity_tolerance: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            pid_xy: PidGains::new(0.5, 1.1, 0.0),
            pid_z: PidGains::new(0.5, 0.0, 0.0),
            pid_yaw: PidGains::new(1.0, 0.4, 0.0),
            translation_accuracy: 0.2,
            takeoff_velocity: 0.3,
            takeoff_complete_height: 0.7,
            takeoff_delay_s: 2.0,
            land_velocity: -0.3,
            land_height_tolerance: 0.05,
            track_height: 1.5,
            hit_max_start_dist: 2.0,
            velocity_tolerance: 0.1,
        }
    }
}

/// Complete simulation configuration. Sections omitted from a JSON
/// document fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub roomba: RoombaConfig,
    pub mission: MissionConfig,
    pub drone: DroneConfig,
    pub control: ControlConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErrorReason {
    Parse(String),
    Invalid(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub reason: ConfigErrorReason,
}

impl ConfigError {
    pub fn new(reason: ConfigErrorReason) -> Self {
        Self { reason }
    }

    fn invalid(message: &'static str) -> Self {
        Self::new(ConfigErrorReason::Invalid(message))
    }

    pub fn message(&self) -> &'static str {
        match &self.reason {
            ConfigErrorReason::Parse(_) => "config is not valid json",
            ConfigErrorReason::Invalid(message) => *message,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            ConfigErrorReason::Parse(detail) => {
                write!(f, "{} ({})", self.message(), detail)
            }
            _ => f.write_str(self.message()),
        }
    }
}

impl Error for ConfigError {}

impl SimConfig {
    pub fn from_json_str(text: &str) -> Result<SimConfig, ConfigError> {
        let config: SimConfig = serde_json::from_str(text)
            .map_err(|err| ConfigError::new(ConfigErrorReason::Parse(err.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            (self.roomba.linear_speed, "roomba.linear_speed must be positive"),
            (self.roomba.angular_speed, "roomba.angular_speed must be positive"),
            (self.roomba.radius, "roomba.radius must be positive"),
            (
                self.roomba.reverse_period_ms,
                "roomba.reverse_period_ms must be positive",
            ),
            (
                self.roomba.noise_period_ms,
                "roomba.noise_period_ms must be positive",
            ),
            (
                self.roomba.noise_duration_ms,
                "roomba.noise_duration_ms must be positive",
            ),
            (
                self.mission.target_spawn_radius,
                "mission.target_spawn_radius must be positive",
            ),
            (
                self.mission.obstacle_spawn_radius,
                "mission.obstacle_spawn_radius must be positive",
            ),
            (self.mission.arena_size, "mission.arena_size must be positive"),
            (self.drone.base_width, "drone.base_width must be positive"),
            (self.drone.pad_radius, "drone.pad_radius must be positive"),
            (
                self.drone.pad_activation_height,
                "drone.pad_activation_height must be positive",
            ),
            (self.drone.max_xy_accel, "drone.max_xy_accel must be positive"),
            (self.drone.max_xy_vel, "drone.max_xy_vel must be positive"),
            (self.drone.max_z_vel, "drone.max_z_vel must be positive"),
            (self.drone.max_yaw_vel, "drone.max_yaw_vel must be positive"),
            (
                self.control.translation_accuracy,
                "control.translation_accuracy must be positive",
            ),
            (
                self.control.takeoff_velocity,
                "control.takeoff_velocity must be positive",
            ),
            (
                self.control.takeoff_complete_height,
                "control.takeoff_complete_height must be positive",
            ),
            (
                self.control.land_height_tolerance,
                "control.land_height_tolerance must be positive",
            ),
            (self.control.track_height, "control.track_height must be positive"),
            (
                self.control.hit_max_start_dist,
                "control.hit_max_start_dist must be positive",
            ),
            (
                self.control.velocity_tolerance,
                "control.velocity_tolerance must be positive",
            ),
        ];
        for (value, message) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::invalid(message));
            }
        }

        if !(self.roomba.noise_max >= 0.0) {
            return Err(ConfigError::invalid("roomba.noise_max must not be negative"));
        }
        if !(self.control.takeoff_delay_s >= 0.0) {
            return Err(ConfigError::invalid(
                "control.takeoff_delay_s must not be negative",
            ));
        }
        if !(self.control.land_velocity < 0.0) {
            return Err(ConfigError::invalid("control.land_velocity must be negative"));
        }

        Ok(())
    }
}
