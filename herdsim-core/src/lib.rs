pub mod arena;
pub mod config;
pub mod controller;
pub mod drone;
pub mod flight_tasks;
pub mod geometry;
pub mod missions;
pub mod pid;
pub mod roomba;
pub mod roomba_tasks;
pub mod sensors;
pub mod task;

pub use arena::{Arena, ArenaStats};
pub use config::{
    ConfigError, ConfigErrorReason, ControlConfig, DroneConfig, MissionConfig, RoombaConfig,
    SimConfig,
};
pub use controller::{Controller, Mission};
pub use drone::Drone;
pub use flight_tasks::{HoldPositionTask, LandTask, TakeoffTask, VelocityTask, XyzTranslationTask};
pub use geometry::{SquareExtent, Vec2};
pub use missions::{MissionPhase, WaypointMission};
pub use pid::{Pid, Pid2, PidGains};
pub use roomba::{ObstacleBehavior, ObstacleState, Roomba, RoombaKind, TargetBehavior, TargetState};
pub use roomba_tasks::{
    BlockRoombaTask, GoToRoombaTask, HitRoombaTask, SearchTask, TrackRoombaTask,
};
pub use sensors::{DroneOdometry, RoombaOdometry, SensorError, SensorKind, StateController};
pub use task::{OnComplete, Task, TaskController, TaskKind, TaskOutcome, TaskStatus, TaskUpdate};
