use crate::arena::Arena;
use crate::config::SimConfig;
use crate::flight_tasks::{
    HoldPositionTask, LandTask, TakeoffTask, VelocityTask, XyzTranslationTask,
};
use crate::geometry::Vec2;
use crate::roomba_tasks::{
    BlockRoombaTask, GoToRoombaTask, HitRoombaTask, SearchTask, TrackRoombaTask,
};
use crate::sensors::{SensorError, StateController};
use log::debug;

/// How a finished task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Success,
    Failure,
}

/// Terminal report of a task, carried to the mission layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub status: TaskStatus,
    pub message: String,
}

impl TaskOutcome {
    pub fn success() -> Self {
        Self {
            status: TaskStatus::Success,
            message: String::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failure,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}

impl From<SensorError> for TaskOutcome {
    fn from(err: SensorError) -> Self {
        Self::failure(err.message())
    }
}

/// Continuation value returned by every task update. A task that
/// returns `Done` is torn down by the controller before anything else
/// observes it, so a task cannot finish twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskUpdate {
    Continue,
    Done(TaskOutcome),
}

/// A single closed-loop behavior driving the drone.
///
/// `update` runs once per tick while the task is current. Tasks read
/// the world through `sensors` and act through the arena's drone.
pub trait Task: Send {
    fn name(&self) -> &'static str;

    fn update(
        &mut self,
        delta: f64,
        elapsed_ms: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> TaskUpdate;
}

/// The closed set of tasks a mission can request, with their
/// parameters. Construction goes through [`TaskKind::into_task`] so a
/// request for an unknown task cannot be expressed.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    Takeoff,
    Land,
    HoldPosition { duration_s: Option<f64> },
    XyzTranslation { target: [f64; 3] },
    Velocity { target: [f64; 3] },
    GoToRoomba { target: u32, offset: Vec2 },
    TrackRoomba { target: u32 },
    HitRoomba { target: u32 },
    BlockRoomba { target: u32, block_vector: Vec2 },
    Search { center: Vec2, trigger_radius: f64, timeout_s: f64 },
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Takeoff => "takeoff",
            TaskKind::Land => "land",
            TaskKind::HoldPosition { .. } => "hold_position",
            TaskKind::XyzTranslation { .. } => "xyz_translation",
            TaskKind::Velocity { .. } => "velocity",
            TaskKind::GoToRoomba { .. } => "go_to_roomba",
            TaskKind::TrackRoomba { .. } => "track_roomba",
            TaskKind::HitRoomba { .. } => "hit_roomba",
            TaskKind::BlockRoomba { .. } => "block_roomba",
            TaskKind::Search { .. } => "search",
        }
    }

    /// Builds the runnable task, pulling gains and thresholds from the
    /// configuration.
    pub fn into_task(self, cfg: &SimConfig) -> Box<dyn Task> {
        match self {
            TaskKind::Takeoff => Box::new(TakeoffTask::new(&cfg.control)),
            TaskKind::Land => Box::new(LandTask::new(&cfg.control)),
            TaskKind::HoldPosition { duration_s } => {
                Box::new(HoldPositionTask::new(&cfg.control, duration_s))
            }
            TaskKind::XyzTranslation { target } => {
                Box::new(XyzTranslationTask::new(&cfg.control, target))
            }
            TaskKind::Velocity { target } => Box::new(VelocityTask::new(&cfg.control, target)),
            TaskKind::GoToRoomba { target, offset } => {
                Box::new(GoToRoombaTask::new(&cfg.control, target, offset))
            }
            TaskKind::TrackRoomba { target } => Box::new(TrackRoombaTask::new(&cfg.control, target)),
            TaskKind::HitRoomba { target } => Box::new(HitRoombaTask::new(cfg, target)),
            TaskKind::BlockRoomba { target, block_vector } => {
                Box::new(BlockRoombaTask::new(cfg, target, block_vector))
            }
            TaskKind::Search {
                center,
                trigger_radius,
                timeout_s,
            } => Box::new(SearchTask::new(&cfg.control, center, trigger_radius, timeout_s)),
        }
    }
}

/// Completion hook invoked right after a task finishes. The controller
/// is already idle when the hook runs, so the hook may switch to the
/// next task directly.
pub type OnComplete = Box<dyn FnOnce(&mut TaskController, &TaskOutcome) + Send>;

struct IdleTask;

impl Task for IdleTask {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn update(
        &mut self,
        _delta: f64,
        _elapsed_ms: f64,
        _sensors: &StateController,
        _arena: &mut Arena,
    ) -> TaskUpdate {
        TaskUpdate::Continue
    }
}

/// Owns the currently running task and drives it once per tick.
///
/// When the task finishes, the controller reverts to the built-in idle
/// task first and only then fires the completion hook; a hook that
/// switches tasks therefore always wins over the idle fallback.
pub struct TaskController {
    cfg: SimConfig,
    current: Box<dyn Task>,
    on_complete: Option<OnComplete>,
    idle: bool,
}

impl TaskController {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            cfg,
            current: Box::new(IdleTask),
            on_complete: None,
            idle: true,
        }
    }

    pub fn current_name(&self) -> &'static str {
        self.current.name()
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Replaces the running task. Any pending completion hook from the
    /// previous task is dropped with it.
    pub fn switch(&mut self, kind: TaskKind) {
        self.install(kind, None);
    }

    /// Replaces the running task and registers a hook to run when the
    /// new task finishes.
    pub fn switch_with_callback(&mut self, kind: TaskKind, on_complete: OnComplete) {
        self.install(kind, Some(on_complete));
    }

    fn install(&mut self, kind: TaskKind, on_complete: Option<OnComplete>) {
        debug!("switching task {} -> {}", self.current.name(), kind.name());
        self.current = kind.into_task(&self.cfg);
        self.on_complete = on_complete;
        self.idle = false;
    }

    /// Runs the current task for one tick. Returns the outcome when the
    /// task finished this tick, after idle reversion and the completion
    /// hook have both run.
    pub fn update(
        &mut self,
        delta: f64,
        elapsed_ms: f64,
        sensors: &StateController,
        arena: &mut Arena,
    ) -> Option<TaskOutcome> {
        match self.current.update(delta, elapsed_ms, sensors, arena) {
            TaskUpdate::Continue => None,
            TaskUpdate::Done(outcome) => {
                debug!(
                    "task {} finished: {:?} {}",
                    self.current.name(),
                    outcome.status,
                    outcome.message
                );
                self.current = Box::new(IdleTask);
                self.idle = true;
                if let Some(on_complete) = self.on_complete.take() {
                    on_complete(self, &outcome);
                }
                Some(outcome)
            }
        }
    }
}
