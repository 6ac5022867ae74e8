use crate::arena::Arena;
use crate::config::SimConfig;
use crate::sensors::StateController;
use crate::task::{TaskController, TaskOutcome};

/// Long-horizon behavior that sequences tasks toward a goal.
///
/// The mission runs before the current task each frame. A task outcome
/// produced on one frame reaches the mission on the next, so a mission
/// always observes the world state the finished task left behind.
pub trait Mission: Send {
    /// Installs the first task when the controller starts.
    fn on_start(&mut self, tasks: &mut TaskController);

    fn update(
        &mut self,
        delta: f64,
        elapsed_ms: f64,
        completed: Option<&TaskOutcome>,
        sensors: &StateController,
        arena: &Arena,
        tasks: &mut TaskController,
    );
}

impl<M: Mission + ?Sized> Mission for Box<M> {
    fn on_start(&mut self, tasks: &mut TaskController) {
        (**self).on_start(tasks)
    }

    fn update(
        &mut self,
        delta: f64,
        elapsed_ms: f64,
        completed: Option<&TaskOutcome>,
        sensors: &StateController,
        arena: &Arena,
        tasks: &mut TaskController,
    ) {
        (**self).update(delta, elapsed_ms, completed, sensors, arena, tasks)
    }
}

/// Ties the mission and task layers together and advances both once per
/// simulation frame.
pub struct Controller<M: Mission> {
    tasks: TaskController,
    sensors: StateController,
    mission: M,
    pending: Option<TaskOutcome>,
}

impl<M: Mission> Controller<M> {
    pub fn new(cfg: SimConfig, mission: M) -> Self {
        Self::with_sensors(cfg, mission, StateController::new())
    }

    /// Builds a controller whose tasks see only the given sensors.
    pub fn with_sensors(cfg: SimConfig, mut mission: M, sensors: StateController) -> Self {
        let mut tasks = TaskController::new(cfg);
        mission.on_start(&mut tasks);
        Self {
            tasks,
            sensors,
            mission,
            pending: None,
        }
    }

    pub fn mission(&self) -> &M {
        &self.mission
    }

    pub fn tasks(&self) -> &TaskController {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskController {
        &mut self.tasks
    }

    pub fn sensors(&self) -> &StateController {
        &self.sensors
    }

    /// Runs one frame: the mission reacts to the previous frame's
    /// outcome and may switch tasks, then the current task acts.
    pub fn frame_update(&mut self, delta: f64, elapsed_ms: f64, arena: &mut Arena) {
        let completed = self.pending.take();
        self.mission.update(
            delta,
            elapsed_ms,
            completed.as_ref(),
            &self.sensors,
            arena,
            &mut self.tasks,
        );
        self.pending = self.tasks.update(delta, elapsed_ms, &self.sensors, arena);
    }
}
