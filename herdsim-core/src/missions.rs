use crate::arena::Arena;
use crate::controller::Mission;
use crate::sensors::StateController;
use crate::task::{TaskController, TaskKind, TaskOutcome, TaskStatus};
use log::{debug, warn};

/// Where a [`WaypointMission`] currently is in its flight plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionPhase {
    Takeoff,
    /// Flying toward the waypoint at this index.
    Travel(usize),
    Landing,
    Done,
    Aborted,
}

/// Takes off, visits each waypoint once in order, then lands.
///
/// Any task failure aborts the plan and leaves the drone wherever the
/// failed task left it.
pub struct WaypointMission {
    waypoints: Vec<[f64; 3]>,
    phase: MissionPhase,
}

impl WaypointMission {
    pub fn new(waypoints: Vec<[f64; 3]>) -> Self {
        Self {
            waypoints,
            phase: MissionPhase::Takeoff,
        }
    }

    pub fn phase(&self) -> MissionPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, MissionPhase::Done | MissionPhase::Aborted)
    }

    fn advance(&mut self, tasks: &mut TaskController) {
        match self.phase {
            MissionPhase::Takeoff => {
                if self.waypoints.is_empty() {
                    self.phase = MissionPhase::Landing;
                    tasks.switch(TaskKind::Land);
                } else {
                    self.phase = MissionPhase::Travel(0);
                    tasks.switch(TaskKind::XyzTranslation {
                        target: self.waypoints[0],
                    });
                }
            }
            MissionPhase::Travel(index) => {
                let next = index + 1;
                if next < self.waypoints.len() {
                    self.phase = MissionPhase::Travel(next);
                    tasks.switch(TaskKind::XyzTranslation {
                        target: self.waypoints[next],
                    });
                } else {
                    self.phase = MissionPhase::Landing;
                    tasks.switch(TaskKind::Land);
                }
            }
            MissionPhase::Landing => {
                self.phase = MissionPhase::Done;
                debug!("waypoint mission complete");
            }
            MissionPhase::Done | MissionPhase::Aborted => {}
        }
    }
}

impl Mission for WaypointMission {
    fn on_start(&mut self, tasks: &mut TaskController) {
        self.phase = MissionPhase::Takeoff;
        tasks.switch(TaskKind::Takeoff);
    }

    fn update(
        &mut self,
        _delta: f64,
        _elapsed_ms: f64,
        completed: Option<&TaskOutcome>,
        _sensors: &StateController,
        _arena: &Arena,
        tasks: &mut TaskController,
    ) {
        let Some(outcome) = completed else { return };
        if outcome.status == TaskStatus::Failure {
            warn!("waypoint mission aborted: {}", outcome.message);
            self.phase = MissionPhase::Aborted;
            return;
        }
        self.advance(tasks);
    }
}
