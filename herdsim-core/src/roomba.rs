use crate::config::RoombaConfig;
use crate::geometry::Vec2;
use fastrand::Rng;
use log::trace;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

/// Behavior states for a target roomba.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Idle,
    Forward,
    Reversing,
    Touched,
    TurningNoise,
}

/// Behavior states for an obstacle roomba.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleState {
    Idle,
    Forward,
}

/// Target roombas drive outward, periodically reverse, wander with
/// heading noise and turn away when tapped on the pad.
#[derive(Debug, Clone)]
pub struct TargetBehavior {
    state: TargetState,
    reverse_at_ms: f64,
    noise_at_ms: f64,
    touch_at_ms: f64,
    noise_rate: f64,
    rng: Rng,
}

impl TargetBehavior {
    fn new(rng: Rng) -> Self {
        Self {
            state: TargetState::Idle,
            reverse_at_ms: 0.0,
            noise_at_ms: 0.0,
            touch_at_ms: 0.0,
            noise_rate: 0.0,
            rng,
        }
    }

    pub fn state(&self) -> TargetState {
        self.state
    }
}

/// Obstacle roombas orbit the patrol circle clockwise and stand still
/// while something blocks their bumper.
#[derive(Debug, Clone)]
pub struct ObstacleBehavior {
    state: ObstacleState,
    center: Vec2,
}

impl ObstacleBehavior {
    fn new(center: Vec2) -> Self {
        Self {
            state: ObstacleState::Idle,
            center,
        }
    }

    pub fn state(&self) -> ObstacleState {
        self.state
    }
}

#[derive(Debug, Clone)]
pub enum RoombaKind {
    Target(TargetBehavior),
    Obstacle(ObstacleBehavior),
}

/// A single ground robot. Contact flags are set by the arena during
/// collision detection and consumed on the following update.
#[derive(Debug, Clone)]
pub struct Roomba {
    tag: u32,
    pos: Vec2,
    heading: f64,
    front_hit: bool,
    top_hit: bool,
    active: bool,
    kind: RoombaKind,
}

impl Roomba {
    pub fn target(tag: u32, pos: Vec2, heading: f64, rng: Rng) -> Self {
        Self::new(tag, pos, heading, RoombaKind::Target(TargetBehavior::new(rng)))
    }

    pub fn obstacle(tag: u32, pos: Vec2, heading: f64, center: Vec2) -> Self {
        Self::new(tag, pos, heading, RoombaKind::Obstacle(ObstacleBehavior::new(center)))
    }

    fn new(tag: u32, pos: Vec2, heading: f64, kind: RoombaKind) -> Self {
        Self {
            tag,
            pos,
            heading: heading.rem_euclid(TAU),
            front_hit: false,
            top_hit: false,
            active: true,
            kind,
        }
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    /// Heading in radians, always within [0, 2pi).
    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_target(&self) -> bool {
        matches!(self.kind, RoombaKind::Target(_))
    }

    pub fn kind(&self) -> &RoombaKind {
        &self.kind
    }

    pub fn target_state(&self) -> Option<TargetState> {
        match &self.kind {
            RoombaKind::Target(behavior) => Some(behavior.state()),
            RoombaKind::Obstacle(_) => None,
        }
    }

    pub fn obstacle_state(&self) -> Option<ObstacleState> {
        match &self.kind {
            RoombaKind::Target(_) => None,
            RoombaKind::Obstacle(behavior) => Some(behavior.state()),
        }
    }

    pub fn front_hit(&self) -> bool {
        self.front_hit
    }

    pub fn top_hit(&self) -> bool {
        self.top_hit
    }

    pub(crate) fn set_front_hit(&mut self) {
        self.front_hit = true;
    }

    pub(crate) fn set_top_hit(&mut self) {
        self.top_hit = true;
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }

    /// Begins autonomous motion.
    pub fn start(&mut self) {
        match &mut self.kind {
            RoombaKind::Target(behavior) => behavior.state = TargetState::Forward,
            RoombaKind::Obstacle(behavior) => behavior.state = ObstacleState::Forward,
        }
    }

    /// Halts the roomba. A turn in progress will not resume on restart.
    pub fn stop(&mut self) {
        match &mut self.kind {
            RoombaKind::Target(behavior) => behavior.state = TargetState::Idle,
            RoombaKind::Obstacle(behavior) => behavior.state = ObstacleState::Idle,
        }
    }

    /// Advances the behavior machine by one step.
    ///
    /// `delta` is the step length in seconds; `elapsed_ms` the total
    /// simulated time since the round started.
    pub fn update(&mut self, cfg: &RoombaConfig, delta: f64, elapsed_ms: f64) {
        match self.kind {
            RoombaKind::Target(_) => self.update_target(cfg, delta, elapsed_ms),
            RoombaKind::Obstacle(_) => self.update_obstacle(cfg, delta),
        }
        self.heading = self.heading.rem_euclid(TAU);
    }

    fn update_target(&mut self, cfg: &RoombaConfig, delta: f64, elapsed_ms: f64) {
        let RoombaKind::Target(behavior) = &mut self.kind else {
            return;
        };
        let entered = behavior.state;
        match behavior.state {
            TargetState::Idle => {}
            TargetState::Forward => {
                if self.top_hit {
                    self.top_hit = false;
                    behavior.state = TargetState::Touched;
                    behavior.touch_at_ms = elapsed_ms;
                } else if elapsed_ms - behavior.reverse_at_ms > cfg.reverse_period_ms
                    || self.front_hit
                {
                    self.front_hit = false;
                    behavior.state = TargetState::Reversing;
                    behavior.reverse_at_ms = elapsed_ms;
                } else if elapsed_ms - behavior.noise_at_ms > cfg.noise_period_ms {
                    behavior.state = TargetState::TurningNoise;
                    behavior.noise_rate = (behavior.rng.f64() * 2.0 - 1.0) * cfg.noise_max
                        / (cfg.noise_duration_ms / 1000.0);
                    behavior.noise_at_ms = elapsed_ms;
                } else {
                    self.pos += Vec2::from_angle(self.heading) * (cfg.linear_speed * delta);
                }
            }
            TargetState::Touched => {
                // Repeated pad taps while already turning do not stack.
                self.top_hit = false;
                let turn_time_ms = FRAC_PI_4 / cfg.angular_speed * 1000.0;
                if elapsed_ms - behavior.touch_at_ms >= turn_time_ms {
                    behavior.state = TargetState::Forward;
                } else if self.front_hit {
                    self.front_hit = false;
                    behavior.state = TargetState::Reversing;
                    behavior.reverse_at_ms = elapsed_ms;
                } else {
                    self.heading -= cfg.angular_speed * delta;
                }
            }
            TargetState::Reversing => {
                // The bumper is dead while turning away.
                self.front_hit = false;
                if self.top_hit {
                    self.top_hit = false;
                    behavior.state = TargetState::Touched;
                    behavior.touch_at_ms = elapsed_ms;
                } else if elapsed_ms - behavior.reverse_at_ms >= PI / cfg.angular_speed * 1000.0 {
                    behavior.state = TargetState::Forward;
                } else {
                    self.heading -= cfg.angular_speed * delta;
                }
            }
            TargetState::TurningNoise => {
                if self.top_hit {
                    self.top_hit = false;
                    behavior.state = TargetState::Touched;
                    behavior.touch_at_ms = elapsed_ms;
                } else if elapsed_ms - behavior.noise_at_ms >= cfg.noise_duration_ms {
                    behavior.state = TargetState::Forward;
                } else if self.front_hit {
                    self.front_hit = false;
                    behavior.state = TargetState::Reversing;
                    behavior.reverse_at_ms = elapsed_ms;
                } else {
                    self.heading += behavior.noise_rate * delta;
                    self.pos += Vec2::from_angle(self.heading) * (cfg.linear_speed * delta);
                }
            }
        }
        if behavior.state != entered {
            trace!("target {}: {:?} -> {:?}", self.tag, entered, behavior.state);
        }
    }

    fn update_obstacle(&mut self, cfg: &RoombaConfig, delta: f64) {
        let RoombaKind::Obstacle(behavior) = &mut self.kind else {
            return;
        };
        // A blocked obstacle yields and waits for the path to clear.
        if self.front_hit {
            self.front_hit = false;
            return;
        }
        if behavior.state == ObstacleState::Forward {
            self.pos += Vec2::from_angle(self.heading) * (cfg.linear_speed * delta);

            // Re-aim tangent to the patrol circle every step. For small
            // deltas this approximates circular motion well.
            let to_center = behavior.center - self.pos;
            self.heading = to_center.angle() + FRAC_PI_2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::compare_angle;

    const DELTA: f64 = 1.0 / 60.0;

    fn quiet_config() -> RoombaConfig {
        // Noise and reversal pushed out of the way for deterministic runs.
        RoombaConfig {
            noise_period_ms: 1e12,
            reverse_period_ms: 1e12,
            ..RoombaConfig::default()
        }
    }

    fn run(roomba: &mut Roomba, cfg: &RoombaConfig, ticks: u64, start_ms: f64) -> f64 {
        let mut elapsed_ms = start_ms;
        for _ in 0..ticks {
            elapsed_ms += DELTA * 1000.0;
            roomba.update(cfg, DELTA, elapsed_ms);
        }
        elapsed_ms
    }

    #[test]
    fn idle_roomba_does_not_move() {
        let cfg = RoombaConfig::default();
        let mut roomba = Roomba::target(0, Vec2::new(5.0, 5.0), 0.0, Rng::with_seed(1));
        run(&mut roomba, &cfg, 100, 0.0);
        assert_eq!(roomba.pos(), Vec2::new(5.0, 5.0));
        assert_eq!(roomba.target_state(), Some(TargetState::Idle));
    }

    #[test]
    fn forward_roomba_translates_along_heading() {
        let cfg = quiet_config();
        let mut roomba = Roomba::target(0, Vec2::ZERO, 0.0, Rng::with_seed(1));
        roomba.start();
        run(&mut roomba, &cfg, 60, 0.0);
        assert!((roomba.pos().x - cfg.linear_speed).abs() < 1e-9);
        assert_eq!(roomba.pos().y, 0.0);
    }

    #[test]
    fn reverse_period_triggers_half_turn() {
        let mut cfg = quiet_config();
        cfg.reverse_period_ms = RoombaConfig::default().reverse_period_ms;
        let mut roomba = Roomba::target(0, Vec2::ZERO, 0.0, Rng::with_seed(1));
        roomba.start();

        // Just past the reverse period the roomba flips into Reversing.
        let ticks_to_trigger = (cfg.reverse_period_ms / (DELTA * 1000.0)) as u64 + 1;
        let elapsed = run(&mut roomba, &cfg, ticks_to_trigger, 0.0);
        assert_eq!(roomba.target_state(), Some(TargetState::Reversing));

        // The turn runs for pi / angular_speed seconds, then forward resumes
        // with the heading rotated by roughly pi.
        let turn_ticks = (PI / cfg.angular_speed / DELTA) as u64 + 2;
        run(&mut roomba, &cfg, turn_ticks, elapsed);
        assert_eq!(roomba.target_state(), Some(TargetState::Forward));
        assert!(compare_angle(roomba.heading(), PI) < 2.0 * cfg.angular_speed * DELTA);
        assert!(roomba.heading() >= 0.0 && roomba.heading() < TAU);
    }

    #[test]
    fn front_hit_preempts_forward_motion() {
        let cfg = quiet_config();
        let mut roomba = Roomba::target(0, Vec2::ZERO, 0.0, Rng::with_seed(1));
        roomba.start();
        roomba.set_front_hit();
        roomba.update(&cfg, DELTA, DELTA * 1000.0);
        assert_eq!(roomba.target_state(), Some(TargetState::Reversing));
        assert!(!roomba.front_hit());
        // The transition tick itself does not move or turn the roomba.
        assert_eq!(roomba.pos(), Vec2::ZERO);
        assert_eq!(roomba.heading(), 0.0);
    }

    #[test]
    fn top_hit_turns_quarter_circle_clockwise() {
        let cfg = quiet_config();
        let mut roomba = Roomba::target(0, Vec2::ZERO, FRAC_PI_2, Rng::with_seed(1));
        roomba.start();
        roomba.set_top_hit();
        roomba.update(&cfg, DELTA, DELTA * 1000.0);
        assert_eq!(roomba.target_state(), Some(TargetState::Touched));

        let turn_ticks = (FRAC_PI_4 / cfg.angular_speed / DELTA) as u64 + 2;
        run(&mut roomba, &cfg, turn_ticks, DELTA * 1000.0);
        assert_eq!(roomba.target_state(), Some(TargetState::Forward));
        let expected = FRAC_PI_2 - FRAC_PI_4;
        assert!(compare_angle(roomba.heading(), expected) < 2.0 * cfg.angular_speed * DELTA);
    }

    #[test]
    fn top_hit_preempts_reversing_turn() {
        let cfg = quiet_config();
        let mut roomba = Roomba::target(0, Vec2::ZERO, 0.0, Rng::with_seed(1));
        roomba.start();
        roomba.set_front_hit();
        roomba.update(&cfg, DELTA, DELTA * 1000.0);
        assert_eq!(roomba.target_state(), Some(TargetState::Reversing));

        roomba.set_top_hit();
        roomba.update(&cfg, DELTA, 2.0 * DELTA * 1000.0);
        assert_eq!(roomba.target_state(), Some(TargetState::Touched));
    }

    #[test]
    fn front_hit_is_ignored_while_reversing() {
        let cfg = quiet_config();
        let mut roomba = Roomba::target(0, Vec2::ZERO, 0.0, Rng::with_seed(1));
        roomba.start();
        roomba.set_front_hit();
        roomba.update(&cfg, DELTA, DELTA * 1000.0);
        assert_eq!(roomba.target_state(), Some(TargetState::Reversing));

        roomba.set_front_hit();
        roomba.update(&cfg, DELTA, 2.0 * DELTA * 1000.0);
        assert_eq!(roomba.target_state(), Some(TargetState::Reversing));
        assert!(!roomba.front_hit());
    }

    #[test]
    fn noise_draw_is_deterministic_per_seed() {
        let mut cfg = quiet_config();
        cfg.noise_period_ms = RoombaConfig::default().noise_period_ms;

        let run_once = || {
            let mut roomba = Roomba::target(0, Vec2::ZERO, 0.0, Rng::with_seed(42));
            roomba.start();
            let ticks = (cfg.noise_period_ms / (DELTA * 1000.0)) as u64 + 30;
            run(&mut roomba, &cfg, ticks, 0.0);
            (roomba.pos(), roomba.heading())
        };

        assert_eq!(run_once(), run_once());
    }

    #[test]
    fn noise_turn_keeps_translating() {
        let mut cfg = quiet_config();
        // The first tick already trips the noise period, so every later
        // tick runs inside the noise turn.
        cfg.noise_period_ms = 1.0;
        let mut roomba = Roomba::target(0, Vec2::ZERO, 0.0, Rng::with_seed(7));
        roomba.start();
        run(&mut roomba, &cfg, 30, 0.0);
        assert_eq!(roomba.target_state(), Some(TargetState::TurningNoise));
        assert!(roomba.pos().norm() > 0.1);
    }

    #[test]
    fn obstacle_orbits_the_patrol_circle() {
        let cfg = RoombaConfig::default();
        let center = Vec2::new(10.0, 10.0);
        let radius = 4.0;
        let start = center + Vec2::new(radius, 0.0);
        let mut roomba = Roomba::obstacle(0, start, -FRAC_PI_2, center);
        roomba.start();

        let period_s = TAU * radius / cfg.linear_speed;
        let half_ticks = (period_s / 2.0 / DELTA) as u64;

        let elapsed = run(&mut roomba, &cfg, half_ticks, 0.0);
        let opposite = center + Vec2::new(-radius, 0.0);
        assert!(roomba.pos().distance(opposite) < 0.2);

        run(&mut roomba, &cfg, half_ticks, elapsed);
        assert!(roomba.pos().distance(start) < 0.2);
        assert!(compare_angle(roomba.heading(), -FRAC_PI_2) < 0.1);
    }

    #[test]
    fn blocked_obstacle_stands_still() {
        let cfg = RoombaConfig::default();
        let center = Vec2::new(10.0, 10.0);
        let start = center + Vec2::new(4.0, 0.0);
        let mut roomba = Roomba::obstacle(0, start, -FRAC_PI_2, center);
        roomba.start();

        roomba.set_front_hit();
        roomba.update(&cfg, DELTA, DELTA * 1000.0);
        assert_eq!(roomba.pos(), start);
        assert!(!roomba.front_hit());

        // Once the flag clears the orbit resumes.
        roomba.update(&cfg, DELTA, 2.0 * DELTA * 1000.0);
        assert!(roomba.pos().distance(start) > 0.0);
    }

    #[test]
    fn heading_stays_normalized_through_turns() {
        let cfg = quiet_config();
        let mut roomba = Roomba::target(0, Vec2::ZERO, 0.1, Rng::with_seed(1));
        roomba.start();
        let mut elapsed = 0.0;
        for tick in 0..2000 {
            if tick % 400 == 0 {
                roomba.set_front_hit();
            }
            elapsed += DELTA * 1000.0;
            roomba.update(&cfg, DELTA, elapsed);
            assert!(roomba.heading() >= 0.0 && roomba.heading() < TAU);
        }
    }

    #[test]
    fn stop_halts_autonomous_motion() {
        let cfg = quiet_config();
        let mut roomba = Roomba::target(0, Vec2::ZERO, 0.0, Rng::with_seed(1));
        roomba.start();
        run(&mut roomba, &cfg, 10, 0.0);
        let pos = roomba.pos();
        roomba.stop();
        run(&mut roomba, &cfg, 10, 10.0 * DELTA * 1000.0);
        assert_eq!(roomba.pos(), pos);
    }
}
