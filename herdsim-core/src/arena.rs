use crate::config::SimConfig;
use crate::drone::Drone;
use crate::geometry::{Vec2, circles_intersect, compare_angle};
use crate::roomba::Roomba;
use fastrand::Rng;
use log::{debug, warn};
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::hash::{Hash, Hasher};

/// Round counters. A target crossing the goal edge is a good exit and
/// scores points; any other boundary is a bad exit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArenaStats {
    pub score: u64,
    pub good_exits: u32,
    pub bad_exits: u32,
}

/// The square arena holding every roomba and the drone.
///
/// `update` advances one tick in fixed phases: roombas move, the drone
/// moves, contact flags are recomputed, escaped roombas retire. Flags
/// raised this tick are consumed by the roombas on the next one.
#[derive(Debug, Clone)]
pub struct Arena {
    cfg: SimConfig,
    roombas: Vec<Roomba>,
    drone: Drone,
    stats: ArenaStats,
}

impl Arena {
    /// Creates an empty arena. Call [`Arena::reset`] to spawn a round.
    pub fn new(cfg: SimConfig) -> Self {
        let drone = Drone::new(cfg.drone.clone());
        Self {
            cfg,
            roombas: Vec::new(),
            drone,
            stats: ArenaStats::default(),
        }
    }

    /// Clears the round and spawns the standard layout: targets evenly
    /// spaced on the spawn circle facing outward, obstacles on the
    /// patrol circle aimed clockwise, drone back at its start pose.
    ///
    /// The same seed reproduces the same round exactly.
    pub fn reset(&mut self, seed: u64) {
        self.roombas.clear();
        self.stats = ArenaStats::default();
        self.drone.reset();

        let mission = &self.cfg.mission;
        for i in 0..mission.num_targets {
            let theta = TAU * f64::from(i) / f64::from(mission.num_targets);
            let pos = mission.origin + Vec2::from_angle(theta) * mission.target_spawn_radius;
            let mut roomba = Roomba::target(i, pos, theta, rng_for_tag(seed, i));
            roomba.start();
            self.roombas.push(roomba);
        }
        for i in 0..mission.num_obstacles {
            let theta = TAU * f64::from(i) / f64::from(mission.num_obstacles);
            let pos = mission.origin + Vec2::from_angle(theta) * mission.obstacle_spawn_radius;
            let mut roomba = Roomba::obstacle(i, pos, theta - FRAC_PI_2, mission.origin);
            roomba.start();
            self.roombas.push(roomba);
        }
        debug!(
            "arena reset: {} targets, {} obstacles, seed {}",
            mission.num_targets, mission.num_obstacles, seed
        );
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn drone(&self) -> &Drone {
        &self.drone
    }

    pub fn drone_mut(&mut self) -> &mut Drone {
        &mut self.drone
    }

    pub fn roombas(&self) -> &[Roomba] {
        &self.roombas
    }

    /// Looks up an active target roomba by tag.
    pub fn target_by_tag(&self, tag: u32) -> Option<&Roomba> {
        self.roombas
            .iter()
            .find(|roomba| roomba.is_target() && roomba.is_active() && roomba.tag() == tag)
    }

    /// Looks up an active obstacle roomba by tag.
    pub fn obstacle_by_tag(&self, tag: u32) -> Option<&Roomba> {
        self.roombas
            .iter()
            .find(|roomba| !roomba.is_target() && roomba.is_active() && roomba.tag() == tag)
    }

    pub fn stats(&self) -> ArenaStats {
        self.stats
    }

    /// Advances the whole arena by one tick.
    pub fn update(&mut self, delta: f64, elapsed_ms: f64) {
        for roomba in &mut self.roombas {
            if roomba.is_active() {
                roomba.update(&self.cfg.roomba, delta, elapsed_ms);
            }
        }
        self.drone.update(delta);
        self.flag_contacts();
        self.retire_escaped();
    }

    fn flag_contacts(&mut self) {
        let radius = self.cfg.roomba.radius;
        for i in 0..self.roombas.len() {
            if !self.roombas[i].is_active() {
                continue;
            }
            let pos = self.roombas[i].pos();
            let heading = self.roombas[i].heading();

            let mut front = false;
            for (j, other) in self.roombas.iter().enumerate() {
                if i == j || !other.is_active() {
                    continue;
                }
                if circles_intersect(pos, other.pos(), radius)
                    && roomba_is_facing(pos, heading, other.pos())
                {
                    front = true;
                    break;
                }
            }
            if !front
                && self.drone.is_blocking_roomba(&self.roombas[i], radius)
                && roomba_is_facing(pos, heading, self.drone.xy_pos())
            {
                front = true;
            }
            if front {
                self.roombas[i].set_front_hit();
            }
            if self.drone.is_touching_roomba_top(&self.roombas[i]) {
                self.roombas[i].set_top_hit();
            }
        }
    }

    fn retire_escaped(&mut self) {
        let size = self.cfg.mission.arena_size;
        for roomba in &mut self.roombas {
            if !roomba.is_active() {
                continue;
            }
            let pos = roomba.pos();
            if pos.x >= 0.0 && pos.x <= size && pos.y >= 0.0 && pos.y <= size {
                continue;
            }
            roomba.stop();
            roomba.deactivate();
            if !roomba.is_target() {
                // Obstacles patrol a circle well inside the walls.
                warn!("obstacle {} left the arena at {:?}", roomba.tag(), pos);
            } else if pos.y > size {
                self.stats.good_exits += 1;
                self.stats.score += self.cfg.mission.goal_points;
                debug!("target {} crossed the goal edge", roomba.tag());
            } else {
                self.stats.bad_exits += 1;
                debug!("target {} left the arena at {:?}", roomba.tag(), pos);
            }
        }
    }
}

/// True when the heading points within a quarter turn of `point`.
fn roomba_is_facing(pos: Vec2, heading: f64, point: Vec2) -> bool {
    compare_angle(heading, (point - pos).angle()) < FRAC_PI_2
}

fn rng_for_tag(seed: u64, tag: u32) -> Rng {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    tag.hash(&mut hasher);
    Rng::with_seed(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MissionConfig, RoombaConfig};
    use crate::roomba::TargetState;
    use std::f64::consts::PI;

    const DELTA: f64 = 1.0 / 60.0;

    fn run(arena: &mut Arena, ticks: u64) -> f64 {
        let mut elapsed_ms = 0.0;
        for _ in 0..ticks {
            elapsed_ms += DELTA * 1000.0;
            arena.update(DELTA, elapsed_ms);
        }
        elapsed_ms
    }

    fn quiet_roomba_config() -> RoombaConfig {
        RoombaConfig {
            noise_period_ms: 1e12,
            reverse_period_ms: 1e12,
            ..RoombaConfig::default()
        }
    }

    #[test]
    fn reset_spawns_standard_layout() {
        let cfg = SimConfig::default();
        let mut arena = Arena::new(cfg.clone());
        arena.reset(3);

        assert_eq!(arena.roombas().len(), 14);
        let targets: Vec<_> = arena.roombas().iter().filter(|r| r.is_target()).collect();
        assert_eq!(targets.len(), 10);

        let first = &arena.roombas()[0];
        assert_eq!(first.pos(), Vec2::new(11.0, 10.0));
        assert_eq!(first.heading(), 0.0);
        assert_eq!(first.target_state(), Some(TargetState::Forward));

        let obstacle = arena.obstacle_by_tag(0).unwrap();
        assert_eq!(obstacle.pos(), Vec2::new(14.0, 10.0));
        assert!((obstacle.heading() - 3.0 * FRAC_PI_2).abs() < 1e-9);
        // Obstacles follow the targets in spawn order.
        assert!(!arena.roombas()[10].is_target());
        assert_eq!(arena.roombas()[10].tag(), 0);

        assert_eq!(arena.drone().xy_pos(), cfg.drone.start_pos);
        assert_eq!(arena.stats(), ArenaStats::default());
    }

    #[test]
    fn rounds_with_equal_seeds_replay_identically() {
        let positions = |seed: u64| {
            let mut arena = Arena::new(SimConfig::default());
            arena.reset(seed);
            run(&mut arena, 340);
            arena
                .roombas()
                .iter()
                .map(|r| (r.pos(), r.heading()))
                .collect::<Vec<_>>()
        };

        assert_eq!(positions(9), positions(9));
        // Heading noise kicks in past five seconds, so seeds diverge.
        assert_ne!(positions(9), positions(10));
    }

    #[test]
    fn contact_flags_take_effect_one_tick_later() {
        let mut cfg = SimConfig::default();
        cfg.roomba = quiet_roomba_config();
        cfg.mission.num_targets = 0;
        cfg.mission.num_obstacles = 0;
        let mut arena = Arena::new(cfg);
        arena.reset(0);

        let rng = Rng::with_seed(5);
        let mut a = Roomba::target(0, Vec2::new(10.0, 10.0), 0.0, rng.clone());
        let mut b = Roomba::target(1, Vec2::new(10.3, 10.0), PI, rng);
        a.start();
        b.start();
        arena.roombas.push(a);
        arena.roombas.push(b);

        // First tick: both still drive forward, then the head-on contact
        // raises both front flags.
        arena.update(DELTA, DELTA * 1000.0);
        assert_eq!(arena.roombas()[0].target_state(), Some(TargetState::Forward));
        assert!(arena.roombas()[0].front_hit());
        assert!(arena.roombas()[1].front_hit());

        // Second tick consumes the flags.
        arena.update(DELTA, 2.0 * DELTA * 1000.0);
        assert_eq!(arena.roombas()[0].target_state(), Some(TargetState::Reversing));
        assert_eq!(arena.roombas()[1].target_state(), Some(TargetState::Reversing));
    }

    #[test]
    fn rear_contact_does_not_raise_front_flag() {
        let mut cfg = SimConfig::default();
        cfg.roomba = quiet_roomba_config();
        cfg.mission.num_targets = 0;
        cfg.mission.num_obstacles = 0;
        let mut arena = Arena::new(cfg);
        arena.reset(0);

        // Both face +x; the rear roomba sees the leader, not vice versa.
        let rng = Rng::with_seed(5);
        let mut leader = Roomba::target(0, Vec2::new(10.3, 10.0), 0.0, rng.clone());
        let mut chaser = Roomba::target(1, Vec2::new(10.0, 10.0), 0.0, rng);
        leader.start();
        chaser.start();
        arena.roombas.push(leader);
        arena.roombas.push(chaser);

        arena.update(DELTA, DELTA * 1000.0);
        assert!(!arena.roombas()[0].front_hit());
        assert!(arena.roombas()[1].front_hit());
    }

    #[test]
    fn grounded_drone_blocks_facing_roomba() {
        let mut cfg = SimConfig::default();
        cfg.roomba = quiet_roomba_config();
        cfg.mission.num_targets = 1;
        cfg.mission.num_obstacles = 0;
        // Target 0 spawns at origin + (1, 0) facing +x; park the drone
        // just past it so the base square overlaps the bumper.
        cfg.drone.start_pos = Vec2::new(11.4, 10.0);
        let mut arena = Arena::new(cfg);
        arena.reset(0);

        arena.update(DELTA, DELTA * 1000.0);
        assert!(arena.roombas()[0].front_hit());
        arena.update(DELTA, 2.0 * DELTA * 1000.0);
        assert_eq!(arena.roombas()[0].target_state(), Some(TargetState::Reversing));
    }

    #[test]
    fn pad_contact_raises_top_flag_only() {
        let mut cfg = SimConfig::default();
        cfg.roomba = quiet_roomba_config();
        cfg.mission.num_targets = 1;
        cfg.mission.num_obstacles = 0;
        // Grounded drone sitting directly on the spawn point. The pad
        // overlaps but the roomba circle reaches no base edge.
        cfg.drone.start_pos = Vec2::new(11.0, 10.0);
        let mut arena = Arena::new(cfg);
        arena.reset(0);

        arena.update(DELTA, DELTA * 1000.0);
        assert!(arena.roombas()[0].top_hit());
        assert!(!arena.roombas()[0].front_hit());
        arena.update(DELTA, 2.0 * DELTA * 1000.0);
        assert_eq!(arena.roombas()[0].target_state(), Some(TargetState::Touched));
    }

    #[test]
    fn goal_edge_exit_scores_and_retires() {
        let mut cfg = SimConfig::default();
        cfg.roomba = quiet_roomba_config();
        // Four targets; the one at theta = pi/2 spawns beyond the goal
        // edge, the one at 3pi/2 inside the arena.
        cfg.mission = MissionConfig {
            num_targets: 4,
            num_obstacles: 0,
            origin: Vec2::new(10.0, 19.5),
            ..MissionConfig::default()
        };
        let mut arena = Arena::new(cfg);
        arena.reset(0);

        arena.update(DELTA, DELTA * 1000.0);
        let stats = arena.stats();
        assert_eq!(stats.good_exits, 1);
        assert_eq!(stats.bad_exits, 0);
        assert_eq!(stats.score, 1000);
        assert!(arena.target_by_tag(1).is_none());
        assert!(arena.target_by_tag(3).is_some());
        assert_eq!(
            arena.roombas().iter().filter(|r| r.is_active()).count(),
            3
        );
    }

    #[test]
    fn side_exit_counts_as_bad() {
        let mut cfg = SimConfig::default();
        cfg.roomba = quiet_roomba_config();
        cfg.mission = MissionConfig {
            num_targets: 4,
            num_obstacles: 0,
            origin: Vec2::new(0.5, 10.0),
            ..MissionConfig::default()
        };
        let mut arena = Arena::new(cfg);
        arena.reset(0);

        arena.update(DELTA, DELTA * 1000.0);
        let stats = arena.stats();
        assert_eq!(stats.good_exits, 0);
        assert_eq!(stats.bad_exits, 1);
        assert_eq!(stats.score, 0);
    }

    #[test]
    fn retired_roombas_no_longer_move_or_collide() {
        let mut cfg = SimConfig::default();
        cfg.roomba = quiet_roomba_config();
        cfg.mission = MissionConfig {
            num_targets: 4,
            num_obstacles: 0,
            origin: Vec2::new(10.0, 19.5),
            ..MissionConfig::default()
        };
        let mut arena = Arena::new(cfg);
        arena.reset(0);

        arena.update(DELTA, DELTA * 1000.0);
        let escaped = arena.roombas()[1].pos();
        run(&mut arena, 30);
        assert_eq!(arena.roombas()[1].pos(), escaped);
    }

    #[test]
    fn stats_serialize_for_reporting() {
        let stats = ArenaStats {
            score: 2000,
            good_exits: 2,
            bad_exits: 1,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"score":2000,"good_exits":2,"bad_exits":1}"#);
    }
}
