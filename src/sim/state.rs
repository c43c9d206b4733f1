//! Session state
//!
//! All mutable core state for one agent and its balls, plus the frame entry
//! point the host calls once per rendered frame.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::agent::Agent;
use super::ball::{BallHandle, BallPool};
use super::clock::SimClock;
use super::enemy::EnemyRoster;
use super::grapple::{Grapple, GrappleEvent};
use super::hold::HoldState;
use super::kick::{Ammo, KickState};
use super::projectile::BallEvent;
use super::tick::{Buttons, Collaborators, TickInput, tick};
use super::trajectory::{Trajectory, predict};
use super::world::{EnemyId, WorldQuery};
use crate::settings::AgentSettings;

/// Events emitted by the simulation for the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Jumped { impulse: f32 },
    Landed { speed: f32 },
    /// Fell below the world floor and was put back at spawn
    AgentRespawned,
    Ball(BallHandle, BallEvent),
    BallShot(BallHandle),
    BallKicked(BallHandle),
    EnemyKicked(EnemyId),
    BallCaught(BallHandle),
    BallReleased(BallHandle),
    BallReloaded { count: u32 },
    Grapple(GrappleEvent),
    Won,
    PauseToggled { running: bool },
}

/// Complete session state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    pub settings: AgentSettings,
    pub clock: SimClock,
    pub agent: Agent,
    pub pool: BallPool,
    pub hold: HoldState,
    pub kick: KickState,
    pub ammo: Ammo,
    pub grapple: Grapple,
    /// Spin the next kick or shot leaves with
    pub aim_spin: Vec3,
    /// Engine slow-motion multiplier applied to the next frame
    pub time_scale: f32,
    pub won: bool,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Latest shot preview, present while a scoped agent aims
    pub preview: Option<Trajectory>,
}

impl Simulation {
    pub fn new(settings: AgentSettings, spawn_point: Vec3) -> Self {
        let agent = Agent::new(&settings, spawn_point);
        let ammo = Ammo::new(&settings);
        let pool = BallPool::with_capacity(settings.max_ball_count as usize);
        Self {
            settings,
            clock: SimClock::new(),
            agent,
            pool,
            hold: HoldState::default(),
            kick: KickState::default(),
            ammo,
            grapple: Grapple::default(),
            aim_spin: Vec3::ZERO,
            time_scale: 1.0,
            won: false,
            time_ticks: 0,
            preview: None,
        }
    }

    /// Run one rendered frame: slice `real_dt` into ticks and advance each.
    ///
    /// Button edges and the look delta only apply to the first tick of the
    /// frame.
    pub fn advance_frame(&mut self, real_dt: f32, input: &TickInput, collab: &mut Collaborators<'_>) -> Vec<SimEvent> {
        let mut events = Vec::new();

        if input.pressed.contains(Buttons::PAUSE) {
            self.clock.toggle_pause();
            events.push(SimEvent::PauseToggled {
                running: !self.clock.is_frozen(),
            });
        }

        let mut input = input.clone();
        for (i, step) in self.clock.advance(real_dt, self.time_scale).into_iter().enumerate() {
            events.extend(tick(self, step, &input, collab));
            if i == 0 {
                input.clear_edges();
            }
        }

        self.preview = if self.settings.have_scope && input.held.contains(Buttons::AIM) && !self.won {
            Some(self.predict_trajectory(collab.world, &*collab.enemies))
        } else {
            None
        };

        events
    }

    /// Preview the shot the agent would take right now
    pub fn predict_trajectory(&mut self, world: &dyn WorldQuery, enemies: &dyn EnemyRoster) -> Trajectory {
        predict(&mut self.pool, &self.agent, self.aim_spin, &self.settings, world, enemies)
    }

    /// External spawner notification: put a ball at `position`
    pub fn append_ball(&mut self, position: Vec3) -> BallHandle {
        let handle = self.pool.append(position);
        log::debug!("Appended ball {:?} at {:?}", handle, position);
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{BULLET_TIME_SCALE, MIN_TICK};
    use crate::sim::scene::{Arena, Scene};
    use crate::sim::sdf::Shape;
    use crate::sim::world::{HitTarget, Layers};
    use crate::AgentClass;

    fn session() -> (Simulation, Arena) {
        let arena = Arena::walled_floor(40.0);
        let sim = Simulation::new(AgentSettings::default(), Vec3::new(0.0, 1.5, 0.0));
        (sim, arena)
    }

    #[test]
    fn test_pool_preallocated_and_reused() {
        let (mut sim, arena) = session();
        let slots = sim.settings.max_ball_count as usize;
        assert_eq!(sim.pool.capacity(), slots);
        assert_eq!(sim.pool.active_count(), 0);

        let handle = sim.pool.spawn(Vec3::new(0.0, 2.0, 5.0), &arena.scene);
        assert_eq!(handle.index(), 0);
        assert_eq!(sim.pool.capacity(), slots);
    }

    #[test]
    fn test_frame_runs_fixed_ticks() {
        let (mut sim, mut arena) = session();
        sim.advance_frame(0.045, &TickInput::default(), &mut arena.collaborators());
        assert_eq!(sim.time_ticks, 5);
        assert!((sim.clock.remainder() - (0.045 - 5.0 * MIN_TICK)).abs() < 1e-5);
    }

    #[test]
    fn test_agent_settles_on_ground() {
        let (mut sim, mut arena) = session();
        sim.agent.position.y = 4.0;
        let mut landed = 0;
        for _ in 0..90 {
            let events = sim.advance_frame(1.0 / 60.0, &TickInput::default(), &mut arena.collaborators());
            landed += events
                .iter()
                .filter(|e| matches!(e, SimEvent::Landed { .. }))
                .count();
        }
        assert!(sim.agent.grounded);
        assert_eq!(landed, 1);
        assert!(sim.agent.position.y > 1.0 && sim.agent.position.y < 1.6);
        assert_eq!(sim.agent.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_edges_only_apply_to_first_tick() {
        let (mut sim, mut arena) = session();
        sim.agent.grounded = true;
        let input = TickInput {
            released: Buttons::JUMP,
            ..Default::default()
        };
        let events = sim.advance_frame(0.045, &input, &mut arena.collaborators());
        let jumps = events
            .iter()
            .filter(|e| matches!(e, SimEvent::Jumped { .. }))
            .count();
        assert_eq!(jumps, 1);
    }

    #[test]
    fn test_bullet_time_slows_next_frame() {
        let (mut sim, mut arena) = session();
        let input = TickInput {
            held: Buttons::BULLET_TIME,
            ..Default::default()
        };
        sim.advance_frame(0.02, &input, &mut arena.collaborators());
        assert_eq!(sim.time_ticks, 2);
        assert_eq!(sim.time_scale, BULLET_TIME_SCALE);

        // 0.02 * 0.05 plus the carried remainder is below one fixed tick
        sim.advance_frame(0.02, &input, &mut arena.collaborators());
        assert_eq!(sim.time_ticks, 3);
        assert!(sim.agent.stamina < sim.settings.max_stamina);

        sim.advance_frame(0.02, &TickInput::default(), &mut arena.collaborators());
        assert_eq!(sim.time_scale, 1.0);
    }

    #[test]
    fn test_pause_toggle_freezes_clock() {
        let (mut sim, mut arena) = session();
        let pause = TickInput {
            pressed: Buttons::PAUSE,
            ..Default::default()
        };
        let events = sim.advance_frame(0.1, &pause, &mut arena.collaborators());
        assert_eq!(events, vec![SimEvent::PauseToggled { running: false }]);
        assert_eq!(sim.time_ticks, 0);

        sim.advance_frame(0.1, &TickInput::default(), &mut arena.collaborators());
        assert_eq!(sim.time_ticks, 0);

        let events = sim.advance_frame(0.02, &pause, &mut arena.collaborators());
        assert_eq!(events[0], SimEvent::PauseToggled { running: true });
        assert_eq!(sim.time_ticks, 2);
    }

    #[test]
    fn test_fall_out_of_world_respawns() {
        let mut arena = Arena::new(Scene::new());
        let mut sim = Simulation::new(AgentSettings::default(), Vec3::new(0.0, 3.0, 0.0));
        sim.agent.position = Vec3::new(5.0, -29.9, 0.0);
        sim.agent.velocity = Vec3::new(0.0, -100.0, 0.0);

        // Shorter than one fixed tick: exactly one short tick runs
        let events = sim.advance_frame(MIN_TICK * 0.5, &TickInput::default(), &mut arena.collaborators());
        assert_eq!(sim.time_ticks, 1);
        assert!(events.contains(&SimEvent::AgentRespawned));
        assert_eq!(sim.agent.position, sim.agent.spawn_point);
        assert_eq!(sim.agent.velocity, Vec3::ZERO);

        // Later ticks fall from spawn again without a second respawn
        let events = sim.advance_frame(0.02, &TickInput::default(), &mut arena.collaborators());
        assert!(!events.contains(&SimEvent::AgentRespawned));
        assert!((sim.agent.position - sim.agent.spawn_point).length() < 0.05);
    }

    #[test]
    fn test_kick_appended_ball() {
        let (mut sim, mut arena) = session();
        let handle = sim.append_ball(Vec3::new(0.0, 1.5, 3.0));
        let input = TickInput {
            pressed: Buttons::KICK,
            held: Buttons::KICK,
            ..Default::default()
        };
        let events = sim.advance_frame(0.02, &input, &mut arena.collaborators());
        assert!(events.contains(&SimEvent::BallKicked(handle)));
        assert!(sim.pool.get(handle).unwrap().velocity.z > 30.0);
    }

    #[test]
    fn test_kicking_win_gate_ends_session() {
        let (mut sim, mut arena) = session();
        arena.scene.add(
            Shape::cuboid(Vec3::new(0.0, 1.5, 3.0), Vec3::new(1.0, 1.0, 0.5)),
            Layers::KICK_HITABLE,
            HitTarget::WinGate,
        );
        let input = TickInput {
            pressed: Buttons::KICK,
            ..Default::default()
        };
        let events = sim.advance_frame(0.02, &input, &mut arena.collaborators());
        assert!(events.contains(&SimEvent::Won));
        assert!(sim.won);

        let ticks = sim.time_ticks;
        sim.advance_frame(0.1, &TickInput::default(), &mut arena.collaborators());
        assert_eq!(sim.time_ticks, ticks);
    }

    #[test]
    fn test_scoped_aim_publishes_preview() {
        let mut arena = Arena::walled_floor(40.0);
        let mut sim = Simulation::new(
            AgentSettings::for_class(AgentClass::Attacker),
            Vec3::new(0.0, 1.5, 0.0),
        );
        let aim = TickInput {
            held: Buttons::AIM,
            ..Default::default()
        };
        sim.advance_frame(0.02, &aim, &mut arena.collaborators());
        let preview = sim.preview.as_ref().expect("scoped aim previews");
        assert!(!preview.points.is_empty());
        assert_eq!(sim.pool.active_count(), 0);

        sim.advance_frame(0.02, &TickInput::default(), &mut arena.collaborators());
        assert!(sim.preview.is_none());
    }

    #[test]
    fn test_stamina_bounded_over_session() {
        let (mut sim, mut arena) = session();
        let script = [
            Buttons::SPRINT | Buttons::JUMP,
            Buttons::BULLET_TIME,
            Buttons::JUMP,
            Buttons::empty(),
        ];
        let mut previous = Buttons::empty();
        for frame in 0..600 {
            let held = script[(frame / 40) % script.len()];
            let input = TickInput {
                held,
                pressed: held - previous,
                released: previous - held,
                move_axes: glam::Vec2::new(0.0, 1.0),
                ..Default::default()
            };
            previous = held;
            sim.advance_frame(1.0 / 60.0, &input, &mut arena.collaborators());
            assert!(sim.agent.stamina >= 0.0 && sim.agent.stamina <= sim.settings.max_stamina);
            assert!((0.0..=1.0).contains(&sim.agent.jump_charge));
        }
    }
}
