//! Ball holding
//!
//! Aiming near a settled ball catches it. A held ball is not integrated:
//! every tick it snaps toward the hold point, is pushed out of geometry and
//! carries the agent's velocity. It is released after a short hold.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::agent::Agent;
use super::ball::{BallHandle, BallPool};
use super::collision::sphere_overlaps_box;
use super::tick::{Buttons, TickInput};
use super::world::{Layers, WorldQuery};
use crate::settings::AgentSettings;

/// Seconds a caught ball is held before it is let go
pub const SNAP_TIME: f32 = 0.3;
/// Hold duration multiplier for balls reeled in by the grapple
const PULLED_HOLD_MULTIPLIER: f32 = 4.0;
const SNAP_SPEED: f32 = 20.0;
const PULLED_SNAP_SPEED: f32 = 5.0;
/// Catch box scale relative to the kick box
const CATCH_BOX_SCALE: f32 = 4.0;
/// Balls younger than this cannot be caught or previewed from
const MIN_CATCH_LIFETIME: f32 = 1.0;

/// Oriented box in front of the agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KickBox {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Quat,
}

impl KickBox {
    /// The kick volume scaled by `scale`, centered half a length ahead along the aim
    pub fn new(agent: &Agent, settings: &AgentSettings, scale: f32) -> Self {
        let width = settings.kick_hit_box_width * scale;
        let length = settings.kick_hit_box_length * scale;
        Self {
            center: agent.position + agent.aim.forward() * length * 0.5,
            half_extents: Vec3::new(width, width, length) * 0.5,
            rotation: agent.aim.rotation(),
        }
    }

    /// Active balls touching the box, in pool order
    pub fn balls(&self, pool: &BallPool) -> Vec<BallHandle> {
        pool.iter()
            .filter(|(_, b)| {
                sphere_overlaps_box(b.position, b.radius, self.center, self.half_extents, self.rotation)
            })
            .map(|(h, _)| h)
            .collect()
    }
}

/// First settled ball inside the scaled kick box
pub fn ball_in_range(pool: &BallPool, agent: &Agent, settings: &AgentSettings, scale: f32) -> Option<BallHandle> {
    KickBox::new(agent, settings, scale)
        .balls(pool)
        .into_iter()
        .find(|h| pool.get(*h).is_some_and(|b| b.lifetime > MIN_CATCH_LIFETIME))
}

/// Agent-side hold bookkeeping; the held handle itself lives on the agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HoldState {
    pub holding_time: f32,
    /// A catch already happened during the current aim press
    pub caught_on_input: bool,
    /// The held ball was reeled in by the grapple
    pub pulled: bool,
}

impl HoldState {
    pub fn max_hold_time(&self) -> f32 {
        if self.pulled {
            SNAP_TIME * PULLED_HOLD_MULTIPLIER
        } else {
            SNAP_TIME
        }
    }

    fn snap_speed(&self) -> f32 {
        if self.pulled { PULLED_SNAP_SPEED } else { SNAP_SPEED }
    }
}

/// Attach `handle` to the agent
pub fn catch(agent: &mut Agent, pool: &mut BallPool, handle: BallHandle) -> bool {
    let Some(ball) = pool.get_mut(handle) else {
        return false;
    };
    ball.held_by_agent = true;
    ball.velocity = agent.velocity;
    agent.held_ball = Some(handle);
    log::debug!("Caught ball {:?}", handle);
    true
}

/// Let go of the held ball. Returns its handle if one was held.
pub fn stop_holding(
    hold: &mut HoldState,
    agent: &mut Agent,
    pool: &mut BallPool,
    inherit_velocity: bool,
) -> Option<BallHandle> {
    let handle = agent.held_ball.take()?;
    hold.holding_time = 0.0;
    hold.pulled = false;

    if let Some(ball) = pool.get_mut(handle) {
        ball.held_by_agent = false;
        if inherit_velocity {
            ball.velocity = agent.velocity;
        }
    }
    Some(handle)
}

/// What the hold step did this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldChange {
    Caught(BallHandle),
    Released(BallHandle),
}

/// Catch, carry and release. Runs once per tick before balls integrate.
pub fn update_hold(
    hold: &mut HoldState,
    agent: &mut Agent,
    pool: &mut BallPool,
    settings: &AgentSettings,
    input: &TickInput,
    world: &dyn WorldQuery,
    dt: f32,
) -> Option<HoldChange> {
    let mut change = None;

    if input.held.contains(Buttons::AIM) && !hold.caught_on_input {
        if let Some(handle) = ball_in_range(pool, agent, settings, CATCH_BOX_SCALE) {
            if agent.held_ball != Some(handle) {
                stop_holding(hold, agent, pool, false);
            }
            if catch(agent, pool, handle) {
                hold.caught_on_input = true;
                change = Some(HoldChange::Caught(handle));
            }
        }
    }

    if input.released.contains(Buttons::AIM) {
        hold.caught_on_input = false;
    }

    let Some(handle) = agent.held_ball else {
        return change;
    };
    let Some(ball) = pool.get_mut(handle) else {
        // Disabled underneath us
        agent.held_ball = None;
        hold.holding_time = 0.0;
        hold.pulled = false;
        return change;
    };

    hold.holding_time += dt;
    let catch_up = (agent.speed() / settings.base_speed).clamp(1.0, 10.0);
    let t = (dt * hold.snap_speed() * catch_up).clamp(0.0, 1.0);
    ball.position = ball.position.lerp(agent.hold_point(), t);
    ball.position = world.depenetrate_sphere(ball.position, ball.radius, Layers::ENVIRONMENT);
    ball.velocity = agent.velocity;

    if hold.holding_time >= hold.max_hold_time() {
        stop_holding(hold, agent, pool, true);
        change = Some(HoldChange::Released(handle));
    }

    change
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::scene::Arena;

    fn aim_held() -> TickInput {
        TickInput {
            held: Buttons::AIM,
            ..Default::default()
        }
    }

    fn setup() -> (Arena, Agent, BallPool, AgentSettings) {
        let arena = Arena::walled_floor(30.0);
        let settings = AgentSettings::default();
        let agent = Agent::new(&settings, Vec3::new(0.0, 1.5, 0.0));
        (arena, agent, BallPool::new(), settings)
    }

    #[test]
    fn test_kick_box_follows_aim() {
        let (_, agent, _, settings) = setup();
        let kick_box = KickBox::new(&agent, &settings, 1.0);
        assert!((kick_box.center - Vec3::new(0.0, 1.5, 2.5)).length() < 1e-5);
        assert_eq!(kick_box.half_extents, Vec3::splat(2.5));
    }

    #[test]
    fn test_fresh_ball_is_not_caught() {
        let (arena, mut agent, mut pool, settings) = setup();
        let h = pool.spawn(Vec3::new(0.0, 1.5, 3.0), &arena.scene);
        let mut hold = HoldState::default();
        let change = update_hold(&mut hold, &mut agent, &mut pool, &settings, &aim_held(), &arena.scene, 0.01);
        assert!(change.is_none());
        assert!(!pool.get(h).unwrap().held_by_agent);
    }

    #[test]
    fn test_catch_carry_release() {
        let (arena, mut agent, mut pool, settings) = setup();
        agent.velocity = Vec3::new(0.0, 0.0, 5.0);
        let h = pool.spawn(Vec3::new(0.0, 1.5, 3.0), &arena.scene);
        pool.get_mut(h).unwrap().lifetime = 2.0;
        let mut hold = HoldState::default();

        let change = update_hold(&mut hold, &mut agent, &mut pool, &settings, &aim_held(), &arena.scene, 0.01);
        assert_eq!(change, Some(HoldChange::Caught(h)));
        assert_eq!(agent.held_ball, Some(h));
        assert!(pool.get(h).unwrap().held_by_agent);
        assert_eq!(pool.get(h).unwrap().velocity, agent.velocity);

        // One catch per press
        let mut released = None;
        for _ in 0..40 {
            if let Some(HoldChange::Released(r)) =
                update_hold(&mut hold, &mut agent, &mut pool, &settings, &aim_held(), &arena.scene, 0.01)
            {
                released = Some(r);
                break;
            }
        }
        assert_eq!(released, Some(h));
        assert!(agent.held_ball.is_none());
        assert!(!pool.get(h).unwrap().held_by_agent);
        assert!(hold.caught_on_input);

        let release_aim = TickInput {
            released: Buttons::AIM,
            ..Default::default()
        };
        update_hold(&mut hold, &mut agent, &mut pool, &settings, &release_aim, &arena.scene, 0.01);
        assert!(!hold.caught_on_input);
    }

    #[test]
    fn test_held_ball_moves_toward_hold_point() {
        let (arena, mut agent, mut pool, settings) = setup();
        let h = pool.spawn(Vec3::new(1.0, 1.5, 4.0), &arena.scene);
        catch(&mut agent, &mut pool, h);
        let mut hold = HoldState::default();
        let before = pool.get(h).unwrap().position.distance(agent.hold_point());
        update_hold(&mut hold, &mut agent, &mut pool, &settings, &TickInput::default(), &arena.scene, 0.01);
        let after = pool.get(h).unwrap().position.distance(agent.hold_point());
        assert!(after < before);
    }

    #[test]
    fn test_pulled_ball_held_longer() {
        let hold = HoldState {
            pulled: true,
            ..Default::default()
        };
        assert!((hold.max_hold_time() - 1.2).abs() < 1e-6);
        assert_eq!(HoldState::default().max_hold_time(), SNAP_TIME);
    }
}
