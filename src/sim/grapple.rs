//! Grapple hook state machine
//!
//! idle -> casting -> pulling -> locked -> releasing -> idle
//!
//! Casting needs a target (a ball in range or environment under the aim).
//! The rope's leading end eases to the target over the pull delay. At the
//! pull delay the hook locks: a targeted ball is captured into the agent's
//! hold, otherwise the agent is yanked along the rope. At twice the pull
//! delay the rope is let go and the cycle returns to idle.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::agent::Agent;
use super::ball::{BallHandle, BallPool};
use super::collision::sphere_cast_sphere;
use super::hold::{self, HoldState};
use super::rope::{Ease, RopeEnd, RopeId};
use super::tick::{Buttons, Collaborators, TickInput};
use super::world::{Layers, WorldQuery};
use crate::settings::AgentSettings;

/// Range of the ball and environment sphere-casts
const BALL_SEARCH_DISTANCE: f32 = 100.0;
/// Range of the environment ray
const RAY_DISTANCE: f32 = 300.0;
/// Where the aim marker sits when nothing is under the aim
const FAR_MARKER_DISTANCE: f32 = 1000.0;
/// Initial speed of the leading rope end
const ROPE_LAUNCH_SPEED: f32 = 20.0;
/// Vertical speed is clamped to [0, this] before the up boost
const PULL_MAX_VERTICAL: f32 = 40.0;
/// Seconds a released rope lingers before the host removes it
const ROPE_LINGER: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GrapplePhase {
    #[default]
    Idle,
    Casting,
    Pulling,
    Locked,
    Releasing,
}

/// Where a cast would go
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AimTarget {
    Ball { handle: BallHandle, point: Vec3 },
    Surface(Vec3),
    /// Nothing under the aim; marker only
    Far(Vec3),
}

impl AimTarget {
    pub fn point(&self) -> Vec3 {
        match *self {
            AimTarget::Ball { point, .. } | AimTarget::Surface(point) | AimTarget::Far(point) => point,
        }
    }

    pub fn can_cast(&self) -> bool {
        !matches!(self, AimTarget::Far(_))
    }
}

/// Grapple transitions reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GrappleEvent {
    Cast { target: Vec3, ball: Option<BallHandle> },
    Locked { captured: Option<BallHandle> },
    Released,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Grapple {
    pub phase: GrapplePhase,
    pub rope: Option<RopeId>,
    pub target: Vec3,
    /// Ball being reeled in
    pub pulling_ball: Option<BallHandle>,
    /// Elapsed time since the cast
    pub timer: f32,
    /// Elapsed time of the leading-end ease
    pub fly_timer: f32,
    pub pulled: bool,
    /// Aim marker for the host to draw
    pub marker: Vec3,
}

impl Grapple {
    pub fn is_active(&self) -> bool {
        self.timer > 0.0 || self.rope.is_some()
    }

    /// Trailing end anchor: just behind the agent
    fn anchor(agent: &Agent) -> Vec3 {
        agent.position - agent.aim.body_rotation() * Vec3::Z
    }

    fn reset(&mut self) {
        self.phase = GrapplePhase::Idle;
        self.rope = None;
        self.pulling_ball = None;
        self.timer = 0.0;
        self.fly_timer = 0.0;
        self.pulled = false;
    }
}

/// Resolve what the aim points at: ball > environment ray > environment
/// sphere-cast > far point
pub fn resolve_aim_target(
    agent: &Agent,
    pool: &BallPool,
    settings: &AgentSettings,
    world: &dyn WorldQuery,
) -> AimTarget {
    let eye = agent.eye();
    let forward = agent.aim.forward();

    let ball = pool
        .iter()
        .filter(|(_, b)| !b.held_by_agent)
        .filter_map(|(h, b)| {
            sphere_cast_sphere(
                eye,
                settings.ball_detect_radius,
                forward,
                BALL_SEARCH_DISTANCE,
                b.position,
                b.radius,
            )
            .map(|t| (h, b, t))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2));
    if let Some((handle, ball, t)) = ball {
        let center = eye + forward * t;
        let point = ball.position + (center - ball.position).normalize_or_zero() * ball.radius;
        return AimTarget::Ball { handle, point };
    }

    if let Some(hit) = world.raycast(eye, forward, RAY_DISTANCE, Layers::ENVIRONMENT) {
        return AimTarget::Surface(hit.point);
    }
    if let Some(hit) = world.sphere_cast(
        eye,
        settings.ball_detect_radius,
        forward,
        BALL_SEARCH_DISTANCE,
        Layers::ENVIRONMENT,
    ) {
        return AimTarget::Surface(hit.point);
    }
    AimTarget::Far(eye + forward * FAR_MARKER_DISTANCE)
}

/// Advance the grapple one tick
#[allow(clippy::too_many_arguments)]
pub fn update_grapple(
    grapple: &mut Grapple,
    hold: &mut HoldState,
    agent: &mut Agent,
    pool: &mut BallPool,
    settings: &AgentSettings,
    input: &TickInput,
    dt: f32,
    collab: &mut Collaborators<'_>,
) -> Vec<GrappleEvent> {
    let mut events = Vec::new();
    let delay = settings.hook_pull_delay;

    if !grapple.is_active() {
        let aim = resolve_aim_target(agent, pool, settings, collab.world);
        grapple.marker = aim.point();

        if input.pressed.contains(Buttons::CAST) && aim.can_cast() {
            grapple.phase = GrapplePhase::Casting;
            let anchor = Grapple::anchor(agent);
            let rope = collab.ropes.spawn_rope(anchor);
            collab.ropes.lock_endpoint(rope, RopeEnd::Trailing, anchor);
            collab
                .ropes
                .set_leading_velocity(rope, agent.aim.forward() * ROPE_LAUNCH_SPEED);

            grapple.rope = Some(rope);
            grapple.target = aim.point();
            if let AimTarget::Ball { handle, .. } = aim {
                grapple.pulling_ball = Some(handle);
                hold.pulled = true;
            }
            log::debug!("Grapple cast at {:?} (ball: {:?})", grapple.target, grapple.pulling_ball);
            events.push(GrappleEvent::Cast {
                target: grapple.target,
                ball: grapple.pulling_ball,
            });
            grapple.phase = GrapplePhase::Pulling;
        }
    }

    let Some(rope) = grapple.rope else {
        return events;
    };

    collab
        .ropes
        .lock_endpoint(rope, RopeEnd::Trailing, Grapple::anchor(agent));

    if grapple.timer <= delay {
        if let Some(ball) = grapple.pulling_ball.and_then(|h| pool.get(h)) {
            grapple.target = ball.position;
        }
        grapple.marker = grapple.target;
        collab.ropes.ease_leading_end_to(
            rope,
            agent.hold_point(),
            grapple.target,
            grapple.fly_timer,
            delay,
            Ease::Sqrt,
        );
        grapple.fly_timer += dt;
    } else if let Some(leading) = collab.ropes.leading_position(rope) {
        grapple.marker = leading;
    }

    // A captured ball drags the leading end along
    if grapple.pulled && hold.pulled {
        if let Some(ball) = agent.held_ball.and_then(|h| pool.get(h)) {
            collab.ropes.lock_endpoint(rope, RopeEnd::Leading, ball.position);
        }
    }

    grapple.timer += dt;

    if grapple.timer >= delay && !grapple.pulled {
        grapple.pulled = true;
        grapple.phase = GrapplePhase::Locked;

        let captured = grapple.pulling_ball.take().filter(|h| {
            if agent.held_ball.is_some_and(|held| held != *h) {
                hold::stop_holding(hold, agent, pool, false);
            }
            hold::catch(agent, pool, *h)
        });
        match captured {
            Some(handle) => {
                hold.pulled = true;
                hold.holding_time = 0.0;
                if let Some(ball) = pool.get(handle) {
                    collab.ropes.lock_endpoint(rope, RopeEnd::Leading, ball.position);
                }
            }
            None => {
                let direction = collab
                    .ropes
                    .end_to_start_direction(rope)
                    .unwrap_or_else(|| (grapple.target - agent.position).normalize_or_zero());
                agent.velocity = direction * settings.hook_pull_power;
            }
        }
        agent.velocity.y = agent.velocity.y.clamp(0.0, PULL_MAX_VERTICAL) + settings.hook_up_power;

        log::debug!("Grapple locked (captured: {:?})", captured);
        events.push(GrappleEvent::Locked { captured });
    }

    if grapple.timer >= delay * 2.0 {
        grapple.phase = GrapplePhase::Releasing;
        collab.ropes.destroy(rope, ROPE_LINGER);
        if agent.held_ball.is_none() {
            hold.pulled = false;
        }
        grapple.reset();
        log::debug!("Grapple released");
        events.push(GrappleEvent::Released);
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::scene::Arena;

    fn cast() -> TickInput {
        TickInput {
            pressed: Buttons::CAST,
            ..Default::default()
        }
    }

    fn setup() -> (Arena, Agent, BallPool, AgentSettings) {
        let settings = AgentSettings::default();
        let agent = Agent::new(&settings, Vec3::new(0.0, 1.5, 0.0));
        (Arena::walled_floor(20.0), agent, BallPool::new(), settings)
    }

    #[test]
    fn test_cast_cycle_timing() {
        let (mut arena, mut agent, mut pool, settings) = setup();
        assert_eq!(settings.hook_pull_delay, 0.4);
        let mut grapple = Grapple::default();
        let mut hold = HoldState::default();
        let dt = 0.01;

        let mut input = cast();
        let mut phases = Vec::new();
        for _ in 0..81 {
            update_grapple(
                &mut grapple,
                &mut hold,
                &mut agent,
                &mut pool,
                &settings,
                &input,
                dt,
                &mut arena.collaborators(),
            );
            input = TickInput::default();
            phases.push(grapple.phase);
        }

        // Elapsed 0.41s after the 41st tick
        assert_eq!(phases[40], GrapplePhase::Locked);
        assert_eq!(phases[80], GrapplePhase::Idle);
        assert!(grapple.rope.is_none());
        assert_eq!(grapple.timer, 0.0);
        assert_eq!(arena.ropes.live_count(), 0);
        assert_eq!(arena.ropes.ropes.len(), 1);
    }

    #[test]
    fn test_pull_yanks_agent_along_rope() {
        let (mut arena, mut agent, mut pool, settings) = setup();
        let mut grapple = Grapple::default();
        let mut hold = HoldState::default();
        let mut locked_velocity = None;

        let mut input = cast();
        for _ in 0..50 {
            let events = update_grapple(
                &mut grapple,
                &mut hold,
                &mut agent,
                &mut pool,
                &settings,
                &input,
                0.01,
                &mut arena.collaborators(),
            );
            input = TickInput::default();
            if events.iter().any(|e| matches!(e, GrappleEvent::Locked { captured: None })) {
                locked_velocity = Some(agent.velocity);
            }
        }

        let v = locked_velocity.expect("hook locked");
        // Pulled toward the far wall, with the up boost
        assert!(v.z > 0.0);
        assert!(v.y >= settings.hook_up_power);
        assert!(v.y <= PULL_MAX_VERTICAL + settings.hook_up_power);
    }

    #[test]
    fn test_cast_ignored_while_active() {
        let (mut arena, mut agent, mut pool, settings) = setup();
        let mut grapple = Grapple::default();
        let mut hold = HoldState::default();
        for _ in 0..3 {
            update_grapple(
                &mut grapple,
                &mut hold,
                &mut agent,
                &mut pool,
                &settings,
                &cast(),
                0.01,
                &mut arena.collaborators(),
            );
        }
        assert_eq!(arena.ropes.ropes.len(), 1);
    }

    #[test]
    fn test_no_target_no_cast() {
        let mut arena = Arena::new(crate::sim::scene::Scene::new());
        let settings = AgentSettings::default();
        let mut agent = Agent::new(&settings, Vec3::new(0.0, 1.5, 0.0));
        let mut pool = BallPool::new();
        let mut grapple = Grapple::default();
        let mut hold = HoldState::default();

        let events = update_grapple(
            &mut grapple,
            &mut hold,
            &mut agent,
            &mut pool,
            &settings,
            &cast(),
            0.01,
            &mut arena.collaborators(),
        );
        assert!(events.is_empty());
        assert_eq!(grapple.phase, GrapplePhase::Idle);
        assert!((grapple.marker.z - (agent.eye().z + FAR_MARKER_DISTANCE)).abs() < 1e-2);
    }

    #[test]
    fn test_ball_is_reeled_in() {
        let (mut arena, mut agent, mut pool, settings) = setup();
        let h = pool.spawn(Vec3::new(0.0, 3.0, 12.0), &arena.scene);
        let mut grapple = Grapple::default();
        let mut hold = HoldState::default();

        assert!(matches!(
            resolve_aim_target(&agent, &pool, &settings, &arena.scene),
            AimTarget::Ball { handle, .. } if handle == h
        ));

        let mut input = cast();
        let mut captured = None;
        for _ in 0..45 {
            for event in update_grapple(
                &mut grapple,
                &mut hold,
                &mut agent,
                &mut pool,
                &settings,
                &input,
                0.01,
                &mut arena.collaborators(),
            ) {
                if let GrappleEvent::Locked { captured: c } = event {
                    captured = c;
                }
            }
            input = TickInput::default();
        }

        assert_eq!(captured, Some(h));
        assert_eq!(agent.held_ball, Some(h));
        assert!(hold.pulled);
        assert!(pool.get(h).unwrap().held_by_agent);
    }
}
