//! Projectile engine
//!
//! Per-tick ball integration: gravity, spin decay and curving, floor
//! settling, two collision sweeps (enemy hurtboxes, then environment and
//! enemy projectiles), vertical clamp and rope feedback. Imaginary balls run
//! the same physics with every outward effect suppressed.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::ball::Ball;
use super::collision::{reflect_velocity, sweep_sphere};
use super::enemy::{BallOutcome, EnemyRoster, HitPolicy, ball_outcome};
use super::feedback::{ParticleEffect, ShakeKind};
use super::tick::Collaborators;
use super::world::{EnemyId, HitTarget, Layers, ProjectileId, SweepHit};
use crate::consts::*;
use crate::lerp;
use crate::settings::AgentSettings;

/// How far ahead a bounced ball looks for flat floor
const FLOOR_PROBE_DISTANCE: f32 = 10.0;
/// Velocity fraction lost per second while settling on flat floor
const FLOOR_DAMPING: f32 = 5.0;
/// Enemy hits below this squared speed do not count as bounces
const BOUNCE_MIN_SPEED_SQ: f32 = 25.0;
/// Vertical speed after glancing off an enemy projectile
const DEFLECT_VERTICAL_SPEED: f32 = 20.0;
/// Speed of a ball redirected at another enemy
const RICOCHET_SPEED: f32 = 200.0;
/// Horizontal and vertical speed of a ball bounced back to the agent
const RETURN_SPEED: f32 = 10.0;
const RETURN_LIFT: f32 = 20.0;
/// Minimum speed for environment hits to spawn particles
const SPARK_MIN_SPEED: f32 = 35.0;

/// Something that happened to one ball during a step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BallEvent {
    EnemyHit {
        enemy: EnemyId,
        outcome: BallOutcome,
        point: Vec3,
    },
    /// A ricochet-granting enemy charged the ball
    ChargeGranted,
    /// Third charged bounce used up the charge
    ChargeSpent,
    ProjectileDeflected(ProjectileId),
    /// The ball touched a win gate
    Won { at: Vec3 },
}

/// Restitution for an environment bounce: glancing, moderate-speed hits
/// skip along almost losslessly
#[inline]
pub fn restitution_for(reflected_vertical: f32, speed: f32) -> f32 {
    if reflected_vertical <= 5.0 && speed <= 40.0 {
        0.95
    } else {
        0.6
    }
}

/// Velocity-aligned right and up axes
pub fn velocity_basis(forward: Vec3) -> (Vec3, Vec3) {
    let right = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2) * forward;
    let up = Quat::from_axis_angle(right.normalize_or(Vec3::X), -std::f32::consts::FRAC_PI_2) * forward;
    (right, up)
}

/// Magnus-style curving from spin
#[inline]
pub fn spin_acceleration(up: Vec3, right: Vec3, spin: Vec3, power: f32, dt: f32) -> Vec3 {
    (up * spin.x + right * spin.y) * power * dt
}

/// Advance one ball by `dt`. Held balls are left alone.
pub fn update_ball(
    ball: &mut Ball,
    dt: f32,
    settings: &AgentSettings,
    agent_position: Vec3,
    collab: &mut Collaborators<'_>,
) -> Vec<BallEvent> {
    let mut events = Vec::new();
    if ball.held_by_agent {
        return events;
    }

    ball.velocity.y -= settings.ball_gravity * dt;

    let decay = settings.angular_velocity_decrease_rate;
    ball.angular_velocity.y = lerp(ball.angular_velocity.y, 0.0, dt * decay);
    ball.angular_velocity.x = lerp(ball.angular_velocity.x, 0.0, dt * decay * 2.0);

    ball.forward = ball.velocity.normalize_or_zero();
    (ball.right, ball.up) = velocity_basis(ball.forward);
    ball.speed = ball.velocity.length();

    ball.velocity += spin_acceleration(
        ball.up,
        ball.right,
        ball.angular_velocity,
        settings.angular_velocity_power,
        dt,
    );

    if ball.forward != Vec3::ZERO {
        ball.orientation = Quat::from_rotation_arc(Vec3::Z, ball.forward);
    }
    ball.lifetime += dt;

    if ball.bounce_count >= 1 && on_flat_floor(ball, collab) {
        ball.velocity *= 1.0 - dt * FLOOR_DAMPING;
    }

    let won = resolve_enemy_hits(ball, dt, settings, agent_position, collab, &mut events);
    if !won {
        resolve_environment_hits(ball, dt, collab, &mut events);
    }

    ball.velocity.y = ball
        .velocity
        .y
        .clamp(-BALL_MAX_VERTICAL_SPEED, BALL_MAX_VERTICAL_SPEED);

    if !ball.imaginary {
        push_rope_nodes(ball, dt, collab);
    }

    if !ball.velocity.is_finite() {
        log::warn!("Non-finite ball velocity {:?}, zeroing", ball.velocity);
        ball.velocity = Vec3::ZERO;
    }
    ball.position += ball.velocity * dt;

    events
}

fn on_flat_floor(ball: &Ball, collab: &Collaborators<'_>) -> bool {
    collab
        .world
        .raycast(ball.position, ball.forward, FLOOR_PROBE_DISTANCE, Layers::ENVIRONMENT)
        .is_some_and(|hit| hit.normal.y > 0.999)
}

/// Enemy hurtbox sweep. Returns true if a win gate was touched.
fn resolve_enemy_hits(
    ball: &mut Ball,
    dt: f32,
    settings: &AgentSettings,
    agent_position: Vec3,
    collab: &mut Collaborators<'_>,
    events: &mut Vec<BallEvent>,
) -> bool {
    let hits = sweep_sphere(
        collab.world,
        ball.position,
        ball.radius,
        ball.velocity,
        dt,
        Layers::ENEMY_HURTBOX,
    );

    for hit in hits {
        let enemy = match hit.target {
            HitTarget::WinGate if !ball.imaginary => {
                log::info!("Win gate reached at {:?}", hit.point);
                collab.feedback.slow_to_zero();
                collab.feedback.spawn_particles(ParticleEffect::Win, hit.point);
                events.push(BallEvent::Won { at: hit.point });
                return true;
            }
            HitTarget::Enemy(id) => id,
            _ => continue,
        };

        let Some(category) = collab.enemies.category(enemy) else {
            continue;
        };
        if collab.enemies.is_immune(enemy) || hit.normal.dot(ball.velocity) > 0.0 {
            continue;
        }

        if ball.velocity.length_squared() > BOUNCE_MIN_SPEED_SQ {
            ball.bounce_count += 1;
            if !ball.imaginary {
                collab.feedback.spawn_particles(ParticleEffect::BallHit, hit.point);
            }
        }

        let policy = category.hit_policy();
        if !ball.imaginary {
            if collab.enemies.effects_ready(enemy) {
                let multiplier = if ball.ricochet_charged { 3.0 } else { 1.0 };
                collab.feedback.add_hit_stop(0.05 * multiplier);
                collab.feedback.shake(ShakeKind::Base, 0.3);
            }
            match policy {
                HitPolicy::Knockback => collab.enemies.take_kick(enemy, ball.velocity),
                _ => collab.enemies.take_hit(enemy, &hit),
            }
        }

        let outcome = ball_outcome(policy, ball.ricochet_charged);
        match outcome {
            BallOutcome::ReflectToAgent => reflect_to_agent(ball, agent_position, enemy, &hit, collab.enemies),
            BallOutcome::RicochetToNearest => {
                ball.spend_charge();
                ricochet_to_nearest(ball, agent_position, enemy, &hit, settings, collab.enemies);
                if !ball.ricochet_charged {
                    events.push(BallEvent::ChargeSpent);
                }
            }
            BallOutcome::Knockback => {}
            BallOutcome::GrantCharge => {
                ball.charge();
                events.push(BallEvent::ChargeGranted);
                ricochet_to_nearest(ball, agent_position, enemy, &hit, settings, collab.enemies);
            }
        }

        log::trace!("Ball hit enemy {:?}: {:?}", enemy, outcome);
        events.push(BallEvent::EnemyHit {
            enemy,
            outcome,
            point: hit.point,
        });
    }

    false
}

fn reflect_to_agent(
    ball: &mut Ball,
    agent_position: Vec3,
    enemy: EnemyId,
    hit: &SweepHit,
    roster: &dyn EnemyRoster,
) {
    let enemy_position = roster.position(enemy).unwrap_or(hit.point);
    let mut velocity = (agent_position - enemy_position).normalize_or_zero() * RETURN_SPEED;
    velocity.y = RETURN_LIFT;
    ball.velocity = velocity;
    ball.angular_velocity = Vec3::ZERO;
}

fn ricochet_to_nearest(
    ball: &mut Ball,
    agent_position: Vec3,
    enemy: EnemyId,
    hit: &SweepHit,
    settings: &AgentSettings,
    roster: &dyn EnemyRoster,
) {
    let target = roster
        .nearest_other(ball.position, enemy, settings.find_enemies_radius)
        .and_then(|id| roster.position(id));

    match target {
        Some(target) => {
            ball.velocity = (target - ball.position).normalize_or_zero() * RICOCHET_SPEED;
        }
        None => reflect_to_agent(ball, agent_position, enemy, hit, roster),
    }
    ball.angular_velocity = Vec3::ZERO;
}

/// Environment and enemy-projectile sweep at the fixed probe radius
fn resolve_environment_hits(
    ball: &mut Ball,
    dt: f32,
    collab: &mut Collaborators<'_>,
    events: &mut Vec<BallEvent>,
) {
    let hits = sweep_sphere(
        collab.world,
        ball.position,
        BALL_PROBE_RADIUS,
        ball.velocity,
        dt,
        Layers::ENVIRONMENT | Layers::ENEMY_PROJECTILE,
    );

    for hit in hits {
        if !ball.imaginary && ball.speed > SPARK_MIN_SPEED {
            collab.feedback.spawn_particles(ParticleEffect::BallHit, hit.point);
        }

        if let HitTarget::EnemyProjectile(projectile) = hit.target {
            ball.velocity = reflect_velocity(ball.velocity, hit.normal);
            ball.velocity.y = DEFLECT_VERTICAL_SPEED;
            if !ball.imaginary {
                collab.enemies.reflect_projectile(projectile, -hit.normal);
            }
            events.push(BallEvent::ProjectileDeflected(projectile));
            continue;
        }

        // Already leaving this surface (an earlier hit turned us around)
        if ball.velocity.dot(hit.normal) >= 0.0 {
            continue;
        }

        let reflected = reflect_velocity(ball.velocity, hit.normal);
        ball.velocity = reflected * restitution_for(reflected.y, ball.speed);
        ball.angular_velocity = Vec3::ZERO;
    }
}

fn push_rope_nodes(ball: &Ball, dt: f32, collab: &mut Collaborators<'_>) {
    for overlap in collab
        .world
        .overlap_sphere(ball.position, ROPE_TOUCH_RADIUS, Layers::ROPE)
    {
        if let HitTarget::RopeNode(node) = overlap.target {
            collab
                .ropes
                .apply_impulse_at_node(node, ball.velocity * dt * 20.0);
        }
    }
}
