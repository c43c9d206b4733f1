//! Kicking, shooting and aim spin
//!
//! A kick sweeps an oriented box ahead of the agent for a short window,
//! touching each target at most once. Shooting spends ammo to put a fresh
//! ball at the hold point already moving at kick velocity.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::agent::Agent;
use super::ball::{BallHandle, BallPool};
use super::feedback::{ParticleEffect, ShakeKind};
use super::hold::{HoldState, KickBox, stop_holding};
use super::tick::{Buttons, Collaborators, TickInput};
use super::world::{EnemyId, HitTarget, Layers, WorldQuery};
use crate::settings::AgentSettings;

/// Something already touched by the current kick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KickTarget {
    Ball(BallHandle),
    World(HitTarget),
}

/// What a kick tick hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KickHit {
    Ball(BallHandle),
    Enemy(EnemyId),
    Won { at: Vec3 },
}

/// Velocity a kicked or shot ball leaves with
pub fn kick_velocity(agent: &Agent, settings: &AgentSettings) -> Vec3 {
    agent.aim.forward() * settings.max_ball_speed + agent.velocity * 0.5
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KickState {
    /// Remaining active time of the current kick
    pub active: f32,
    pub cooldown: f32,
    pub already_hit: Vec<KickTarget>,
}

impl KickState {
    pub fn is_kicking(&self) -> bool {
        self.active > 0.0
    }

    fn mark(&mut self, target: KickTarget) -> bool {
        if self.already_hit.contains(&target) {
            return false;
        }
        self.already_hit.push(target);
        true
    }
}

/// Run the kick for one tick
#[allow(clippy::too_many_arguments)]
pub fn update_kick(
    kick: &mut KickState,
    hold: &mut HoldState,
    agent: &mut Agent,
    pool: &mut BallPool,
    settings: &AgentSettings,
    input: &TickInput,
    aim_spin: Vec3,
    dt: f32,
    collab: &mut Collaborators<'_>,
) -> Vec<KickHit> {
    let mut hits = Vec::new();

    if kick.cooldown > 0.0 {
        kick.cooldown -= dt;
    }
    if kick.cooldown > 0.0 {
        return hits;
    }

    if !kick.is_kicking() && input.pressed.contains(Buttons::KICK) {
        kick.active = settings.kick_duration;
        log::debug!("Kick started");
    }
    if !kick.is_kicking() {
        return hits;
    }

    kick.active -= dt;
    let forward = agent.aim.forward();
    let kick_box = KickBox::new(agent, settings, 1.0);

    let overlaps = collab.world.overlap_box(
        kick_box.center,
        kick_box.half_extents,
        kick_box.rotation,
        Layers::KICK_HITABLE,
    );
    for overlap in overlaps {
        if !kick.mark(KickTarget::World(overlap.target)) {
            continue;
        }
        collab
            .feedback
            .spawn_particles(ParticleEffect::KickHit, overlap.closest_point);

        match overlap.target {
            HitTarget::WinGate => {
                log::info!("Win gate kicked at {:?}", overlap.closest_point);
                collab.feedback.slow_to_zero();
                collab
                    .feedback
                    .spawn_particles(ParticleEffect::Win, overlap.closest_point);
                hits.push(KickHit::Won {
                    at: overlap.closest_point,
                });
                return hits;
            }
            HitTarget::Enemy(id) => {
                collab.enemies.take_kick(id, forward * settings.kick_power);
                collab.feedback.shake(ShakeKind::Base, 0.8);
                collab.feedback.add_hit_stop(0.1);
                hits.push(KickHit::Enemy(id));
            }
            HitTarget::RopeNode(node) => {
                collab
                    .ropes
                    .apply_impulse_at_node(node, forward * settings.kick_power);
            }
            HitTarget::Geometry | HitTarget::EnemyProjectile(_) => {}
        }
    }

    for handle in kick_box.balls(pool) {
        if !kick.mark(KickTarget::Ball(handle)) {
            continue;
        }
        let velocity = kick_velocity(agent, settings);
        let speed = agent.speed();
        stop_holding(hold, agent, pool, false);

        if let Some(ball) = pool.get_mut(handle) {
            collab
                .feedback
                .spawn_particles(ParticleEffect::KickHit, ball.position);
            ball.kick(velocity, aim_spin);
            ball.set_radius_from_speed(speed);
        }
        collab.feedback.add_hit_stop(0.05);
        collab.feedback.shake(ShakeKind::Base, 0.7);
        log::debug!("Kicked ball {:?} at {:?}", handle, velocity);
        hits.push(KickHit::Ball(handle));
        // One ball per tick
        break;
    }

    if !kick.is_kicking() {
        kick.cooldown = settings.kick_cooldown;
        kick.already_hit.clear();
    }

    hits
}

/// Ball ammo and shooting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ammo {
    pub count: u32,
    pub reload_countdown: f32,
    pub shoot_cooldown: f32,
}

impl Ammo {
    pub fn new(settings: &AgentSettings) -> Self {
        Self {
            count: settings.max_ball_count,
            reload_countdown: 0.0,
            shoot_cooldown: 0.0,
        }
    }

    /// Reload and cool down. Returns true when a ball was reloaded.
    pub fn update(&mut self, settings: &AgentSettings, dt: f32) -> bool {
        let mut reloaded = false;
        if self.count < settings.max_ball_count {
            self.reload_countdown -= dt;
            if self.reload_countdown <= 0.0 {
                self.count += 1;
                reloaded = true;
                if self.count < settings.max_ball_count {
                    self.reload_countdown = settings.ball_reload_time;
                }
            }
        }
        if self.shoot_cooldown > 0.0 {
            self.shoot_cooldown -= dt;
        }
        reloaded
    }
}

/// Aim + kick with ammo, nothing to kick and nothing held spawns a ball
pub fn try_shoot(
    ammo: &mut Ammo,
    agent: &Agent,
    pool: &mut BallPool,
    settings: &AgentSettings,
    input: &TickInput,
    aim_spin: Vec3,
    world: &dyn WorldQuery,
) -> Option<BallHandle> {
    let wants = input.held.contains(Buttons::AIM) && input.pressed.contains(Buttons::KICK);
    if !wants
        || ammo.shoot_cooldown > 0.0
        || ammo.count == 0
        || agent.held_ball.is_some()
        || !KickBox::new(agent, settings, 1.0).balls(pool).is_empty()
    {
        return None;
    }

    let handle = pool.spawn(agent.hold_point(), world);
    if let Some(ball) = pool.get_mut(handle) {
        ball.kick(kick_velocity(agent, settings), aim_spin);
    }

    ammo.count -= 1;
    if ammo.reload_countdown <= 0.0 {
        ammo.reload_countdown = settings.ball_reload_time;
    }
    ammo.shoot_cooldown = settings.shoot_cooldown;
    log::debug!("Shot ball {:?}, {} left", handle, ammo.count);
    Some(handle)
}

/// Scoped profiles steer the next kick's spin with the look input while aiming
pub fn update_aim_spin(spin: &mut Vec3, settings: &AgentSettings, input: &TickInput, unscaled_dt: f32) {
    if input.pressed.contains(Buttons::AIM) {
        *spin = Vec3::ZERO;
    }

    let aiming = input.held.contains(Buttons::AIM);
    if aiming && settings.have_scope {
        let limit = settings.max_angular_velocity;
        *spin += Vec3::new(input.look_delta.y, input.look_delta.x, 0.0) * settings.angular_velocity_sense;
        spin.x = spin.x.clamp(-limit, limit);
        spin.y = spin.y.clamp(-limit, limit);
    }

    let decay = if aiming { 0.5 } else { 2.0 };
    *spin = spin.lerp(Vec3::ZERO, (unscaled_dt * decay).clamp(0.0, 1.0));
}
