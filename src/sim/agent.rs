//! Agent locomotion
//!
//! Quake-style ground/air movement with friction, a charged jump with
//! coyote time and a jump buffer, and the stamina abilities that feed it.
//! Grounding comes from the previous tick's collision pass.

use glam::{EulerRot, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::ball::BallHandle;
use super::collision::{Volume, resolve_contacts};
use super::feedback::{Feedback, ShakeKind};
use super::rope::RopeField;
use super::tick::{Buttons, TickInput};
use super::world::{HitTarget, Layers, WorldQuery};
use crate::consts::*;
use crate::settings::AgentSettings;
use crate::{clamp_magnitude, inverse_lerp, lerp, move_towards};

/// Camera/aim orientation. Positive pitch looks down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aim {
    pub yaw: f32,
    pub pitch: f32,
}

impl Aim {
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation() * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation() * Vec3::Y
    }

    /// Body facing: yaw only
    pub fn body_rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }
}

/// Horizontal input rotated into the body's facing, normalized (or zero)
pub fn wish_direction(aim: &Aim, axes: Vec2) -> Vec3 {
    let body = aim.body_rotation();
    let wish = body * Vec3::X * axes.x + body * Vec3::Z * axes.y;
    wish.normalize_or_zero()
}

/// Squared length of an already-normalized direction times max speed: either
/// 0 or the full max speed.
#[inline]
pub fn wish_speed(wish_dir: Vec3, max_speed: f32) -> f32 {
    wish_dir.length_squared() * max_speed
}

/// Ground friction, clamped so it can stop but never reverse the velocity
pub fn apply_friction(velocity: Vec3, friction: f32, dt: f32) -> Vec3 {
    let speed = velocity.length();
    let drop = friction * dt;
    if drop >= speed {
        return Vec3::ZERO;
    }
    velocity + clamp_magnitude(-velocity / speed * drop, speed)
}

/// Accelerate toward `wish_speed` along `wish_dir` on the horizontal plane.
/// The gain per tick never exceeds the speed deficit.
pub fn accelerate(velocity: Vec3, wish_dir: Vec3, wish_speed: f32, rate: f32, dt: f32) -> Vec3 {
    let speed_along = velocity.dot(wish_dir);
    let deficit = wish_speed - speed_along;
    if deficit <= 0.0 {
        return velocity;
    }

    let gain = (rate * deficit * dt).min(deficit);
    Vec3::new(
        velocity.x + wish_dir.x * gain,
        velocity.y,
        velocity.z + wish_dir.z * gain,
    )
}

/// Gravity scale: 1 at rest, easing up to 2 as upward speed reaches the
/// minimum jump force
pub fn gravity_multiplier(vertical_speed: f32, min_jump_force: f32) -> f32 {
    let progress = inverse_lerp(0.0, min_jump_force, vertical_speed);
    lerp(1.0, 2.0, progress * progress)
}

/// Agent kinematic state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub position: Vec3,
    pub velocity: Vec3,
    pub aim: Aim,
    pub grounded: bool,
    /// Current max speed (base or sprint)
    pub current_speed: f32,
    pub current_friction: f32,
    pub stamina: f32,
    /// Jump charge progress in [0, 1]
    pub jump_charge: f32,
    pub time_since_grounded: f32,
    /// Remaining jump-buffer window (0 = no buffered jump)
    pub jump_buffer: f32,
    pub spawn_point: Vec3,
    /// Ball currently held (at most one)
    pub held_ball: Option<BallHandle>,
}

impl Agent {
    pub fn new(settings: &AgentSettings, spawn_point: Vec3) -> Self {
        Self {
            position: spawn_point,
            velocity: Vec3::ZERO,
            aim: Aim::default(),
            grounded: false,
            current_speed: settings.base_speed,
            current_friction: settings.friction,
            stamina: settings.max_stamina,
            jump_charge: 0.0,
            time_since_grounded: 0.0,
            jump_buffer: 0.0,
            spawn_point,
            held_ball: None,
        }
    }

    /// Camera position
    pub fn eye(&self) -> Vec3 {
        self.position + Vec3::Y * AGENT_EYE_HEIGHT
    }

    /// Where held and freshly shot balls sit: ahead and below the eye
    pub fn hold_point(&self) -> Vec3 {
        self.eye() + self.aim.forward() * 2.0 - self.aim.up() * 1.1
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn horizontal_speed(&self) -> f32 {
        Vec2::new(self.velocity.x, self.velocity.z).length()
    }

    pub fn capsule(&self) -> Volume {
        let half = Vec3::Y * AGENT_HEIGHT * 0.5;
        Volume::Capsule {
            a: self.position - half,
            b: self.position + half,
            radius: AGENT_RADIUS,
        }
    }

    fn add_stamina(&mut self, amount: f32, settings: &AgentSettings) {
        self.stamina = (self.stamina + amount).clamp(0.0, settings.max_stamina);
    }

    pub fn ground_move(
        &mut self,
        settings: &AgentSettings,
        wish_dir: Vec3,
        dt: f32,
        feedback: &mut dyn Feedback,
    ) {
        let wish_speed = wish_speed(wish_dir, self.current_speed);

        self.velocity = apply_friction(self.velocity, self.current_friction, dt);

        let alignment = wish_dir.dot(self.velocity.normalize_or_zero());
        let rate = if alignment < 0.5 {
            settings.ground_deceleration
        } else {
            settings.ground_acceleration
        };
        self.velocity = accelerate(self.velocity, wish_dir, wish_speed, rate, dt);

        // Hard turn at speed
        if self.speed() > settings.base_speed && alignment < 0.1 {
            feedback.shake(ShakeKind::Rapid, dt * 5.0);
        }

        if self.horizontal_speed() <= REST_SPEED_EPSILON {
            self.velocity = Vec3::ZERO;
        }
    }

    pub fn air_move(&mut self, settings: &AgentSettings, wish_dir: Vec3, dt: f32) {
        let wish_speed = wish_speed(wish_dir, self.current_speed);
        let alignment = wish_dir.dot(self.velocity.normalize_or_zero());
        let rate = if alignment < 0.0 {
            settings.air_deceleration
        } else {
            settings.air_acceleration
        };
        self.velocity = accelerate(self.velocity, wish_dir, wish_speed, rate, dt);
    }

    pub fn apply_gravity(&mut self, settings: &AgentSettings, dt: f32) {
        let multiplier = gravity_multiplier(self.velocity.y, settings.min_jump_force);
        self.velocity.y -= settings.gravity * multiplier * dt;
    }

    /// Spend the jump charge. Returns the vertical impulse applied.
    pub fn jump(&mut self, settings: &AgentSettings, wish_dir: Vec3, feedback: &mut dyn Feedback) -> f32 {
        let impulse = lerp(settings.min_jump_force, settings.max_jump_force, self.jump_charge);
        self.velocity.y += impulse;
        self.velocity += wish_dir * settings.jump_forward_boost;

        feedback.shake(ShakeKind::Long, self.jump_charge);

        self.jump_buffer = 0.0;
        self.jump_charge = 0.0;
        impulse
    }

    /// Can a released jump fire right now
    pub fn can_jump(&self, settings: &AgentSettings) -> bool {
        self.grounded || self.time_since_grounded <= settings.coyote_time || self.jump_buffer > 0.0
    }

    /// Jump charge, sprint, buffer expiry and stamina recovery.
    /// Returns the jump impulse if a jump fired this tick.
    pub fn stamina_abilities(
        &mut self,
        settings: &AgentSettings,
        input: &TickInput,
        wish_dir: Vec3,
        dt: f32,
        unscaled_dt: f32,
        feedback: &mut dyn Feedback,
    ) -> Option<f32> {
        let mut jumped = None;

        if input.held.contains(Buttons::JUMP) {
            if self.stamina > 0.0 && self.jump_charge < 1.0 {
                self.jump_charge =
                    (self.jump_charge + unscaled_dt / settings.time_to_charge_max_jump).min(1.0);
                self.add_stamina(-unscaled_dt * settings.jump_charge_stamina_drain, settings);
                self.jump_buffer = 0.0;
                self.current_friction = settings.friction * 0.5;
            } else {
                self.current_friction = settings.friction;
            }
        }

        if input.held.contains(Buttons::SPRINT) {
            if self.stamina > 0.0 {
                self.current_speed = settings.sprint_speed;
                self.add_stamina(-dt * settings.sprint_stamina_drain, settings);
            } else {
                self.current_speed = settings.base_speed;
            }
        }

        if self.jump_buffer > 0.0 {
            self.jump_buffer -= dt;
            if self.jump_buffer <= 0.0 {
                // Buffered jump never landed: refund the charge
                self.jump_buffer = 0.0;
                let refund = self.jump_charge
                    * settings.time_to_charge_max_jump
                    * settings.jump_charge_stamina_drain;
                self.add_stamina(refund, settings);
                self.jump_charge = 0.0;
            }
        }

        if input.released.contains(Buttons::JUMP) {
            if self.can_jump(settings) {
                jumped = Some(self.jump(settings, wish_dir, feedback));
            } else {
                self.jump_buffer = settings.jump_buffer_time;
            }
            self.current_friction = settings.friction;
        }

        if input.released.contains(Buttons::SPRINT) {
            self.current_speed = settings.base_speed;
        }

        if !input
            .held
            .intersects(Buttons::JUMP | Buttons::SPRINT | Buttons::BULLET_TIME)
        {
            self.add_stamina(settings.stamina_recovery_rate * dt, settings);
        }

        jumped
    }

    /// Holding jump next to rope nodes swings the agent up the rope
    pub fn rope_swing(
        &mut self,
        input: &TickInput,
        world: &dyn WorldQuery,
        ropes: &mut dyn RopeField,
        dt: f32,
    ) {
        const DAMPING: f32 = 2.0;
        const TARGET_SPEED: f32 = 40.0;
        const ACCELERATION: f32 = 120.0;

        if !input.held.contains(Buttons::JUMP) {
            return;
        }

        let mut found = false;
        for overlap in world.overlap_sphere(self.position, ROPE_TOUCH_RADIUS, Layers::ROPE) {
            if let HitTarget::RopeNode(node) = overlap.target {
                let push = Vec3::new(self.velocity.x, -self.velocity.y, self.velocity.z) * dt * 10.0;
                ropes.apply_impulse_at_node(node, push);
                found = true;
            }
        }

        if found {
            self.velocity.x *= 1.0 - DAMPING * dt;
            self.velocity.z *= 1.0 - DAMPING * dt;
            self.velocity.y = move_towards(self.velocity.y, TARGET_SPEED, ACCELERATION * dt);
        }
    }

    /// Clip velocity against the environment and update grounding.
    /// Returns the landing speed when the agent just touched down.
    pub fn resolve_collisions(&mut self, world: &dyn WorldQuery, feedback: &mut dyn Feedback) -> Option<f32> {
        let was_grounded = self.grounded;
        let fall_speed = -self.velocity.y;

        let resolution = resolve_contacts(
            world,
            self.capsule(),
            self.position,
            self.velocity,
            Vec3::Y,
            Layers::ENVIRONMENT,
        );
        self.velocity = resolution.velocity;
        self.grounded = resolution.grounded;

        if self.grounded && !was_grounded {
            feedback.shake(ShakeKind::Long, fall_speed / 75.0);
            return Some(fall_speed);
        }
        None
    }

    /// Integrate position. Returns true if the agent fell out of the world
    /// and was reset to spawn.
    pub fn integrate(&mut self, dt: f32) -> bool {
        self.position += self.velocity * dt;

        if self.position.y < WORLD_FLOOR_Y {
            log::warn!(
                "Agent fell below world floor at {:?}, resetting to spawn",
                self.position
            );
            self.position = self.spawn_point;
            self.velocity = Vec3::ZERO;
            return true;
        }
        false
    }
}
