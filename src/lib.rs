//! Kickball - first-person kick/grapple movement and ball physics core
//!
//! Core modules:
//! - `sim`: Deterministic fixed-step simulation (agent, balls, grapple, prediction)
//! - `settings`: Per-class tuning profiles

pub mod settings;
pub mod sim;

pub use settings::{AgentClass, AgentSettings, SettingsError};

/// Simulation configuration constants
pub mod consts {
    /// Minimum (and nominal) simulation tick size in seconds
    pub const MIN_TICK: f32 = 1.0 / 120.0;
    /// Maximum ticks run per frame; leftover time is deferred to the next frame
    pub const MAX_TICKS_PER_FRAME: u32 = 16;

    /// Agent below this height is teleported back to spawn
    pub const WORLD_FLOOR_Y: f32 = -30.0;

    /// Agent capsule: distance between the two sphere centers
    pub const AGENT_HEIGHT: f32 = 2.0;
    pub const AGENT_RADIUS: f32 = 0.5;
    /// Eye (camera) offset above the agent origin
    pub const AGENT_EYE_HEIGHT: f32 = 0.8;

    /// Max angle between a contact normal and up for it to count as ground
    pub const GROUND_ANGLE_DEG: f32 = 30.0;
    /// Grounded horizontal speed below this snaps to rest
    pub const REST_SPEED_EPSILON: f32 = 0.05;

    /// Ball collider radius bounds (kick radius scales with agent speed)
    pub const BALL_MIN_RADIUS: f32 = 1.0;
    pub const BALL_MAX_RADIUS: f32 = 3.0;
    /// Radius used for environment and enemy-projectile sweeps
    pub const BALL_PROBE_RADIUS: f32 = 0.5;
    /// Vertical ball speed is clamped to +-this
    pub const BALL_MAX_VERTICAL_SPEED: f32 = 150.0;

    /// Radius around a moving body in which rope nodes are pushed
    pub const ROPE_TOUCH_RADIUS: f32 = 5.0;

    /// Time scale while bullet time is active
    pub const BULLET_TIME_SCALE: f32 = 0.05;
}

/// Linear interpolation with `t` clamped to [0, 1]
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Where `value` sits between `a` and `b`, clamped to [0, 1]
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// Move `current` toward `target` by at most `max_delta`
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(delta)
    }
}

/// Shorten `v` to at most `max_len` (zero vectors pass through)
#[inline]
pub fn clamp_magnitude(v: glam::Vec3, max_len: f32) -> glam::Vec3 {
    let len_sq = v.length_squared();
    if len_sq > max_len * max_len && len_sq > 0.0 {
        v * (max_len / len_sq.sqrt())
    } else {
        v
    }
}
