//! Rope collaborator
//!
//! Rope physics is owned by the host. The core spawns ropes for the grapple,
//! drives their endpoints, and pushes individual nodes around.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::world::RopeNodeId;

/// Handle of a rope owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RopeEnd {
    /// First node; the end that flies out to the target
    Leading,
    /// Last node; held by the agent
    Trailing,
}

/// Easing curves for driven rope ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ease {
    /// Fast start, slow finish
    Sqrt,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Sqrt => t.sqrt(),
        }
    }
}

pub trait RopeField {
    /// Create a rope whose nodes start at `origin`
    fn spawn_rope(&mut self, origin: Vec3) -> RopeId;

    fn apply_impulse_at_node(&mut self, node: RopeNodeId, velocity_delta: Vec3);

    /// Pin one end of a rope to a point (re-issued every tick to follow a target)
    fn lock_endpoint(&mut self, rope: RopeId, end: RopeEnd, anchor: Vec3);

    fn set_leading_velocity(&mut self, rope: RopeId, velocity: Vec3);

    /// Place the leading end at `curve(elapsed / duration)` between `from` and `to`
    fn ease_leading_end_to(
        &mut self,
        rope: RopeId,
        from: Vec3,
        to: Vec3,
        elapsed: f32,
        duration: f32,
        curve: Ease,
    );

    /// Unit direction from the trailing end to the leading end
    fn end_to_start_direction(&self, rope: RopeId) -> Option<Vec3>;

    fn leading_position(&self, rope: RopeId) -> Option<Vec3>;

    /// Remove a rope after `delay` seconds
    fn destroy(&mut self, rope: RopeId, delay: f32);
}

/// Rope field that ignores everything. Used for re-simulation.
#[derive(Debug, Default)]
pub struct NullRopes;

impl RopeField for NullRopes {
    fn spawn_rope(&mut self, _origin: Vec3) -> RopeId {
        RopeId(u32::MAX)
    }

    fn apply_impulse_at_node(&mut self, _node: RopeNodeId, _velocity_delta: Vec3) {}

    fn lock_endpoint(&mut self, _rope: RopeId, _end: RopeEnd, _anchor: Vec3) {}

    fn set_leading_velocity(&mut self, _rope: RopeId, _velocity: Vec3) {}

    fn ease_leading_end_to(
        &mut self,
        _rope: RopeId,
        _from: Vec3,
        _to: Vec3,
        _elapsed: f32,
        _duration: f32,
        _curve: Ease,
    ) {
    }

    fn end_to_start_direction(&self, _rope: RopeId) -> Option<Vec3> {
        None
    }

    fn leading_position(&self, _rope: RopeId) -> Option<Vec3> {
        None
    }

    fn destroy(&mut self, _rope: RopeId, _delay: f32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqrt_ease_front_loaded() {
        assert_eq!(Ease::Sqrt.apply(0.25), 0.5);
        assert_eq!(Ease::Sqrt.apply(2.0), 1.0);
        assert_eq!(Ease::Sqrt.apply(-1.0), 0.0);
        assert!(Ease::Sqrt.apply(0.1) > 0.1);
    }
}
