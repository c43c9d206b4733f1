//! Enemy collaborator and the ball-vs-enemy policy table
//!
//! Enemy behaviour lives in the host. The core only needs an enemy's
//! category, position and immunity, plus two ways to hurt it.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::world::{EnemyId, ProjectileId, SweepHit};

/// Enemy categories the projectile engine distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnemyCategory {
    /// Training dummy (default behaviour)
    #[default]
    Dummy,
    Blocker,
    Wind,
    HorizontalShooter,
    VerticalShooter,
    /// Grants the ball a ricochet charge
    Ricochet,
}

/// How a ball responds to hitting an enemy of a given category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitPolicy {
    /// Enemy takes a hit; ball bounces back to the agent, or on to the
    /// nearest other enemy while ricochet-charged
    Reflect,
    /// Enemy is knocked back by the ball's velocity; the ball keeps flying
    Knockback,
    /// Enemy takes a hit and charges the ball, which heads for the nearest
    /// other enemy
    GrantCharge,
}

impl EnemyCategory {
    /// The policy table
    pub fn hit_policy(self) -> HitPolicy {
        match self {
            EnemyCategory::Dummy
            | EnemyCategory::HorizontalShooter
            | EnemyCategory::VerticalShooter => HitPolicy::Reflect,
            EnemyCategory::Blocker | EnemyCategory::Wind => HitPolicy::Knockback,
            EnemyCategory::Ricochet => HitPolicy::GrantCharge,
        }
    }
}

/// The single outcome applied to a ball for one enemy hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallOutcome {
    ReflectToAgent,
    RicochetToNearest,
    Knockback,
    GrantCharge,
}

/// Pick the ball outcome from the policy and the ball's charge state
pub fn ball_outcome(policy: HitPolicy, ricochet_charged: bool) -> BallOutcome {
    match policy {
        HitPolicy::Reflect if ricochet_charged => BallOutcome::RicochetToNearest,
        HitPolicy::Reflect => BallOutcome::ReflectToAgent,
        HitPolicy::Knockback => BallOutcome::Knockback,
        HitPolicy::GrantCharge => BallOutcome::GrantCharge,
    }
}

/// Host-side enemy access. Unknown or destroyed ids answer `None`/`false`
/// and mutations on them are ignored.
pub trait EnemyRoster {
    fn category(&self, id: EnemyId) -> Option<EnemyCategory>;

    fn position(&self, id: EnemyId) -> Option<Vec3>;

    /// Enemy is in its post-hit immunity window
    fn is_immune(&self, id: EnemyId) -> bool;

    /// Enemy may trigger hit-stop/shake again
    fn effects_ready(&self, id: EnemyId) -> bool {
        let _ = id;
        true
    }

    /// Closest enemy to `from` within `max_distance`, other than `exclude`
    fn nearest_other(&self, from: Vec3, exclude: EnemyId, max_distance: f32) -> Option<EnemyId>;

    fn take_hit(&mut self, id: EnemyId, contact: &SweepHit);

    fn take_kick(&mut self, id: EnemyId, impulse: Vec3);

    /// Mirror an enemy projectile off a contact normal
    fn reflect_projectile(&mut self, id: ProjectileId, normal: Vec3);
}

/// Read-only view of a roster; every mutation is dropped.
/// Used for side-effect-free re-simulation.
pub struct FrozenRoster<'a>(pub &'a dyn EnemyRoster);

impl EnemyRoster for FrozenRoster<'_> {
    fn category(&self, id: EnemyId) -> Option<EnemyCategory> {
        self.0.category(id)
    }

    fn position(&self, id: EnemyId) -> Option<Vec3> {
        self.0.position(id)
    }

    fn is_immune(&self, id: EnemyId) -> bool {
        self.0.is_immune(id)
    }

    fn effects_ready(&self, id: EnemyId) -> bool {
        self.0.effects_ready(id)
    }

    fn nearest_other(&self, from: Vec3, exclude: EnemyId, max_distance: f32) -> Option<EnemyId> {
        self.0.nearest_other(from, exclude, max_distance)
    }

    fn take_hit(&mut self, _id: EnemyId, _contact: &SweepHit) {}

    fn take_kick(&mut self, _id: EnemyId, _impulse: Vec3) {}

    fn reflect_projectile(&mut self, _id: ProjectileId, _normal: Vec3) {}
}
