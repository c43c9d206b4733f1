//! World query interface
//!
//! The core never owns static geometry, enemies or ropes. It asks a
//! [`WorldQuery`] implementation for overlaps and sweeps filtered by
//! collision layer. Player balls are not part of the world: they live in the
//! [`BallPool`](super::ball::BallPool) and are queried by the core directly.

use bitflags::bitflags;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Named collision categories
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Layers: u32 {
        const ENVIRONMENT = 1 << 0;
        const ENEMY_HURTBOX = 1 << 1;
        const ENEMY_PROJECTILE = 1 << 2;
        const ROPE = 1 << 3;
        /// Things a kick can touch besides balls (enemies, win gates, rope nodes)
        const KICK_HITABLE = 1 << 4;
    }
}

/// Handle of an enemy owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

/// Handle of an enemy projectile owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(pub u32);

/// A single node of a rope owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RopeNodeId {
    pub rope: u32,
    pub node: u32,
}

/// What a query touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitTarget {
    /// Static level geometry
    Geometry,
    /// An enemy hurtbox (or kick-hitable enemy body)
    Enemy(EnemyId),
    /// A projectile fired by an enemy
    EnemyProjectile(ProjectileId),
    /// Level exit; touching it wins
    WinGate,
    RopeNode(RopeNodeId),
}

/// Result of a swept query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepHit {
    /// Contact point on the hit surface
    pub point: Vec3,
    /// Surface normal at the contact, pointing away from the surface
    pub normal: Vec3,
    /// Distance travelled along the sweep before contact
    pub distance: f32,
    pub target: HitTarget,
}

/// Result of a volume overlap query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Overlap {
    /// Closest point on the overlapped collider to the query's reference point
    pub closest_point: Vec3,
    pub target: HitTarget,
}

/// Synchronous world queries. Results come back in ascending distance order
/// (sweeps) or a stable order (overlaps) so the simulation stays deterministic.
pub trait WorldQuery {
    /// Colliders overlapping the capsule `a`-`b`; closest points are taken
    /// relative to `reference`
    fn overlap_capsule(
        &self,
        a: Vec3,
        b: Vec3,
        radius: f32,
        reference: Vec3,
        layers: Layers,
    ) -> Vec<Overlap>;

    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: Layers) -> Vec<Overlap>;

    /// Colliders overlapping an oriented box
    fn overlap_box(
        &self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        layers: Layers,
    ) -> Vec<Overlap>;

    /// Every collider a sphere touches while moving `max_distance` along `dir`
    fn sphere_cast_all(
        &self,
        origin: Vec3,
        radius: f32,
        dir: Vec3,
        max_distance: f32,
        layers: Layers,
    ) -> Vec<SweepHit>;

    /// First collider hit by a sphere sweep
    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        dir: Vec3,
        max_distance: f32,
        layers: Layers,
    ) -> Option<SweepHit> {
        self.sphere_cast_all(origin, radius, dir, max_distance, layers)
            .into_iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f32, layers: Layers) -> Option<SweepHit> {
        self.sphere_cast(origin, 0.0, dir, max_distance, layers)
    }

    /// Push a sphere out of everything it overlaps on `layers`; returns the
    /// corrected center
    fn depenetrate_sphere(&self, center: Vec3, radius: f32, layers: Layers) -> Vec3 {
        let mut center = center;
        // A few relaxation passes handle corners between two colliders
        for _ in 0..4 {
            let overlaps = self.overlap_sphere(center, radius, layers);
            if overlaps.is_empty() {
                break;
            }
            for overlap in overlaps {
                let offset = center - overlap.closest_point;
                let dist = offset.length();
                if dist < radius {
                    let dir = if dist > 1e-5 { offset / dist } else { Vec3::Y };
                    center += dir * (radius - dist);
                }
            }
        }
        center
    }
}
