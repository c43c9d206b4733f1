//! Collision resolution shared by the agent and balls
//!
//! Contacts are resolved one after another against the same velocity: each
//! contact the volume is moving into has its normal component removed
//! ("clipped"), leaving the tangential slide.

use glam::{Quat, Vec3};

use super::world::{HitTarget, Layers, SweepHit, WorldQuery};
use crate::consts::GROUND_ANGLE_DEG;

/// A volume being moved through the world
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Volume {
    /// Capsule between two sphere centers
    Capsule { a: Vec3, b: Vec3, radius: f32 },
    Sphere { center: Vec3, radius: f32 },
}

/// One resolved contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Nearest world point to the volume's reference point
    pub point: Vec3,
    /// Unit direction from the contact point toward the volume
    pub separation: Vec3,
    /// Contact counts as ground (within the ground angle of up)
    pub ground: bool,
    pub target: HitTarget,
}

/// Outcome of clipping a velocity against the world
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub velocity: Vec3,
    /// Contacts that actually clipped the velocity, in resolution order
    pub contacts: Vec<Contact>,
    /// At least one ground contact was found
    pub grounded: bool,
}

/// Ground test: angle between separation and `up` is at most the ground angle
#[inline]
pub fn is_ground(separation: Vec3, up: Vec3) -> bool {
    separation.angle_between(up).to_degrees() <= GROUND_ANGLE_DEG + 1e-3
}

/// Remove the component of `velocity` along `normal` (slide response)
#[inline]
pub fn clip_velocity(velocity: Vec3, normal: Vec3) -> Vec3 {
    velocity - normal * velocity.dot(normal)
}

/// Standard reflection: v' = v - 2(v.n)n
#[inline]
pub fn reflect_velocity(velocity: Vec3, normal: Vec3) -> Vec3 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Clip `velocity` against every contact of `volume` on `layers`.
///
/// `reference` is the point separation directions are measured from (the
/// agent origin). Contacts the velocity is not moving into are skipped.
pub fn resolve_contacts(
    world: &dyn WorldQuery,
    volume: Volume,
    reference: Vec3,
    velocity: Vec3,
    up: Vec3,
    layers: Layers,
) -> Resolution {
    let overlaps = match volume {
        Volume::Capsule { a, b, radius } => world.overlap_capsule(a, b, radius, reference, layers),
        Volume::Sphere { center, radius } => world.overlap_sphere(center, radius, layers),
    };

    let mut velocity = velocity;
    let mut contacts = Vec::new();
    let mut grounded = false;

    for overlap in overlaps {
        let separation = (reference - overlap.closest_point).normalize_or_zero();
        if velocity.dot(separation) >= 0.0 {
            continue;
        }

        let ground = is_ground(separation, up);
        grounded |= ground;
        velocity = clip_velocity(velocity, separation);
        contacts.push(Contact {
            point: overlap.closest_point,
            separation,
            ground,
            target: overlap.target,
        });
    }

    Resolution {
        velocity,
        contacts,
        grounded,
    }
}

/// Everything a sphere moving at `velocity` touches during `dt`
pub fn sweep_sphere(
    world: &dyn WorldQuery,
    center: Vec3,
    radius: f32,
    velocity: Vec3,
    dt: f32,
    layers: Layers,
) -> Vec<SweepHit> {
    let dir = velocity.normalize_or_zero();
    if dir == Vec3::ZERO {
        return Vec::new();
    }
    world.sphere_cast_all(center, radius, dir, (velocity * dt).length(), layers)
}

/// Sphere vs solid oriented box
pub fn sphere_overlaps_box(
    center: Vec3,
    radius: f32,
    box_center: Vec3,
    half_extents: Vec3,
    rotation: Quat,
) -> bool {
    let closest = super::sdf::closest_on_box(center, box_center, half_extents, rotation);
    closest.distance_squared(center) <= radius * radius
}

/// Distance a sphere of `radius` travels along unit `dir` from `origin`
/// before touching a sphere at `target` of `target_radius`
pub fn sphere_cast_sphere(
    origin: Vec3,
    radius: f32,
    dir: Vec3,
    max_distance: f32,
    target: Vec3,
    target_radius: f32,
) -> Option<f32> {
    let r = radius + target_radius;
    let m = origin - target;
    let c = m.length_squared() - r * r;
    if c <= 0.0 {
        return Some(0.0);
    }
    let b = m.dot(dir);
    if b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t <= max_distance).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::scene::Arena;
    use crate::sim::sdf::Shape;

    fn capsule_at(pos: Vec3) -> Volume {
        Volume::Capsule {
            a: pos - Vec3::Y,
            b: pos + Vec3::Y,
            radius: 0.5,
        }
    }

    #[test]
    fn test_ground_contact_clips_fall() {
        let arena = Arena::walled_floor(20.0);
        let pos = Vec3::new(0.0, 1.45, 0.0);
        let res = resolve_contacts(
            &arena.scene,
            capsule_at(pos),
            pos,
            Vec3::new(3.0, -10.0, 0.0),
            Vec3::Y,
            Layers::ENVIRONMENT,
        );
        assert!(res.grounded);
        assert_eq!(res.contacts.len(), 1);
        assert!(res.velocity.y.abs() < 1e-5);
        assert!((res.velocity.x - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_separating_contact_ignored() {
        let arena = Arena::walled_floor(20.0);
        let pos = Vec3::new(0.0, 1.45, 0.0);
        let res = resolve_contacts(
            &arena.scene,
            capsule_at(pos),
            pos,
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::Y,
            Layers::ENVIRONMENT,
        );
        assert!(!res.grounded);
        assert!(res.contacts.is_empty());
        assert_eq!(res.velocity, Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn test_wall_is_not_ground() {
        let mut arena = Arena::walled_floor(20.0);
        arena
            .scene
            .add_geometry(Shape::cuboid(Vec3::new(2.0, 5.0, 0.0), Vec3::new(1.0, 5.0, 5.0)));
        let pos = Vec3::new(0.6, 5.0, 0.0);
        let res = resolve_contacts(
            &arena.scene,
            capsule_at(pos),
            pos,
            Vec3::new(8.0, 0.0, 2.0),
            Vec3::Y,
            Layers::ENVIRONMENT,
        );
        assert!(!res.grounded);
        assert_eq!(res.contacts.len(), 1);
        assert!(res.velocity.x.abs() < 1e-5);
        assert!((res.velocity.z - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_ground_angle_threshold() {
        let up = Vec3::Y;
        let steep = Quat::from_rotation_z(35f32.to_radians()) * up;
        let gentle = Quat::from_rotation_z(25f32.to_radians()) * up;
        assert!(!is_ground(steep, up));
        assert!(is_ground(gentle, up));
        assert!(is_ground(Quat::from_rotation_z(30f32.to_radians()) * up, up));
    }

    #[test]
    fn test_reflect_velocity() {
        let reflected = reflect_velocity(Vec3::new(100.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        assert!((reflected.x + 100.0).abs() < 0.001);
    }

    #[test]
    fn test_sphere_cast_sphere() {
        let t = sphere_cast_sphere(Vec3::ZERO, 1.0, Vec3::Z, 100.0, Vec3::new(0.0, 0.0, 10.0), 1.0);
        assert!((t.unwrap() - 8.0).abs() < 1e-5);
        assert!(sphere_cast_sphere(Vec3::ZERO, 1.0, -Vec3::Z, 100.0, Vec3::new(0.0, 0.0, 10.0), 1.0).is_none());
        assert!(sphere_cast_sphere(Vec3::ZERO, 1.0, Vec3::Z, 5.0, Vec3::new(0.0, 0.0, 10.0), 1.0).is_none());
    }

    #[test]
    fn test_sphere_overlaps_box() {
        assert!(sphere_overlaps_box(Vec3::new(0.0, 0.0, 3.2), 0.5, Vec3::ZERO, Vec3::splat(3.0), Quat::IDENTITY));
        assert!(!sphere_overlaps_box(Vec3::new(0.0, 0.0, 4.0), 0.5, Vec3::ZERO, Vec3::splat(3.0), Quat::IDENTITY));
    }
}
