//! SDF primitives for the built-in scene
//!
//! Every shape is a convex solid with a signed distance and a closest-point
//! projection; sweeps are sphere-traced against the distance field.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Signed distance to a sphere
#[inline]
pub fn sd_sphere(p: Vec3, center: Vec3, radius: f32) -> f32 {
    (p - center).length() - radius
}

/// Signed distance to an oriented box
pub fn sd_box(p: Vec3, center: Vec3, half_extents: Vec3, rotation: Quat) -> f32 {
    let local = rotation.inverse() * (p - center);
    let q = local.abs() - half_extents;
    q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
}

/// Signed distance to the half-space below a plane `normal . p = offset`
#[inline]
pub fn sd_plane(p: Vec3, normal: Vec3, offset: f32) -> f32 {
    normal.dot(p) - offset
}

/// Closest point on segment `a`-`b` to `p`
pub fn closest_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-8 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest point of a solid oriented box to `p` (`p` itself when inside)
pub fn closest_on_box(p: Vec3, center: Vec3, half_extents: Vec3, rotation: Quat) -> Vec3 {
    let local = rotation.inverse() * (p - center);
    center + rotation * local.clamp(-half_extents, half_extents)
}

/// A convex collider shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    Box {
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
    },
    /// Solid half-space below the plane
    Plane { normal: Vec3, offset: f32 },
}

impl Shape {
    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        Shape::Box {
            center,
            half_extents,
            rotation: Quat::IDENTITY,
        }
    }

    /// Horizontal ground plane at height `y`
    pub fn ground(y: f32) -> Self {
        Shape::Plane {
            normal: Vec3::Y,
            offset: y,
        }
    }

    pub fn distance(&self, p: Vec3) -> f32 {
        match *self {
            Shape::Sphere { center, radius } => sd_sphere(p, center, radius),
            Shape::Box {
                center,
                half_extents,
                rotation,
            } => sd_box(p, center, half_extents, rotation),
            Shape::Plane { normal, offset } => sd_plane(p, normal, offset),
        }
    }

    /// Closest point of the solid to `p`; returns `p` when it is inside
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        match *self {
            Shape::Sphere { center, radius } => {
                let offset = p - center;
                let dist = offset.length();
                if dist <= radius {
                    p
                } else {
                    center + offset * (radius / dist)
                }
            }
            Shape::Box {
                center,
                half_extents,
                rotation,
            } => closest_on_box(p, center, half_extents, rotation),
            Shape::Plane { normal, offset } => {
                let d = sd_plane(p, normal, offset);
                if d <= 0.0 { p } else { p - normal * d }
            }
        }
    }

    /// Move the shape (used for enemy projectiles)
    pub fn translate(&mut self, delta: Vec3) {
        match self {
            Shape::Sphere { center, .. } | Shape::Box { center, .. } => *center += delta,
            Shape::Plane { normal, offset } => *offset += normal.dot(delta),
        }
    }
}

/// Compute SDF gradient (surface normal) using central differences
pub fn sdf_gradient<F>(p: Vec3, sdf: F) -> Vec3
where
    F: Fn(Vec3) -> f32,
{
    let eps = 1e-3;
    let dx = sdf(p + Vec3::X * eps) - sdf(p - Vec3::X * eps);
    let dy = sdf(p + Vec3::Y * eps) - sdf(p - Vec3::Y * eps);
    let dz = sdf(p + Vec3::Z * eps) - sdf(p - Vec3::Z * eps);
    Vec3::new(dx, dy, dz).normalize_or_zero()
}

/// Sphere-trace a sphere of `radius` from `start` along unit `dir`.
/// Returns the travelled distance at first contact, if within `max_distance`.
pub fn raymarch_collision<F>(
    start: Vec3,
    dir: Vec3,
    max_distance: f32,
    radius: f32,
    max_steps: usize,
    sdf: F,
) -> Option<f32>
where
    F: Fn(Vec3) -> f32,
{
    const CONTACT_EPS: f32 = 1e-3;

    let mut t = 0.0;
    for _ in 0..max_steps {
        let d = sdf(start + dir * t) - radius;
        if d < CONTACT_EPS {
            return Some(t);
        }
        t += d;
        if t > max_distance {
            break;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_distance_and_closest_point() {
        let shape = Shape::cuboid(Vec3::ZERO, Vec3::splat(1.0));
        assert!((shape.distance(Vec3::new(3.0, 0.0, 0.0)) - 2.0).abs() < 1e-5);
        assert!(shape.distance(Vec3::ZERO) < 0.0);
        let cp = shape.closest_point(Vec3::new(3.0, 0.5, 0.0));
        assert!((cp - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-5);
        // Inside points project to themselves
        assert_eq!(shape.closest_point(Vec3::splat(0.25)), Vec3::splat(0.25));
    }

    #[test]
    fn test_rotated_box() {
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        let d = sd_box(Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO, Vec3::splat(1.0), rotation);
        // Corner now points along +X at distance sqrt(2)
        assert!((d - (2.0 - 2f32.sqrt())).abs() < 1e-4);
    }

    #[test]
    fn test_plane_closest_point() {
        let ground = Shape::ground(0.0);
        assert_eq!(ground.closest_point(Vec3::new(2.0, 5.0, 1.0)), Vec3::new(2.0, 0.0, 1.0));
        assert!((ground.distance(Vec3::new(0.0, 3.0, 0.0)) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_raymarch_hits_wall() {
        let wall = Shape::cuboid(Vec3::new(10.0, 0.0, 0.0), Vec3::splat(1.0));
        let t = raymarch_collision(Vec3::ZERO, Vec3::X, 20.0, 0.5, 64, |p| wall.distance(p));
        let t = t.expect("should hit");
        assert!((t - 8.5).abs() < 0.01);

        let miss = raymarch_collision(Vec3::ZERO, Vec3::X, 5.0, 0.5, 64, |p| wall.distance(p));
        assert!(miss.is_none());
    }

    #[test]
    fn test_gradient_is_surface_normal() {
        let ground = Shape::ground(0.0);
        let n = sdf_gradient(Vec3::new(0.0, 0.2, 0.0), |p| ground.distance(p));
        assert!((n - Vec3::Y).length() < 1e-3);
    }
}
