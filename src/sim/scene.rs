//! Built-in SDF scene
//!
//! A small self-contained world made of convex SDF shapes. It implements the
//! world query, enemy and rope collaborators so the core can run headless
//! (tests, the native runner) without a host engine.

use std::path::Path;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::collision::reflect_velocity;
use super::enemy::{EnemyCategory, EnemyRoster};
use super::feedback::FeedbackLog;
use super::rope::{Ease, RopeEnd, RopeField, RopeId};
use super::sdf::{Shape, closest_on_box, closest_on_segment, raymarch_collision, sdf_gradient};
use super::tick::Collaborators;
use super::world::{
    EnemyId, HitTarget, Layers, Overlap, ProjectileId, RopeNodeId, SweepHit, WorldQuery,
};

/// Sphere-tracing step budget per collider
const MARCH_STEPS: usize = 64;
/// Alternating-projection passes for convex-vs-convex overlap
const PROJECTION_PASSES: usize = 12;
/// Touching within this gap counts as overlapping
const CONTACT_SLOP: f32 = 1e-3;

/// Seconds an enemy ignores further ball hits after taking one
pub const HIT_IMMUNITY: f32 = 0.2;
/// Seconds before an enemy may trigger hit-stop/shake again
pub const EFFECTS_COOLDOWN: f32 = 0.1;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scene: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A shape tagged with its collision layers and what it represents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: Shape,
    pub layers: Layers,
    pub target: HitTarget,
}

/// Static colliders plus moving enemy projectiles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    pub colliders: Vec<Collider>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let scene = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!(
            "Loaded scene from {} ({} colliders)",
            path.display(),
            scene.colliders.len()
        );
        Ok(scene)
    }

    pub fn add(&mut self, shape: Shape, layers: Layers, target: HitTarget) {
        self.colliders.push(Collider {
            shape,
            layers,
            target,
        });
    }

    /// Static environment geometry
    pub fn add_geometry(&mut self, shape: Shape) {
        self.add(shape, Layers::ENVIRONMENT, HitTarget::Geometry);
    }

    /// Move every collider belonging to `target`
    pub fn translate_target(&mut self, target: HitTarget, delta: Vec3) {
        for collider in self.colliders.iter_mut().filter(|c| c.target == target) {
            collider.shape.translate(delta);
        }
    }

    fn matching(&self, layers: Layers) -> impl Iterator<Item = &Collider> {
        self.colliders.iter().filter(move |c| c.layers.intersects(layers))
    }
}

/// Signed gap between a shape and the segment `a`-`b`
fn segment_gap(shape: &Shape, a: Vec3, b: Vec3) -> f32 {
    let mut s = (a + b) * 0.5;
    for _ in 0..PROJECTION_PASSES {
        s = closest_on_segment(shape.closest_point(s), a, b);
    }
    shape.distance(s)
}

/// Signed gap between a shape and a solid oriented box
fn box_gap(shape: &Shape, center: Vec3, half_extents: Vec3, rotation: Quat) -> f32 {
    let mut q = center;
    for _ in 0..PROJECTION_PASSES {
        q = closest_on_box(shape.closest_point(q), center, half_extents, rotation);
    }
    shape.distance(q)
}

impl WorldQuery for Scene {
    fn overlap_capsule(
        &self,
        a: Vec3,
        b: Vec3,
        radius: f32,
        reference: Vec3,
        layers: Layers,
    ) -> Vec<Overlap> {
        self.matching(layers)
            .filter(|c| segment_gap(&c.shape, a, b) < radius)
            .map(|c| Overlap {
                closest_point: c.shape.closest_point(reference),
                target: c.target,
            })
            .collect()
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: Layers) -> Vec<Overlap> {
        self.matching(layers)
            .filter(|c| c.shape.distance(center) < radius)
            .map(|c| Overlap {
                closest_point: c.shape.closest_point(center),
                target: c.target,
            })
            .collect()
    }

    fn overlap_box(
        &self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        layers: Layers,
    ) -> Vec<Overlap> {
        self.matching(layers)
            .filter(|c| box_gap(&c.shape, center, half_extents, rotation) < CONTACT_SLOP)
            .map(|c| Overlap {
                closest_point: c.shape.closest_point(center),
                target: c.target,
            })
            .collect()
    }

    fn sphere_cast_all(
        &self,
        origin: Vec3,
        radius: f32,
        dir: Vec3,
        max_distance: f32,
        layers: Layers,
    ) -> Vec<SweepHit> {
        let dir = dir.normalize_or_zero();
        if dir == Vec3::ZERO {
            return Vec::new();
        }

        let mut hits: Vec<SweepHit> = self
            .matching(layers)
            .filter_map(|c| {
                let sdf = |p: Vec3| c.shape.distance(p);
                let t = raymarch_collision(origin, dir, max_distance, radius, MARCH_STEPS, sdf)?;
                let center = origin + dir * t;
                let mut normal = sdf_gradient(center, sdf);
                if normal == Vec3::ZERO {
                    normal = -dir;
                }
                Some(SweepHit {
                    point: c.shape.closest_point(center),
                    normal,
                    distance: t,
                    target: c.target,
                })
            })
            .collect();

        // Stable sort keeps collider order for equal distances
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

/// Host-side record of one enemy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyRecord {
    pub id: EnemyId,
    pub category: EnemyCategory,
    pub position: Vec3,
    pub immune_timer: f32,
    pub effects_cooldown: f32,
    pub alive: bool,
    pub hits_taken: u32,
    pub kicks_taken: Vec<Vec3>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileRecord {
    pub id: ProjectileId,
    pub velocity: Vec3,
}

/// Minimal enemy bookkeeping for the built-in scene
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnemyList {
    pub enemies: Vec<EnemyRecord>,
    pub projectiles: Vec<ProjectileRecord>,
}

impl EnemyList {
    fn get(&self, id: EnemyId) -> Option<&EnemyRecord> {
        self.enemies.iter().find(|e| e.id == id && e.alive)
    }

    fn get_mut(&mut self, id: EnemyId) -> Option<&mut EnemyRecord> {
        self.enemies.iter_mut().find(|e| e.id == id && e.alive)
    }

    /// Count down immunity and effect cooldowns
    pub fn update(&mut self, dt: f32) {
        for enemy in &mut self.enemies {
            enemy.immune_timer = (enemy.immune_timer - dt).max(0.0);
            enemy.effects_cooldown = (enemy.effects_cooldown - dt).max(0.0);
        }
    }
}

impl EnemyRoster for EnemyList {
    fn category(&self, id: EnemyId) -> Option<EnemyCategory> {
        self.get(id).map(|e| e.category)
    }

    fn position(&self, id: EnemyId) -> Option<Vec3> {
        self.get(id).map(|e| e.position)
    }

    fn is_immune(&self, id: EnemyId) -> bool {
        self.get(id).is_some_and(|e| e.immune_timer > 0.0)
    }

    fn effects_ready(&self, id: EnemyId) -> bool {
        self.get(id).is_some_and(|e| e.effects_cooldown <= 0.0)
    }

    fn nearest_other(&self, from: Vec3, exclude: EnemyId, max_distance: f32) -> Option<EnemyId> {
        self.enemies
            .iter()
            .filter(|e| e.alive && e.id != exclude)
            .map(|e| (e.id, e.position.distance(from)))
            .filter(|(_, d)| *d <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    fn take_hit(&mut self, id: EnemyId, _contact: &SweepHit) {
        if let Some(enemy) = self.get_mut(id) {
            enemy.hits_taken += 1;
            enemy.immune_timer = HIT_IMMUNITY;
            enemy.effects_cooldown = EFFECTS_COOLDOWN;
        }
    }

    fn take_kick(&mut self, id: EnemyId, impulse: Vec3) {
        if let Some(enemy) = self.get_mut(id) {
            enemy.kicks_taken.push(impulse);
            enemy.immune_timer = HIT_IMMUNITY;
            enemy.effects_cooldown = EFFECTS_COOLDOWN;
        }
    }

    fn reflect_projectile(&mut self, id: ProjectileId, normal: Vec3) {
        if let Some(p) = self.projectiles.iter_mut().find(|p| p.id == id) {
            p.velocity = reflect_velocity(p.velocity, normal);
        }
    }
}

/// Straight two-ended rope used by the built-in scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RopeState {
    pub leading: Vec3,
    pub trailing: Vec3,
    pub leading_velocity: Vec3,
    /// Seconds until removal once destroyed
    pub destroy_in: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RopeLog {
    pub ropes: Vec<RopeState>,
    /// Every node impulse received, in order
    pub node_impulses: Vec<(RopeNodeId, Vec3)>,
}

impl RopeLog {
    fn rope(&self, rope: RopeId) -> Option<&RopeState> {
        self.ropes.get(rope.0 as usize)
    }

    fn rope_mut(&mut self, rope: RopeId) -> Option<&mut RopeState> {
        self.ropes.get_mut(rope.0 as usize)
    }

    /// Ropes not yet destroyed
    pub fn live_count(&self) -> usize {
        self.ropes.iter().filter(|r| r.destroy_in.is_none()).count()
    }
}

impl RopeField for RopeLog {
    fn spawn_rope(&mut self, origin: Vec3) -> RopeId {
        self.ropes.push(RopeState {
            leading: origin,
            trailing: origin,
            leading_velocity: Vec3::ZERO,
            destroy_in: None,
        });
        RopeId(self.ropes.len() as u32 - 1)
    }

    fn apply_impulse_at_node(&mut self, node: RopeNodeId, velocity_delta: Vec3) {
        self.node_impulses.push((node, velocity_delta));
    }

    fn lock_endpoint(&mut self, rope: RopeId, end: RopeEnd, anchor: Vec3) {
        if let Some(r) = self.rope_mut(rope) {
            match end {
                RopeEnd::Leading => r.leading = anchor,
                RopeEnd::Trailing => r.trailing = anchor,
            }
        }
    }

    fn set_leading_velocity(&mut self, rope: RopeId, velocity: Vec3) {
        if let Some(r) = self.rope_mut(rope) {
            r.leading_velocity = velocity;
        }
    }

    fn ease_leading_end_to(
        &mut self,
        rope: RopeId,
        from: Vec3,
        to: Vec3,
        elapsed: f32,
        duration: f32,
        curve: Ease,
    ) {
        if let Some(r) = self.rope_mut(rope) {
            let t = if duration > 0.0 { elapsed / duration } else { 1.0 };
            r.leading = from.lerp(to, curve.apply(t));
        }
    }

    fn end_to_start_direction(&self, rope: RopeId) -> Option<Vec3> {
        self.rope(rope)
            .map(|r| (r.leading - r.trailing).normalize_or_zero())
    }

    fn leading_position(&self, rope: RopeId) -> Option<Vec3> {
        self.rope(rope).map(|r| r.leading)
    }

    fn destroy(&mut self, rope: RopeId, delay: f32) {
        if let Some(r) = self.rope_mut(rope) {
            r.destroy_in = Some(delay);
        }
    }
}

/// Scene plus every collaborator the core needs
#[derive(Debug, Clone, Default)]
pub struct Arena {
    pub scene: Scene,
    pub enemies: EnemyList,
    pub ropes: RopeLog,
    pub feedback: FeedbackLog,
    next_id: u32,
}

impl Arena {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            ..Default::default()
        }
    }

    /// Flat ground at y = 0 with four walls
    pub fn walled_floor(half_size: f32) -> Self {
        let mut scene = Scene::new();
        scene.add_geometry(Shape::ground(0.0));
        let h = half_size;
        for (center, half) in [
            (Vec3::new(h + 1.0, 5.0, 0.0), Vec3::new(1.0, 5.0, h)),
            (Vec3::new(-h - 1.0, 5.0, 0.0), Vec3::new(1.0, 5.0, h)),
            (Vec3::new(0.0, 5.0, h + 1.0), Vec3::new(h, 5.0, 1.0)),
            (Vec3::new(0.0, 5.0, -h - 1.0), Vec3::new(h, 5.0, 1.0)),
        ] {
            scene.add_geometry(Shape::cuboid(center, half));
        }
        Self::new(scene)
    }

    /// Demo level used by the native runner
    pub fn demo() -> Self {
        let mut arena = Self::walled_floor(60.0);
        arena.scene.add_geometry(Shape::cuboid(Vec3::new(0.0, 4.0, 30.0), Vec3::new(8.0, 4.0, 2.0)));
        arena.add_enemy(Vec3::new(-10.0, 2.0, 25.0), 1.5, EnemyCategory::Dummy);
        arena.add_enemy(Vec3::new(10.0, 2.0, 25.0), 1.5, EnemyCategory::Ricochet);
        arena.add_enemy(Vec3::new(0.0, 2.0, 45.0), 2.0, EnemyCategory::Blocker);
        arena.add_enemy(Vec3::new(20.0, 6.0, 40.0), 1.5, EnemyCategory::HorizontalShooter);
        arena.add_rope_node(Vec3::new(-20.0, 8.0, 10.0), 0.5);
        arena.scene.add(
            Shape::cuboid(Vec3::new(0.0, 3.0, 58.0), Vec3::new(3.0, 3.0, 0.5)),
            Layers::ENEMY_HURTBOX | Layers::KICK_HITABLE,
            HitTarget::WinGate,
        );
        arena
    }

    fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Register an enemy with a spherical hurtbox
    pub fn add_enemy(&mut self, position: Vec3, radius: f32, category: EnemyCategory) -> EnemyId {
        let id = EnemyId(self.next_entity_id());
        self.scene.add(
            Shape::Sphere {
                center: position,
                radius,
            },
            Layers::ENEMY_HURTBOX | Layers::KICK_HITABLE,
            HitTarget::Enemy(id),
        );
        self.enemies.enemies.push(EnemyRecord {
            id,
            category,
            position,
            immune_timer: 0.0,
            effects_cooldown: 0.0,
            alive: true,
            hits_taken: 0,
            kicks_taken: Vec::new(),
        });
        id
    }

    pub fn add_enemy_projectile(&mut self, position: Vec3, radius: f32, velocity: Vec3) -> ProjectileId {
        let id = ProjectileId(self.next_entity_id());
        self.scene.add(
            Shape::Sphere {
                center: position,
                radius,
            },
            Layers::ENEMY_PROJECTILE,
            HitTarget::EnemyProjectile(id),
        );
        self.enemies.projectiles.push(ProjectileRecord { id, velocity });
        id
    }

    pub fn add_rope_node(&mut self, position: Vec3, radius: f32) -> RopeNodeId {
        let node = RopeNodeId {
            rope: u32::MAX,
            node: self.next_entity_id(),
        };
        self.scene.add(
            Shape::Sphere {
                center: position,
                radius,
            },
            Layers::ROPE | Layers::KICK_HITABLE,
            HitTarget::RopeNode(node),
        );
        node
    }

    /// Advance host-owned state: enemy timers, projectile motion, rope removal
    pub fn update(&mut self, dt: f32) {
        self.enemies.update(dt);
        for p in &self.enemies.projectiles {
            self.scene
                .translate_target(HitTarget::EnemyProjectile(p.id), p.velocity * dt);
        }
        for rope in &mut self.ropes.ropes {
            if let Some(t) = rope.destroy_in.as_mut() {
                *t = (*t - dt).max(0.0);
            }
        }
    }

    /// Split-borrow the collaborators for one core call
    pub fn collaborators(&mut self) -> Collaborators<'_> {
        Collaborators {
            world: &self.scene,
            enemies: &mut self.enemies,
            ropes: &mut self.ropes,
            feedback: &mut self.feedback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capsule_overlaps_ground() {
        let arena = Arena::walled_floor(20.0);
        let pos = Vec3::new(0.0, 1.4, 0.0);
        let hits = arena.scene.overlap_capsule(
            pos - Vec3::Y,
            pos + Vec3::Y,
            0.5,
            pos,
            Layers::ENVIRONMENT,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].closest_point, Vec3::new(0.0, 0.0, 0.0));

        let airborne = Vec3::new(0.0, 5.0, 0.0);
        let hits = arena.scene.overlap_capsule(
            airborne - Vec3::Y,
            airborne + Vec3::Y,
            0.5,
            airborne,
            Layers::ENVIRONMENT,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn test_sphere_cast_sorted_and_filtered() {
        let mut arena = Arena::walled_floor(20.0);
        let near = arena.add_enemy(Vec3::new(0.0, 2.0, 5.0), 1.0, EnemyCategory::Dummy);
        arena.add_enemy(Vec3::new(0.0, 2.0, 9.0), 1.0, EnemyCategory::Dummy);

        let hits = arena.scene.sphere_cast_all(
            Vec3::new(0.0, 2.0, 0.0),
            0.5,
            Vec3::Z,
            15.0,
            Layers::ENEMY_HURTBOX,
        );
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].target, HitTarget::Enemy(near));
        assert!((hits[0].distance - 3.5).abs() < 0.01);
        assert!(hits[0].normal.z < -0.99);
    }

    #[test]
    fn test_kick_box_overlap() {
        let mut arena = Arena::walled_floor(20.0);
        let id = arena.add_enemy(Vec3::new(0.0, 1.0, 4.0), 1.0, EnemyCategory::Dummy);
        let hits = arena.scene.overlap_box(
            Vec3::new(0.0, 1.0, 2.5),
            Vec3::new(2.5, 2.5, 2.5),
            Quat::IDENTITY,
            Layers::KICK_HITABLE,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, HitTarget::Enemy(id));
    }

    #[test]
    fn test_depenetrate_out_of_ground() {
        let arena = Arena::walled_floor(20.0);
        let fixed = arena
            .scene
            .depenetrate_sphere(Vec3::new(0.0, 0.2, 0.0), 0.5, Layers::ENVIRONMENT);
        assert!(fixed.y >= 0.5 - 1e-4);
    }

    #[test]
    fn test_nearest_other_enemy() {
        let mut arena = Arena::walled_floor(50.0);
        let a = arena.add_enemy(Vec3::ZERO, 1.0, EnemyCategory::Dummy);
        let b = arena.add_enemy(Vec3::new(5.0, 0.0, 0.0), 1.0, EnemyCategory::Dummy);
        arena.add_enemy(Vec3::new(30.0, 0.0, 0.0), 1.0, EnemyCategory::Dummy);
        assert_eq!(arena.enemies.nearest_other(Vec3::ZERO, a, 100.0), Some(b));
        assert_eq!(arena.enemies.nearest_other(Vec3::ZERO, a, 2.0), None);
    }

    #[test]
    fn test_scene_json_round_trip() {
        let arena = Arena::demo();
        let json = serde_json::to_string(&arena.scene).unwrap();
        let scene = Scene::from_json(&json).unwrap();
        assert_eq!(scene.colliders.len(), arena.scene.colliders.len());
        assert!(Scene::from_json("[1, 2").is_err());
    }
}
