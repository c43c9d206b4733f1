//! Player balls and the reusable ball pool
//!
//! Slots are never freed: a disabled ball stays in the pool and is
//! reactivated by the next spawn. Handles are slot indices and stay valid
//! for the pool's lifetime.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::world::{Layers, WorldQuery};
use crate::consts::*;

/// Index of a ball slot in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BallHandle(pub u32);

impl BallHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single projectile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Spin; x curves along the velocity-up axis, y along velocity-right
    pub angular_velocity: Vec3,
    /// Velocity-aligned basis, refreshed every integration step
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub orientation: Quat,
    /// Speed before this tick's spin and collisions
    pub speed: f32,
    /// Enemy sweep radius, set by kicks
    pub radius: f32,
    pub lifetime: f32,
    pub bounce_count: u32,
    pub charged_bounce_count: u32,
    pub held_by_agent: bool,
    pub imaginary: bool,
    pub ricochet_charged: bool,
}

impl Default for Ball {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            forward: Vec3::Z,
            right: Vec3::X,
            up: Vec3::Y,
            orientation: Quat::IDENTITY,
            speed: 0.0,
            radius: BALL_MIN_RADIUS,
            lifetime: 0.0,
            bounce_count: 0,
            charged_bounce_count: 0,
            held_by_agent: false,
            imaginary: false,
            ricochet_charged: false,
        }
    }
}

impl Ball {
    /// A fresh ball at `position`
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Back to a fresh ball at `position`
    pub fn reset(&mut self, position: Vec3, imaginary: bool) {
        *self = Self {
            imaginary,
            ..Self::at(position)
        };
    }

    /// Launch along `velocity` with `spin`: counters and lifetime restart
    pub fn kick(&mut self, velocity: Vec3, spin: Vec3) {
        self.velocity = velocity;
        self.angular_velocity = spin;
        self.bounce_count = 0;
        self.charged_bounce_count = 0;
        self.lifetime = 0.0;
        self.held_by_agent = false;
    }

    /// Enemy sweep radius from the kicker's speed
    pub fn set_radius_from_speed(&mut self, agent_speed: f32) {
        self.radius = crate::lerp(BALL_MIN_RADIUS, BALL_MAX_RADIUS, agent_speed / 50.0);
    }

    /// Grant a ricochet charge
    pub fn charge(&mut self) {
        self.ricochet_charged = true;
        self.charged_bounce_count = 0;
    }

    /// Spend one charged bounce. Returns true if the charge redirected this
    /// bounce; the charge clears on the third.
    pub fn spend_charge(&mut self) -> bool {
        if !self.ricochet_charged {
            return false;
        }
        self.charged_bounce_count += 1;
        if self.charged_bounce_count >= 3 {
            self.ricochet_charged = false;
            self.charged_bounce_count = 0;
        }
        true
    }
}

/// Arena of ball slots with an active bitset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BallPool {
    slots: Vec<Ball>,
    active: Vec<bool>,
    /// Dedicated slot for trajectory previews; never counts as active
    scratch: Ball,
}

impl BallPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool with `capacity` inactive slots allocated up front
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Ball::default(); capacity],
            active: vec![false; capacity],
            scratch: Ball::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }

    pub fn is_active(&self, handle: BallHandle) -> bool {
        self.active.get(handle.index()).copied().unwrap_or(false)
    }

    /// Active ball, if any
    pub fn get(&self, handle: BallHandle) -> Option<&Ball> {
        self.is_active(handle).then(|| &self.slots[handle.index()])
    }

    pub fn get_mut(&mut self, handle: BallHandle) -> Option<&mut Ball> {
        if self.is_active(handle) {
            self.slots.get_mut(handle.index())
        } else {
            None
        }
    }

    /// Active balls in pool order
    pub fn iter(&self) -> impl Iterator<Item = (BallHandle, &Ball)> {
        self.slots
            .iter()
            .zip(&self.active)
            .enumerate()
            .filter(|(_, (_, active))| **active)
            .map(|(i, (ball, _))| (BallHandle(i as u32), ball))
    }

    /// Handles of all active balls in pool order
    pub fn handles(&self) -> Vec<BallHandle> {
        self.iter().map(|(h, _)| h).collect()
    }

    /// Activate a ball at `position`: reuse the first inactive slot or grow.
    /// The ball is pushed out of environment geometry.
    pub fn spawn(&mut self, position: Vec3, world: &dyn WorldQuery) -> BallHandle {
        let position = world.depenetrate_sphere(position, BALL_PROBE_RADIUS, Layers::ENVIRONMENT);

        let index = match self.active.iter().position(|a| !*a) {
            Some(index) => {
                self.slots[index].reset(position, false);
                self.active[index] = true;
                index
            }
            None => {
                self.slots.push(Ball::at(position));
                self.active.push(true);
                log::debug!("Ball pool grew to {} slots", self.slots.len());
                self.slots.len() - 1
            }
        };
        BallHandle(index as u32)
    }

    /// Add an externally spawned ball. Always a new slot, placed as given.
    pub fn append(&mut self, position: Vec3) -> BallHandle {
        self.slots.push(Ball::at(position));
        self.active.push(true);
        BallHandle(self.slots.len() as u32 - 1)
    }

    /// Zero a ball and return its slot to the pool
    pub fn disable(&mut self, handle: BallHandle) {
        if let Some(ball) = self.slots.get_mut(handle.index()) {
            let position = ball.position;
            ball.reset(position, false);
            self.active[handle.index()] = false;
        }
    }

    /// Reset the scratch ball for a preview run
    pub fn take_scratch(&mut self, position: Vec3, world: &dyn WorldQuery) -> &mut Ball {
        let position = world.depenetrate_sphere(position, BALL_PROBE_RADIUS, Layers::ENVIRONMENT);
        self.scratch.reset(position, true);
        &mut self.scratch
    }

    /// Zero the scratch ball after a preview run
    pub fn release_scratch(&mut self) {
        self.scratch.reset(Vec3::ZERO, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::scene::Arena;

    #[test]
    fn test_spawn_reuses_inactive_slot() {
        let arena = Arena::walled_floor(20.0);
        let mut pool = BallPool::new();
        let a = pool.spawn(Vec3::new(0.0, 5.0, 0.0), &arena.scene);
        let b = pool.spawn(Vec3::new(1.0, 5.0, 0.0), &arena.scene);
        assert_eq!(pool.capacity(), 2);

        pool.disable(a);
        assert!(!pool.is_active(a));
        assert_eq!(pool.active_count(), 1);

        let c = pool.spawn(Vec3::new(2.0, 5.0, 0.0), &arena.scene);
        assert_eq!(c, a);
        assert_eq!(pool.capacity(), 2);
        assert!(pool.is_active(b));
    }

    #[test]
    fn test_spawn_resets_transient_fields() {
        let arena = Arena::walled_floor(20.0);
        let mut pool = BallPool::new();
        let h = pool.spawn(Vec3::new(0.0, 5.0, 0.0), &arena.scene);
        {
            let ball = pool.get_mut(h).unwrap();
            ball.bounce_count = 4;
            ball.charge();
            ball.radius = 3.0;
            ball.velocity = Vec3::ONE;
        }
        pool.disable(h);
        let h = pool.spawn(Vec3::new(0.0, 5.0, 0.0), &arena.scene);
        let ball = pool.get(h).unwrap();
        assert_eq!(ball.bounce_count, 0);
        assert!(!ball.ricochet_charged);
        assert_eq!(ball.radius, 1.0);
        assert_eq!(ball.velocity, Vec3::ZERO);
        assert!(!ball.imaginary);
    }

    #[test]
    fn test_spawn_pushes_out_of_ground() {
        let arena = Arena::walled_floor(20.0);
        let mut pool = BallPool::new();
        let h = pool.spawn(Vec3::new(0.0, 0.1, 0.0), &arena.scene);
        assert!(pool.get(h).unwrap().position.y >= BALL_PROBE_RADIUS - 1e-4);
    }

    #[test]
    fn test_charge_clears_on_third_bounce() {
        let mut ball = Ball::default();
        assert!(!ball.spend_charge());
        ball.charge();
        assert!(ball.spend_charge());
        assert!(ball.spend_charge());
        assert!(ball.ricochet_charged);
        assert!(ball.spend_charge());
        assert!(!ball.ricochet_charged);
        assert_eq!(ball.charged_bounce_count, 0);
        assert!(!ball.spend_charge());
        assert_eq!(ball.charged_bounce_count, 0);
    }

    #[test]
    fn test_kick_restarts_counters() {
        let mut ball = Ball {
            bounce_count: 7,
            lifetime: 3.0,
            held_by_agent: true,
            ..Default::default()
        };
        ball.kick(Vec3::Z * 50.0, Vec3::X);
        assert_eq!(ball.bounce_count, 0);
        assert_eq!(ball.lifetime, 0.0);
        assert!(!ball.held_by_agent);
        assert_eq!(ball.angular_velocity, Vec3::X);
    }

    #[test]
    fn test_kick_mid_charge_restarts_charged_bounces() {
        let mut ball = Ball::default();
        ball.charge();
        assert!(ball.spend_charge());
        assert!(ball.spend_charge());
        assert_eq!(ball.charged_bounce_count, 2);

        ball.kick(Vec3::Z * 50.0, Vec3::ZERO);
        assert_eq!(ball.bounce_count, 0);
        assert_eq!(ball.charged_bounce_count, 0);
        assert!(ball.ricochet_charged);

        // Full three charged bounces again after the kick
        assert!(ball.spend_charge());
        assert!(ball.spend_charge());
        assert!(ball.ricochet_charged);
        assert!(ball.spend_charge());
        assert!(!ball.ricochet_charged);
    }

    #[test]
    fn test_radius_from_speed() {
        let mut ball = Ball::default();
        ball.set_radius_from_speed(0.0);
        assert_eq!(ball.radius, 1.0);
        ball.set_radius_from_speed(25.0);
        assert_eq!(ball.radius, 2.0);
        ball.set_radius_from_speed(500.0);
        assert_eq!(ball.radius, 3.0);
    }

    #[test]
    fn test_scratch_is_not_active() {
        let arena = Arena::walled_floor(20.0);
        let mut pool = BallPool::new();
        let scratch = pool.take_scratch(Vec3::new(0.0, 5.0, 0.0), &arena.scene);
        assert!(scratch.imaginary);
        assert_eq!(pool.capacity(), 0);
        assert_eq!(pool.active_count(), 0);
        pool.release_scratch();
    }
}
