//! Shot preview
//!
//! Re-simulates a scratch ball with the real projectile step at a fixed
//! synthetic step. The scratch ball is imaginary and every collaborator is
//! swapped for a read-only or null stand-in, so the preview cannot touch
//! live state.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::agent::Agent;
use super::ball::BallPool;
use super::enemy::{EnemyRoster, FrozenRoster};
use super::feedback::NullFeedback;
use super::hold::ball_in_range;
use super::kick::kick_velocity;
use super::projectile::{BallEvent, update_ball};
use super::rope::NullRopes;
use super::tick::Collaborators;
use super::world::WorldQuery;
use crate::settings::AgentSettings;

/// Recorded positions per preview
pub const PREDICTION_STEPS: usize = 200;
/// Synthetic step size, independent of the live clock
pub const PREDICTION_DT: f32 = 0.02;

/// A predicted shot path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Ball position before each step
    pub points: Vec<Vec3>,
    /// Where the path touches enemies
    pub enemy_hits: Vec<Vec3>,
}

/// Predict where a kick from the agent's current aim would go.
///
/// The scratch ball starts at a settled ball in kick range if there is one,
/// otherwise at the hold point, and leaves at kick velocity with `aim_spin`.
pub fn predict(
    pool: &mut BallPool,
    agent: &Agent,
    aim_spin: Vec3,
    settings: &AgentSettings,
    world: &dyn WorldQuery,
    enemies: &dyn EnemyRoster,
) -> Trajectory {
    let start = ball_in_range(pool, agent, settings, 1.0)
        .and_then(|h| pool.get(h))
        .map(|b| b.position)
        .unwrap_or_else(|| agent.hold_point());

    let mut frozen = FrozenRoster(enemies);
    let mut ropes = NullRopes;
    let mut feedback = NullFeedback;
    let mut collab = Collaborators {
        world,
        enemies: &mut frozen,
        ropes: &mut ropes,
        feedback: &mut feedback,
    };

    let mut trajectory = Trajectory {
        points: Vec::with_capacity(PREDICTION_STEPS),
        enemy_hits: Vec::new(),
    };

    let ball = pool.take_scratch(start, world);
    ball.kick(kick_velocity(agent, settings), aim_spin);

    for _ in 0..PREDICTION_STEPS {
        trajectory.points.push(ball.position);
        for event in update_ball(ball, PREDICTION_DT, settings, agent.position, &mut collab) {
            if let BallEvent::EnemyHit { point, .. } = event {
                trajectory.enemy_hits.push(point);
            }
        }
    }

    pool.release_scratch();
    trajectory
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::enemy::EnemyCategory;
    use crate::sim::scene::Arena;

    fn setup() -> (Arena, Agent, BallPool, AgentSettings) {
        let settings = AgentSettings::for_class(crate::AgentClass::Attacker);
        let agent = Agent::new(&settings, Vec3::new(0.0, 1.5, 0.0));
        let mut arena = Arena::walled_floor(60.0);
        arena.add_enemy(Vec3::new(0.0, 2.0, 30.0), 2.0, EnemyCategory::Dummy);
        arena.add_rope_node(Vec3::new(0.0, 2.0, 5.0), 0.5);
        (arena, agent, BallPool::new(), settings)
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let (arena, agent, mut pool, settings) = setup();
        let spin = Vec3::new(5.0, -3.0, 0.0);
        let a = predict(&mut pool, &agent, spin, &settings, &arena.scene, &arena.enemies);
        let b = predict(&mut pool, &agent, spin, &settings, &arena.scene, &arena.enemies);
        assert_eq!(a.points.len(), PREDICTION_STEPS);
        assert_eq!(a, b);
    }

    #[test]
    fn test_prediction_has_no_side_effects() {
        let (arena, agent, mut pool, settings) = setup();
        let live = pool.spawn(Vec3::new(20.0, 5.0, 0.0), &arena.scene);
        let pool_before = pool.clone();
        let enemies_before = serde_json::to_string(&arena.enemies).unwrap();

        let trajectory = predict(&mut pool, &agent, Vec3::ZERO, &settings, &arena.scene, &arena.enemies);

        // The straight shot reaches the dummy
        assert!(!trajectory.enemy_hits.is_empty());
        assert_eq!(pool.capacity(), pool_before.capacity());
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.get(live), pool_before.get(live));
        assert_eq!(serde_json::to_string(&arena.enemies).unwrap(), enemies_before);
        assert!(arena.feedback.calls.is_empty());
        assert!(arena.ropes.node_impulses.is_empty());
    }

    #[test]
    fn test_prediction_starts_at_hold_point() {
        let (arena, agent, mut pool, settings) = setup();
        let trajectory = predict(&mut pool, &agent, Vec3::ZERO, &settings, &arena.scene, &arena.enemies);
        assert!((trajectory.points[0] - agent.hold_point()).length() < 1e-4);
        assert!(trajectory.points[1].z > trajectory.points[0].z);
    }
}
