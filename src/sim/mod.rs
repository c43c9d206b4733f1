//! Deterministic simulation module
//!
//! All movement and ball physics lives here. This module must be pure and
//! deterministic:
//! - Fixed timestep only
//! - Stable iteration order (ball pool order)
//! - Host state reached only through the collaborator traits
//! - No rendering or platform dependencies

pub mod agent;
pub mod ball;
pub mod clock;
pub mod collision;
pub mod enemy;
pub mod feedback;
pub mod grapple;
pub mod hold;
pub mod kick;
pub mod projectile;
pub mod rope;
pub mod scene;
pub mod sdf;
pub mod state;
pub mod tick;
pub mod trajectory;
pub mod world;

pub use agent::{Agent, Aim};
pub use ball::{Ball, BallHandle, BallPool};
pub use clock::{SimClock, Tick};
pub use collision::{Resolution, Volume, resolve_contacts, sweep_sphere};
pub use enemy::{BallOutcome, EnemyCategory, EnemyRoster, HitPolicy};
pub use feedback::{Feedback, FeedbackLog, NullFeedback, ParticleEffect, ShakeKind};
pub use grapple::{Grapple, GrappleEvent, GrapplePhase};
pub use projectile::{BallEvent, update_ball};
pub use rope::{NullRopes, RopeField, RopeId};
pub use scene::{Arena, Scene, SceneError};
pub use sdf::{Shape, raymarch_collision};
pub use state::{SimEvent, Simulation};
pub use tick::{Buttons, Collaborators, TickInput, tick};
pub use trajectory::{PREDICTION_DT, PREDICTION_STEPS, Trajectory, predict};
pub use world::{EnemyId, HitTarget, Layers, ProjectileId, WorldQuery};
