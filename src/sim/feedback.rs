//! Presentation feedback hooks
//!
//! Camera shake, hit-stop, particles and the win slow-down are
//! fire-and-forget. Every method defaults to a no-op so hosts implement only
//! what they render.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Camera shake flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShakeKind {
    /// Short punch (kicks, hits)
    Base,
    /// Slow roll (landing, jumps)
    Long,
    /// Jitter (hard turns at speed)
    Rapid,
}

/// Particle effects the core asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleEffect {
    KickHit,
    BallHit,
    Win,
}

pub trait Feedback {
    fn shake(&mut self, kind: ShakeKind, amount: f32) {
        let _ = (kind, amount);
    }

    fn add_hit_stop(&mut self, seconds: f32) {
        let _ = seconds;
    }

    fn spawn_particles(&mut self, effect: ParticleEffect, at: Vec3) {
        let _ = (effect, at);
    }

    /// Game won: ease time to a stop
    fn slow_to_zero(&mut self) {}
}

/// Feedback sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFeedback;

impl Feedback for NullFeedback {}

/// A recorded feedback call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FeedbackCall {
    Shake(ShakeKind, f32),
    HitStop(f32),
    Particles(ParticleEffect, Vec3),
    SlowToZero,
}

/// Feedback sink that records every call (tests, headless runs)
#[derive(Debug, Default, Clone)]
pub struct FeedbackLog {
    pub calls: Vec<FeedbackCall>,
}

impl FeedbackLog {
    pub fn count(&self, pred: impl Fn(&FeedbackCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl Feedback for FeedbackLog {
    fn shake(&mut self, kind: ShakeKind, amount: f32) {
        self.calls.push(FeedbackCall::Shake(kind, amount));
    }

    fn add_hit_stop(&mut self, seconds: f32) {
        self.calls.push(FeedbackCall::HitStop(seconds));
    }

    fn spawn_particles(&mut self, effect: ParticleEffect, at: Vec3) {
        self.calls.push(FeedbackCall::Particles(effect, at));
    }

    fn slow_to_zero(&mut self) {
        self.calls.push(FeedbackCall::SlowToZero);
    }
}
