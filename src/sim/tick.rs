//! Fixed timestep simulation tick
//!
//! Advances one session by one clock tick. Order within a tick is fixed:
//! locomotion, agent collisions, holding and shooting, balls in pool order,
//! kick, bullet time, grapple.

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::agent::{Aim, wish_direction};
use super::clock::Tick;
use super::enemy::EnemyRoster;
use super::feedback::Feedback;
use super::grapple::update_grapple;
use super::hold::{HoldChange, update_hold};
use super::kick::{KickHit, try_shoot, update_aim_spin, update_kick};
use super::projectile::{BallEvent, update_ball};
use super::rope::RopeField;
use super::state::{SimEvent, Simulation};
use super::world::WorldQuery;
use crate::consts::BULLET_TIME_SCALE;

bitflags! {
    /// Digital inputs
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Buttons: u32 {
        const JUMP = 1 << 0;
        const SPRINT = 1 << 1;
        const BULLET_TIME = 1 << 2;
        const KICK = 1 << 3;
        const AIM = 1 << 4;
        const CAST = 1 << 5;
        /// Debug run-rate toggle
        const PAUSE = 1 << 6;
    }
}

/// Input snapshot for a single tick (deterministic)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickInput {
    /// Buttons currently down
    pub held: Buttons,
    /// Buttons that went down since the last frame
    pub pressed: Buttons,
    /// Buttons that went up since the last frame
    pub released: Buttons,
    /// Movement axes: x strafes right, y moves forward
    pub move_axes: Vec2,
    /// Absolute facing, if the host changed it
    pub aim: Option<Aim>,
    /// Raw look delta this frame (steers aim spin)
    pub look_delta: Vec2,
}

impl TickInput {
    /// Drop the one-shot parts so later ticks of the same frame do not
    /// replay them
    pub fn clear_edges(&mut self) {
        self.pressed = Buttons::empty();
        self.released = Buttons::empty();
        self.look_delta = Vec2::ZERO;
    }
}

/// Host capabilities borrowed for one core call
pub struct Collaborators<'a> {
    pub world: &'a dyn WorldQuery,
    pub enemies: &'a mut dyn EnemyRoster,
    pub ropes: &'a mut dyn RopeField,
    pub feedback: &'a mut dyn Feedback,
}

/// Advance the session by one tick
pub fn tick(sim: &mut Simulation, step: Tick, input: &TickInput, collab: &mut Collaborators<'_>) -> Vec<SimEvent> {
    let mut events = Vec::new();
    if sim.won {
        return events;
    }

    let Tick { dt, unscaled_dt } = step;
    let settings = &sim.settings;
    let agent = &mut sim.agent;
    sim.time_ticks += 1;

    // Locomotion
    if let Some(aim) = input.aim {
        agent.aim = aim;
    }
    let wish = wish_direction(&agent.aim, input.move_axes);

    if agent.grounded {
        agent.time_since_grounded = 0.0;
        agent.ground_move(settings, wish, dt, collab.feedback);
        if agent.jump_buffer > 0.0 {
            let impulse = agent.jump(settings, wish, collab.feedback);
            events.push(SimEvent::Jumped { impulse });
        }
    } else {
        agent.time_since_grounded += dt;
        agent.air_move(settings, wish, dt);
    }

    agent.apply_gravity(settings, dt);

    if let Some(impulse) = agent.stamina_abilities(settings, input, wish, dt, unscaled_dt, collab.feedback) {
        events.push(SimEvent::Jumped { impulse });
    }
    agent.rope_swing(input, collab.world, collab.ropes, dt);

    if let Some(speed) = agent.resolve_collisions(collab.world, collab.feedback) {
        events.push(SimEvent::Landed { speed });
    }
    if agent.integrate(dt) {
        events.push(SimEvent::AgentRespawned);
    }

    // Ammo, spin and holding
    if sim.ammo.update(settings, dt) {
        events.push(SimEvent::BallReloaded { count: sim.ammo.count });
    }
    update_aim_spin(&mut sim.aim_spin, settings, input, unscaled_dt);

    match update_hold(&mut sim.hold, agent, &mut sim.pool, settings, input, collab.world, dt) {
        Some(HoldChange::Caught(handle)) => events.push(SimEvent::BallCaught(handle)),
        Some(HoldChange::Released(handle)) => events.push(SimEvent::BallReleased(handle)),
        None => {}
    }

    if let Some(handle) = try_shoot(
        &mut sim.ammo,
        agent,
        &mut sim.pool,
        settings,
        input,
        sim.aim_spin,
        collab.world,
    ) {
        events.push(SimEvent::BallShot(handle));
    }

    // Balls
    let agent_position = agent.position;
    for handle in sim.pool.handles() {
        let Some(ball) = sim.pool.get_mut(handle) else {
            continue;
        };
        for event in update_ball(ball, dt, settings, agent_position, collab) {
            if let BallEvent::Won { at } = event {
                sim.won = true;
                log::info!("Won at {:?} after {} ticks", at, sim.time_ticks);
                events.push(SimEvent::Won);
            }
            events.push(SimEvent::Ball(handle, event));
        }
        if sim.won {
            return events;
        }
    }

    // Kick
    for hit in update_kick(
        &mut sim.kick,
        &mut sim.hold,
        agent,
        &mut sim.pool,
        settings,
        input,
        sim.aim_spin,
        dt,
        collab,
    ) {
        match hit {
            KickHit::Ball(handle) => events.push(SimEvent::BallKicked(handle)),
            KickHit::Enemy(id) => events.push(SimEvent::EnemyKicked(id)),
            KickHit::Won { .. } => {
                sim.won = true;
                events.push(SimEvent::Won);
            }
        }
    }
    if sim.won {
        return events;
    }

    // Bullet time feeds the next frame's clock
    if input.held.contains(Buttons::BULLET_TIME) && agent.stamina > 0.0 {
        sim.time_scale = BULLET_TIME_SCALE;
        agent.stamina =
            (agent.stamina - unscaled_dt * settings.bullet_time_stamina_drain).clamp(0.0, settings.max_stamina);
    } else {
        sim.time_scale = 1.0;
    }

    // Grapple
    for event in update_grapple(
        &mut sim.grapple,
        &mut sim.hold,
        agent,
        &mut sim.pool,
        settings,
        input,
        dt,
        collab,
    ) {
        events.push(SimEvent::Grapple(event));
    }

    events
}
