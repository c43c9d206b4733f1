//! Kickball - headless runner
//!
//! Drives the simulation core through a demo arena with scripted input and
//! jittered frame times, logging a summary every simulated second.
//!
//! Usage: `kickball [ticks] [class] [settings.json] [scene.json]`

use std::error::Error;
use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use kickball::sim::{Aim, Arena, BallEvent, Buttons, GrappleEvent, Scene, SimEvent, Simulation, TickInput};
use kickball::{AgentClass, AgentSettings};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

const DEFAULT_TICKS: u64 = 120 * 20;
const SPAWN_POINT: Vec3 = Vec3::new(0.0, 1.5, 0.0);
const TICKS_PER_SECOND: u64 = 120;
/// Length of one pass through the input script, in seconds
const SCRIPT_PERIOD: f32 = 8.0;

/// Counters reported at the end of a run
#[derive(Debug, Default, Serialize)]
struct RunStats {
    frames: u64,
    ticks: u64,
    jumps: u32,
    landings: u32,
    respawns: u32,
    shots: u32,
    kicks: u32,
    enemy_kicks: u32,
    enemy_hits: u32,
    catches: u32,
    grapple_casts: u32,
    won: bool,
}

impl RunStats {
    fn record(&mut self, event: &SimEvent) {
        match event {
            SimEvent::Jumped { .. } => self.jumps += 1,
            SimEvent::Landed { .. } => self.landings += 1,
            SimEvent::AgentRespawned => self.respawns += 1,
            SimEvent::BallShot(_) => self.shots += 1,
            SimEvent::BallKicked(_) => self.kicks += 1,
            SimEvent::EnemyKicked(_) => self.enemy_kicks += 1,
            SimEvent::Ball(_, BallEvent::EnemyHit { .. }) => self.enemy_hits += 1,
            SimEvent::BallCaught(_) => self.catches += 1,
            SimEvent::Grapple(GrappleEvent::Cast { .. }) => self.grapple_casts += 1,
            SimEvent::Won => self.won = true,
            _ => {}
        }
    }
}

/// Buttons held at script time `t`
fn script_buttons(t: f32) -> Buttons {
    match t % SCRIPT_PERIOD {
        t if t < 1.5 => Buttons::SPRINT,
        t if t < 2.5 => Buttons::JUMP,
        t if t < 3.5 => Buttons::AIM,
        t if t < 3.6 => Buttons::AIM | Buttons::KICK,
        t if t < 4.5 => Buttons::empty(),
        t if t < 4.6 => Buttons::CAST,
        t if t < 5.5 => Buttons::BULLET_TIME,
        t if t < 5.6 => Buttons::KICK,
        _ => Buttons::empty(),
    }
}

/// Scripted input: circle the arena while cycling through every ability
fn scripted_input(t: f32, previous: Buttons) -> TickInput {
    let held = script_buttons(t);
    let yaw = (t / SCRIPT_PERIOD) * TAU * 0.25;
    TickInput {
        held,
        pressed: held - previous,
        released: previous - held,
        move_axes: Vec2::new(0.3, 1.0),
        aim: Some(Aim { yaw, pitch: -0.05 }),
        look_delta: Vec2::new(0.5 * (t * 3.0).sin(), 0.2),
    }
}

fn load_settings(class: AgentClass, path: Option<&str>) -> Result<AgentSettings, Box<dyn Error>> {
    match path {
        Some(path) => Ok(AgentSettings::load(path)?),
        None => Ok(AgentSettings::for_class(class)),
    }
}

fn run() -> Result<RunStats, Box<dyn Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let ticks = match args.first() {
        Some(arg) => arg.parse::<u64>()?,
        None => DEFAULT_TICKS,
    };
    let class = match args.get(1) {
        Some(arg) => AgentClass::from_str(arg).ok_or_else(|| format!("unknown agent class '{arg}'"))?,
        None => AgentClass::default(),
    };
    let settings = load_settings(class, args.get(2).map(String::as_str))?;
    let mut arena = match args.get(3) {
        Some(path) => Arena::new(Scene::load(path)?),
        None => Arena::demo(),
    };

    log::info!("Running {} ticks as {}", ticks, class.as_str());
    let mut sim = Simulation::new(settings, SPAWN_POINT);
    let mut rng = Pcg32::seed_from_u64(0x6b69_636b);
    let mut stats = RunStats::default();
    let mut previous = Buttons::empty();
    let mut elapsed = 0.0_f32;
    let mut next_report = TICKS_PER_SECOND;

    while sim.time_ticks < ticks && !sim.won {
        // Somewhere between 50 and 144 fps
        let real_dt = rng.random_range(1.0 / 144.0..1.0 / 50.0);
        elapsed += real_dt;

        let input = scripted_input(elapsed, previous);
        previous = input.held;

        let events = sim.advance_frame(real_dt, &input, &mut arena.collaborators());
        arena.update(real_dt * sim.time_scale);
        stats.frames += 1;
        for event in &events {
            log::trace!("{:?}", event);
            stats.record(event);
        }

        if sim.time_ticks >= next_report {
            next_report += TICKS_PER_SECOND;
            log::info!(
                "t={:>3}s pos=({:.1}, {:.1}, {:.1}) speed={:.1} stamina={:.0} balls={} ammo={} grapple={:?}",
                sim.time_ticks / TICKS_PER_SECOND,
                sim.agent.position.x,
                sim.agent.position.y,
                sim.agent.position.z,
                sim.agent.horizontal_speed(),
                sim.agent.stamina,
                sim.pool.active_count(),
                sim.ammo.count,
                sim.grapple.phase,
            );
        }
    }

    stats.ticks = sim.time_ticks;
    Ok(stats)
}

fn main() {
    env_logger::init();
    log::info!("Kickball (headless) starting...");

    match run() {
        Ok(stats) => match serde_json::to_string_pretty(&stats) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("Failed to encode run summary: {e}"),
        },
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_edges() {
        let input = scripted_input(1.6, Buttons::SPRINT);
        assert_eq!(input.held, Buttons::JUMP);
        assert_eq!(input.pressed, Buttons::JUMP);
        assert_eq!(input.released, Buttons::SPRINT);
    }

    #[test]
    fn test_script_wraps() {
        assert_eq!(script_buttons(0.5), script_buttons(0.5 + SCRIPT_PERIOD));
    }
}
