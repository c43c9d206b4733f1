//! Fixed-step simulation clock
//!
//! Turns variable frame times into a run of fixed-size ticks, carrying the
//! unconsumed remainder into the next frame.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_TICKS_PER_FRAME, MIN_TICK};

/// One simulation step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Simulation time covered by this tick (slow motion already applied)
    pub dt: f32,
    /// Real frame time scaled only by the run rate. Handed to the first tick
    /// of a frame and zero for the rest, so per-frame sums match real time.
    pub unscaled_dt: f32,
}

/// Accumulator that slices frame time into ticks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    /// Global run rate; <= 0 freezes the simulation
    pub run_rate: f32,
    remainder: f32,
    min_tick: f32,
    max_ticks: u32,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self::with_limits(MIN_TICK, MAX_TICKS_PER_FRAME)
    }

    pub fn with_limits(min_tick: f32, max_ticks: u32) -> Self {
        Self {
            run_rate: 1.0,
            remainder: 0.0,
            min_tick,
            max_ticks: max_ticks.max(1),
        }
    }

    /// Time carried into the next frame
    pub fn remainder(&self) -> f32 {
        self.remainder
    }

    pub fn is_frozen(&self) -> bool {
        self.run_rate <= 0.0
    }

    /// Debug pause: flip the run rate between 0 and 1
    pub fn toggle_pause(&mut self) {
        self.run_rate = if self.run_rate < 1.0 { 1.0 } else { 0.0 };
        log::info!("Run rate set to {}", self.run_rate);
    }

    /// Slice one frame into ticks.
    ///
    /// `real_dt` is wall-clock frame time, `time_scale` the engine slow-motion
    /// multiplier (bullet time). Emits nothing while frozen.
    pub fn advance(&mut self, real_dt: f32, time_scale: f32) -> Vec<Tick> {
        if self.is_frozen() {
            return Vec::new();
        }

        let real_dt = real_dt.max(0.0);
        let scaled = real_dt * time_scale.max(0.0) * self.run_rate;
        let mut unscaled = real_dt * self.run_rate;

        let mut accumulated = scaled + self.remainder;
        self.remainder = 0.0;

        let mut ticks = Vec::new();
        if accumulated > self.min_tick {
            while accumulated > self.min_tick {
                if ticks.len() as u32 >= self.max_ticks {
                    log::trace!("Tick budget hit, deferring {accumulated:.4}s");
                    break;
                }
                ticks.push(Tick {
                    dt: self.min_tick,
                    unscaled_dt: unscaled,
                });
                unscaled = 0.0;
                accumulated -= self.min_tick;
            }
            self.remainder = accumulated;
        } else if accumulated > 0.0 {
            // Low-rate frame: one short tick rather than starving it
            ticks.push(Tick {
                dt: accumulated,
                unscaled_dt: unscaled,
            });
        }

        ticks
    }
}
