//! Agent tuning profiles
//!
//! One profile is selected per session from the agent class and never
//! mutated afterwards. Profiles can also be loaded from JSON; missing fields
//! fall back to the balanced defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Agent class presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AgentClass {
    Attacker,
    #[default]
    Balanced,
}

impl AgentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentClass::Attacker => "Attacker",
            AgentClass::Balanced => "Balanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "attacker" | "atk" => Some(AgentClass::Attacker),
            "balanced" | "bal" => Some(AgentClass::Balanced),
            _ => None,
        }
    }
}

/// Errors from loading a settings profile
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// All tuning constants for one agent class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    // === Movement ===
    pub base_speed: f32,
    pub sprint_speed: f32,
    pub sprint_stamina_drain: f32,
    pub ground_acceleration: f32,
    pub ground_deceleration: f32,
    pub air_acceleration: f32,
    pub air_deceleration: f32,
    pub friction: f32,
    pub gravity: f32,

    // === Jump ===
    pub min_jump_force: f32,
    pub max_jump_force: f32,
    /// Seconds of unscaled time to charge from 0 to a full jump
    pub time_to_charge_max_jump: f32,
    pub jump_charge_stamina_drain: f32,
    pub jump_forward_boost: f32,
    pub coyote_time: f32,
    pub jump_buffer_time: f32,

    // === Stamina ===
    pub max_stamina: f32,
    pub stamina_recovery_rate: f32,
    pub bullet_time_stamina_drain: f32,

    // === Ammo ===
    pub ball_reload_time: f32,
    pub max_ball_count: u32,
    pub shoot_cooldown: f32,

    // === Hook ===
    pub hook_pull_delay: f32,
    pub hook_pull_power: f32,
    pub hook_up_power: f32,
    pub ball_detect_radius: f32,

    // === Kick ===
    pub kick_hit_box_length: f32,
    pub kick_hit_box_width: f32,
    pub kick_duration: f32,
    pub kick_cooldown: f32,
    pub kick_power: f32,

    // === Balls ===
    /// Enables aim spin and trajectory preview
    pub have_scope: bool,
    pub max_ball_speed: f32,
    pub ball_gravity: f32,
    pub angular_velocity_power: f32,
    pub angular_velocity_sense: f32,
    pub max_angular_velocity: f32,
    pub angular_velocity_decrease_rate: f32,
    pub find_enemies_radius: f32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            base_speed: 20.0,
            sprint_speed: 40.0,
            sprint_stamina_drain: 10.0,
            ground_acceleration: 15.0,
            ground_deceleration: 5.0,
            air_acceleration: 2.0,
            air_deceleration: 5.0,
            friction: 50.0,
            gravity: 40.0,

            min_jump_force: 20.0,
            max_jump_force: 140.0,
            time_to_charge_max_jump: 3.0,
            jump_charge_stamina_drain: 30.0,
            jump_forward_boost: 10.0,
            coyote_time: 0.2,
            jump_buffer_time: 0.3,

            max_stamina: 100.0,
            stamina_recovery_rate: 5.0,
            bullet_time_stamina_drain: 10.0,

            ball_reload_time: 5.0,
            max_ball_count: 3,
            shoot_cooldown: 0.05,

            hook_pull_delay: 0.4,
            hook_pull_power: 40.0,
            hook_up_power: 20.0,
            ball_detect_radius: 7.0,

            kick_hit_box_length: 5.0,
            kick_hit_box_width: 5.0,
            kick_duration: 0.2,
            kick_cooldown: 0.3,
            kick_power: 100.0,

            have_scope: false,
            max_ball_speed: 50.0,
            ball_gravity: 25.0,
            angular_velocity_power: 2.0,
            angular_velocity_sense: 2.0,
            max_angular_velocity: 100.0,
            angular_velocity_decrease_rate: 1.0,
            find_enemies_radius: 100.0,
        }
    }
}

impl AgentSettings {
    /// Built-in profile for an agent class
    pub fn for_class(class: AgentClass) -> Self {
        match class {
            AgentClass::Balanced => Self::default(),
            // Attackers trade stamina for a harder kick and get the scope
            AgentClass::Attacker => Self {
                sprint_speed: 45.0,
                max_stamina: 80.0,
                kick_power: 140.0,
                max_ball_speed: 60.0,
                have_scope: true,
                ..Self::default()
            },
        }
    }

    /// Parse a (possibly partial) JSON profile and validate it
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load a JSON profile from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings profile from {}", path.display());
        Ok(settings)
    }

    /// Reject profiles that would break the simulation's invariants
    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            ("time_to_charge_max_jump", self.time_to_charge_max_jump),
            ("hook_pull_delay", self.hook_pull_delay),
            ("kick_duration", self.kick_duration),
            ("base_speed", self.base_speed),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(SettingsError::Invalid {
                    field,
                    reason: "must be greater than zero",
                });
            }
        }
        if self.min_jump_force > self.max_jump_force {
            return Err(SettingsError::Invalid {
                field: "min_jump_force",
                reason: "must not exceed max_jump_force",
            });
        }
        if self.max_stamina < 0.0 {
            return Err(SettingsError::Invalid {
                field: "max_stamina",
                reason: "must not be negative",
            });
        }
        Ok(())
    }
}
