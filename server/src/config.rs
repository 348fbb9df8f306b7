//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use crate::spawn::SpawnGroupConfig;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to configuration file",
        default_value = "server/config.yaml"
    )]
    pub config_file: String,

    #[arg(
        short = 'e',
        long = "env",
        help = "Path to environment file",
        default_value = "server/.env"
    )]
    pub env_file: Option<String>,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            env_file: Some(".env".to_string()),
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be opened.
    #[error("Failed to open config file: {0}")]
    Open(#[from] std::io::Error),

    /// The configuration file is not valid YAML for this schema.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub ai: AiConfig,
    pub persistence: PersistenceConfig,
    pub demo: DemoConfig,
}

impl Configuration {
    pub fn load(path: &str) -> Result<Configuration, ConfigError> {
        let conf: Configuration = serde_yaml::from_reader(std::fs::File::open(path)?)?;
        conf.validate()?;
        Ok(conf)
    }

    /// Reject values that would break scheduling or search guarantees
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ai = &self.ai;
        if ai.tick_ms == 0 {
            return Err(ConfigError::Invalid("ai.tick_ms must be positive".into()));
        }
        if ai.pathfinder.step <= 0.0 {
            return Err(ConfigError::Invalid("ai.pathfinder.step must be positive".into()));
        }
        if ai.pathfinder.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "ai.pathfinder.max_iterations must be positive".into(),
            ));
        }
        if ai.behavior.explore_radius_min > ai.behavior.explore_radius_max {
            return Err(ConfigError::Invalid(
                "ai.behavior.explore_radius_min exceeds explore_radius_max".into(),
            ));
        }
        if ai.acquisition.contest_cap == 0 {
            return Err(ConfigError::Invalid(
                "ai.acquisition.contest_cap must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Tuning for the decision core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Base scheduler tick in milliseconds
    pub tick_ms: u64,
    pub think: ThinkIntervals,
    pub acquisition: AcquisitionConfig,
    pub behavior: BehaviorConfig,
    pub combat: CombatConfig,
    pub pathfinder: PathfinderConfig,
    /// Lowest and highest level an agent may be created at
    pub min_level: u32,
    pub max_level: u32,
}

impl AiConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            tick_ms: 500,
            think: ThinkIntervals::default(),
            acquisition: AcquisitionConfig::default(),
            behavior: BehaviorConfig::default(),
            combat: CombatConfig::default(),
            pathfinder: PathfinderConfig::default(),
            min_level: 1,
            max_level: 85,
        }
    }
}

/// Minimum time between think cycles, by activity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinkIntervals {
    pub moving_ms: u64,
    pub combat_ms: u64,
    pub idle_ms: u64,
}

impl ThinkIntervals {
    pub fn moving(&self) -> Duration {
        Duration::from_millis(self.moving_ms)
    }

    pub fn combat(&self) -> Duration {
        Duration::from_millis(self.combat_ms)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }
}

impl Default for ThinkIntervals {
    fn default() -> Self {
        Self {
            moving_ms: 5000,
            combat_ms: 800,
            idle_ms: 2500,
        }
    }
}

/// How the acquisition step ranks candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionMode {
    /// Distance weighted by wounds and contention, lowest wins
    #[default]
    Nearest,
    /// Weighted multi-criteria score from the target selector, highest wins
    Scored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub radius: f64,
    /// Attackers at or above this count make a target contested
    pub contest_cap: usize,
    pub exclusion_window_secs: u64,
    pub mode: AcquisitionMode,
    /// Only consider monsters whose name contains this text (case-insensitive)
    pub name_filter: Option<String>,
    /// Relative jitter applied by the scored selector
    pub jitter: f64,
}

impl AcquisitionConfig {
    pub fn exclusion_window(&self) -> Duration {
        Duration::from_secs(self.exclusion_window_secs)
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            radius: 1000.0,
            contest_cap: 2,
            exclusion_window_secs: 45,
            mode: AcquisitionMode::Nearest,
            name_filter: None,
            jitter: 0.1,
        }
    }
}

/// Thresholds driving state transitions and per-state actions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub leash_radius: f64,
    /// Finish targets below this health fraction before re-evaluating
    pub finish_health: f64,
    pub flee_health: f64,
    pub flee_aggression: u8,
    pub outnumbered_radius: f64,
    /// Flee when more than this many hostiles target the agent
    pub outnumbered_count: usize,
    pub outnumbered_aggression: u8,
    pub explore_dwell_secs: u64,
    pub explore_radius_min: f64,
    pub explore_radius_max: f64,
    pub explore_steps: usize,
    pub explore_fallback_attempts: usize,
    pub destination_reach: f64,
    pub destination_timeout_secs: u64,
    pub flee_distance: f64,
    /// An in-flight move is kept if its destination is within this distance of the new one
    pub move_refresh_distance: f64,
    pub stuck_threshold: f64,
    pub stuck_limit: u32,
    pub idle_action_chance: f64,
    pub stand_up_secs: u64,
    pub mob_scan_interval_secs: u64,
    pub death_despawn_secs: u64,
    pub auto_farm_radius: f64,
}

impl BehaviorConfig {
    pub fn explore_dwell(&self) -> Duration {
        Duration::from_secs(self.explore_dwell_secs)
    }

    pub fn destination_timeout(&self) -> Duration {
        Duration::from_secs(self.destination_timeout_secs)
    }

    pub fn stand_up_delay(&self) -> Duration {
        Duration::from_secs(self.stand_up_secs)
    }

    pub fn mob_scan_interval(&self) -> Duration {
        Duration::from_secs(self.mob_scan_interval_secs)
    }

    pub fn death_despawn_delay(&self) -> Duration {
        Duration::from_secs(self.death_despawn_secs)
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            leash_radius: 1500.0,
            finish_health: 0.25,
            flee_health: 0.30,
            flee_aggression: 40,
            outnumbered_radius: 200.0,
            outnumbered_count: 2,
            outnumbered_aggression: 60,
            explore_dwell_secs: 30,
            explore_radius_min: 300.0,
            explore_radius_max: 800.0,
            explore_steps: 5,
            explore_fallback_attempts: 10,
            destination_reach: 100.0,
            destination_timeout_secs: 30,
            flee_distance: 500.0,
            move_refresh_distance: 200.0,
            stuck_threshold: 50.0,
            stuck_limit: 5,
            idle_action_chance: 0.02,
            stand_up_secs: 10,
            mob_scan_interval_secs: 10,
            death_despawn_secs: 5,
            auto_farm_radius: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub caster_range: f64,
    /// The ranged damage ability casters use exclusively
    pub caster_ability: u32,
    /// Mana below which casters are topped up before casting
    pub mana_floor: f64,
    pub mana_restore: f64,
    /// Approach to this fraction of effective range
    pub approach_fraction: f64,
    /// Choose a tactical profile per engagement instead of the base policy
    pub use_tactics: bool,
    /// Ruleset switch: real players may be targeted inside PvP zones
    pub allow_player_targets: bool,
    pub aggressive_approach: f64,
    pub defensive_retreat: f64,
    pub kiting_retreat: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            caster_range: 600.0,
            caster_ability: 1177,
            mana_floor: 50.0,
            mana_restore: 999_999.0,
            approach_fraction: 0.8,
            use_tactics: false,
            allow_player_targets: false,
            aggressive_approach: 40.0,
            defensive_retreat: 150.0,
            kiting_retreat: 80.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    /// Lattice spacing of the grid search
    pub step: f64,
    /// Hard cap on node expansions per search
    pub max_iterations: usize,
    pub goal_tolerance: f64,
    /// Probe distance used when detouring around a blocked segment
    pub detour_distance: f64,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            step: 100.0,
            max_iterations: 100,
            goal_tolerance: 100.0,
            detour_distance: 150.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// JSON-lines journal for spawn, despawn and death records. Empty disables it.
    pub journal_path: EnvField<String>,
}

/// Simulated world used by the standalone binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Half-width of the square world
    pub world_extent: f64,
    pub monsters: usize,
    /// Simulation step in milliseconds
    pub step_ms: u64,
    pub groups: Vec<SpawnGroupConfig>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            world_extent: 3000.0,
            monsters: 60,
            step_ms: 100,
            groups: vec![SpawnGroupConfig {
                group: "human_warriors".to_string(),
                count: 3,
            }],
        }
    }
}
