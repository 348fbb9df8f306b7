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

//! Priority-ordered state transitions
//!
//! The transition chain is a pure function over a snapshot of the facts a
//! think cycle gathered, so it can be tested without a world. Side effects
//! belong to the per-state actions in [`crate::ai::behavior`].

use crate::config::BehaviorConfig;
use autobot_common::AgentState;
use std::time::Duration;

/// Facts about the current target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetFacts {
    pub alive: bool,
    pub attackable: bool,
    pub health: f64,
}

impl TargetFacts {
    pub fn engageable(&self) -> bool {
        self.alive && self.attackable
    }
}

/// Everything the transition chain looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionInput {
    pub target: Option<TargetFacts>,
    /// Agent health fraction
    pub health: f64,
    pub aggression: u8,
    /// Living entities near the agent that have it targeted
    pub hostiles_targeting: usize,
    pub distance_from_home: f64,
    pub in_safe_zone: bool,
    pub auto_farm: bool,
    pub socialize: bool,
    /// Roll in `0..100` made by the caller
    pub explore_roll: u32,
    /// Percent chance from personality
    pub explore_chance: u32,
    pub since_state_change: Duration,
}

/// Evaluate the transition chain once.
///
/// A combat round against a target below the finishing threshold is never
/// interrupted, even if the target just died; the combat action handles the
/// kill and chains into the next target.
pub fn next_state(current: AgentState, input: &TransitionInput, config: &BehaviorConfig) -> AgentState {
    if current == AgentState::Combat {
        if let Some(target) = input.target {
            if target.health < config.finish_health {
                return AgentState::Combat;
            }
        }
    }

    if input.target.is_some_and(|t| t.engageable()) {
        AgentState::Combat
    } else if should_flee(input, config) {
        AgentState::Fleeing
    } else if input.distance_from_home > config.leash_radius {
        AgentState::ReturningHome
    } else if input.auto_farm && !input.in_safe_zone {
        AgentState::Farming
    } else if input.socialize {
        AgentState::Socializing
    } else if input.explore_roll < input.explore_chance
        && input.since_state_change > config.explore_dwell()
    {
        AgentState::Exploring
    } else if !input.in_safe_zone {
        AgentState::Farming
    } else {
        AgentState::Idle
    }
}

fn should_flee(input: &TransitionInput, config: &BehaviorConfig) -> bool {
    let hurt = input.health < config.flee_health && input.aggression < config.flee_aggression;
    let outnumbered = input.hostiles_targeting > config.outnumbered_count
        && input.aggression < config.outnumbered_aggression;
    hurt || outnumbered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calm() -> TransitionInput {
        TransitionInput {
            target: None,
            health: 1.0,
            aggression: 50,
            hostiles_targeting: 0,
            distance_from_home: 0.0,
            in_safe_zone: true,
            auto_farm: false,
            socialize: false,
            explore_roll: 99,
            explore_chance: 40,
            since_state_change: Duration::ZERO,
        }
    }

    fn live_target(health: f64) -> Option<TargetFacts> {
        Some(TargetFacts {
            alive: true,
            attackable: true,
            health,
        })
    }

    #[test]
    fn test_idle_in_safe_zone() {
        let config = BehaviorConfig::default();
        assert_eq!(next_state(AgentState::Idle, &calm(), &config), AgentState::Idle);
    }

    #[test]
    fn test_never_idle_outside_safe_zone() {
        let config = BehaviorConfig::default();
        for current in [AgentState::Idle, AgentState::Exploring, AgentState::Farming] {
            for auto_farm in [false, true] {
                let input = TransitionInput {
                    in_safe_zone: false,
                    auto_farm,
                    ..calm()
                };
                assert_eq!(next_state(current, &input, &config), AgentState::Farming);
            }
        }
    }

    #[test]
    fn test_engageable_target_wins() {
        let config = BehaviorConfig::default();
        let input = TransitionInput {
            target: live_target(0.9),
            health: 0.1,
            aggression: 10,
            distance_from_home: 5000.0,
            ..calm()
        };
        assert_eq!(next_state(AgentState::Idle, &input, &config), AgentState::Combat);
    }

    #[test]
    fn test_finish_wounded_target_even_if_dead() {
        let config = BehaviorConfig::default();
        let input = TransitionInput {
            target: Some(TargetFacts {
                alive: false,
                attackable: false,
                health: 0.0,
            }),
            ..calm()
        };
        assert_eq!(next_state(AgentState::Combat, &input, &config), AgentState::Combat);
        assert_eq!(next_state(AgentState::Farming, &input, &config), AgentState::Idle);
    }

    #[test]
    fn test_flee_rules() {
        let config = BehaviorConfig::default();
        let hurt = TransitionInput {
            health: 0.2,
            aggression: 39,
            ..calm()
        };
        assert_eq!(next_state(AgentState::Idle, &hurt, &config), AgentState::Fleeing);

        let brave = TransitionInput { aggression: 40, ..hurt };
        assert_eq!(next_state(AgentState::Idle, &brave, &config), AgentState::Idle);

        let outnumbered = TransitionInput {
            hostiles_targeting: 3,
            aggression: 59,
            ..calm()
        };
        assert_eq!(next_state(AgentState::Idle, &outnumbered, &config), AgentState::Fleeing);

        let two = TransitionInput {
            hostiles_targeting: 2,
            ..outnumbered
        };
        assert_eq!(next_state(AgentState::Idle, &two, &config), AgentState::Idle);
    }

    #[test]
    fn test_leash_before_farming() {
        let config = BehaviorConfig::default();
        let input = TransitionInput {
            distance_from_home: 1501.0,
            auto_farm: true,
            in_safe_zone: false,
            ..calm()
        };
        assert_eq!(next_state(AgentState::Farming, &input, &config), AgentState::ReturningHome);
        let inside = TransitionInput {
            distance_from_home: 1500.0,
            ..input
        };
        assert_eq!(next_state(AgentState::Farming, &inside, &config), AgentState::Farming);
    }

    #[test]
    fn test_explore_needs_roll_and_dwell() {
        let config = BehaviorConfig::default();
        let lucky = TransitionInput {
            explore_roll: 10,
            ..calm()
        };
        assert_eq!(next_state(AgentState::Idle, &lucky, &config), AgentState::Idle);

        let dwelled = TransitionInput {
            since_state_change: Duration::from_secs(31),
            ..lucky
        };
        assert_eq!(next_state(AgentState::Idle, &dwelled, &config), AgentState::Exploring);

        let unlucky = TransitionInput {
            explore_roll: 40,
            ..dwelled
        };
        assert_eq!(next_state(AgentState::Idle, &unlucky, &config), AgentState::Idle);
    }

    #[test]
    fn test_default_to_farming_outside_safe_zone() {
        let config = BehaviorConfig::default();
        let input = TransitionInput {
            in_safe_zone: false,
            ..calm()
        };
        assert_eq!(next_state(AgentState::Idle, &input, &config), AgentState::Farming);
    }

    #[test]
    fn test_socialize_flag() {
        let config = BehaviorConfig::default();
        let input = TransitionInput {
            socialize: true,
            ..calm()
        };
        assert_eq!(next_state(AgentState::Idle, &input, &config), AgentState::Socializing);
    }
}
