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

//! Agent descriptors shared with administrative surfaces

use crate::entity::EntityId;
use crate::geometry::Location;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Combat capability class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    Melee,
    Caster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Race {
    Human,
    Elf,
    DarkElf,
    Orc,
    Dwarf,
}

/// Archetype plus race of an agent's character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentClass {
    pub archetype: Archetype,
    pub race: Race,
}

impl AgentClass {
    /// Create a new agent class
    pub const fn new(archetype: Archetype, race: Race) -> Self {
        Self { archetype, race }
    }

    /// Whether this class fights exclusively with its ranged spell.
    ///
    /// Orc casters are the exception and always fight in melee.
    pub fn uses_spells(&self) -> bool {
        self.archetype == Archetype::Caster && self.race != Race::Orc
    }
}

impl std::fmt::Display for AgentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match (self.archetype, self.race) {
            (Archetype::Melee, Race::Orc) => "Raider",
            (Archetype::Melee, _) => "Warrior",
            (Archetype::Caster, Race::Orc) => "Shaman",
            (Archetype::Caster, _) => "Mage",
        };
        write!(f, "{:?} {}", self.race, role)
    }
}

/// Behavioral state of an agent. An agent is in exactly one state at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgentState {
    #[default]
    Idle,
    Exploring,
    Combat,
    Fleeing,
    ReturningHome,
    Farming,
    /// Reserved; never entered under the current policy
    Socializing,
}

impl AgentState {
    /// All states, in declaration order
    pub const ALL: [AgentState; 7] = [
        AgentState::Idle,
        AgentState::Exploring,
        AgentState::Combat,
        AgentState::Fleeing,
        AgentState::ReturningHome,
        AgentState::Farming,
        AgentState::Socializing,
    ];
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentState::Idle => "IDLE",
            AgentState::Exploring => "EXPLORING",
            AgentState::Combat => "COMBAT",
            AgentState::Fleeing => "FLEEING",
            AgentState::ReturningHome => "RETURNING_HOME",
            AgentState::Farming => "FARMING",
            AgentState::Socializing => "SOCIALIZING",
        };
        f.write_str(name)
    }
}

/// Read-only view of an agent for listings and coordination hooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: Uuid,
    pub name: String,
    pub actor: EntityId,
    pub level: u32,
    pub class: AgentClass,
    pub state: AgentState,
    pub online: bool,
    pub home: Location,
    pub target: Option<EntityId>,
    pub auto_farm: bool,
    pub auto_farm_radius: f64,
    pub wins: u32,
    pub losses: u32,
}
