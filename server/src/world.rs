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

//! External collaborators consumed by the decision core
//!
//! The core never owns world state. Everything it knows about the world comes
//! through three narrow traits:
//! - [`SpatialQuery`]: who is around, which zone a point belongs to
//! - [`Geodata`]: navigability, line of sight and terrain height
//! - [`ActorModel`]: the agent's own character (vitals, busy flags, abilities)
//!   and the intent API used to drive it
//!
//! [`sim::SimWorld`] implements all three for the demo binary and the tests.

pub mod sim;

use autobot_common::{AgentClass, EntityFilter, EntityId, EntityView, Location, ZoneKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a castable ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbilityId(pub u32);

impl std::fmt::Display for AbilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ability:{}", self.0)
    }
}

/// Errors raised by world collaborators
#[derive(Debug, Error)]
pub enum WorldError {
    /// The actor could not be placed in the world.
    #[error("Failed to spawn actor {name}: {reason}")]
    SpawnFailed { name: String, reason: String },

    /// The entity does not exist.
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),
}

/// What the actor was last told to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Intention {
    #[default]
    Idle,
    Move,
    Attack,
    Cast,
    Rest,
}

/// Snapshot of the agent's own character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorStatus {
    pub location: Location,
    /// Health as a fraction of maximum
    pub health: f64,
    pub mana: f64,
    pub max_mana: f64,
    pub level: u32,
    pub alive: bool,
    pub moving: bool,
    pub casting: bool,
    pub attacking: bool,
    pub sitting: bool,
    pub intention: Intention,
    pub target: Option<EntityId>,
    /// Current movement destination, if moving
    pub destination: Option<Location>,
    /// Physical (melee) attack range
    pub attack_range: f64,
    /// Last entity that damaged this actor
    pub last_attacker: Option<EntityId>,
}

impl ActorStatus {
    /// Mana as a fraction of maximum
    pub fn mana_fraction(&self) -> f64 {
        if self.max_mana <= 0.0 {
            0.0
        } else {
            (self.mana / self.max_mana).clamp(0.0, 1.0)
        }
    }

    /// In the middle of an attack or cast
    pub fn is_engaged(&self) -> bool {
        self.attacking || self.casting
    }

    /// Already busy executing or about to execute an offensive intent
    pub fn is_busy_for_attack(&self) -> bool {
        self.attacking
            || self.casting
            || self.moving
            || matches!(self.intention, Intention::Attack | Intention::Cast)
    }
}

/// Request to place a new actor for an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSpawn {
    pub name: String,
    pub class: AgentClass,
    pub level: u32,
    pub location: Location,
}

/// Read-only spatial queries
pub trait SpatialQuery: Send + Sync {
    /// All entities within `radius` of `origin` that pass `filter`
    fn entities_in_radius(
        &self,
        origin: &Location,
        radius: f64,
        filter: EntityFilter,
    ) -> Vec<EntityView>;

    /// Look up a single entity
    fn entity(&self, id: EntityId) -> Option<EntityView>;

    /// Zone classification at a point
    fn zone_at(&self, location: &Location) -> ZoneKind;

    /// Number of entities attacking `target`, not counting `excluding`
    fn attackers_on(&self, target: EntityId, excluding: EntityId) -> usize {
        self.entity(target)
            .map(|view| view.attackers_excluding(excluding))
            .unwrap_or(0)
    }

    /// Living entities within `radius` of `origin` whose target is `who`
    fn hostiles_targeting(&self, who: EntityId, origin: &Location, radius: f64) -> Vec<EntityView> {
        self.entities_in_radius(origin, radius, EntityFilter::All)
            .into_iter()
            .filter(|view| view.alive && view.id != who && view.target == Some(who))
            .collect()
    }
}

/// Terrain queries
pub trait Geodata: Send + Sync {
    /// Whether a straight walk from `from` to `to` is unobstructed
    fn can_move(&self, from: &Location, to: &Location) -> bool;

    /// Whether `to` is visible from `from`
    fn can_see(&self, from: &Location, to: &Location) -> bool;

    /// Walkable surface height at `(x, y)`, starting the probe at `z`
    fn height(&self, x: f64, y: f64, z: f64) -> f64;
}

/// The agent's character and its intent API.
///
/// Intents are fire-and-forget: an intent issued to a missing actor is ignored.
#[cfg_attr(test, mockall::automock)]
pub trait ActorModel: Send + Sync {
    /// Place a new actor in the world
    fn spawn_actor(&self, spawn: &ActorSpawn) -> Result<EntityId, WorldError>;

    /// Remove an actor, returns false if it did not exist
    fn despawn_actor(&self, actor: EntityId) -> bool;

    /// Current status of an actor
    fn status(&self, actor: EntityId) -> Option<ActorStatus>;

    fn move_to(&self, actor: EntityId, destination: Location);

    fn attack(&self, actor: EntityId, target: EntityId);

    /// Begin casting `ability` on `target`; returns false if the cast was refused
    fn cast(&self, actor: EntityId, ability: AbilityId, target: EntityId) -> bool;

    /// Stop moving and attacking
    fn stop(&self, actor: EntityId);

    fn set_target(&self, actor: EntityId, target: Option<EntityId>);

    fn sit(&self, actor: EntityId);

    fn stand(&self, actor: EntityId);

    fn knows_ability(&self, actor: EntityId, ability: AbilityId) -> bool;

    /// Known and off cooldown
    fn ability_ready(&self, actor: EntityId, ability: AbilityId) -> bool;

    /// Look up `ability` at level 1 and teach it; returns false if the lookup fails
    fn grant_ability(&self, actor: EntityId, ability: AbilityId) -> bool;

    fn restore_mana(&self, actor: EntityId, amount: f64);

    /// A ready healing ability, if the actor has one
    fn healing_ability(&self, actor: EntityId) -> Option<AbilityId>;

    /// A ready damaging ability other than auto-attack, if the actor has one
    fn offensive_ability(&self, actor: EntityId) -> Option<AbilityId>;
}
