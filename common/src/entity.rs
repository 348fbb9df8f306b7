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

//! Read-only entity snapshots handed out by the world

use crate::geometry::Location;
use serde::{Deserialize, Serialize};

/// Runtime identifier of an in-world entity (monster, player or agent actor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Coarse classification of an entity for targeting purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntityClass {
    #[default]
    Regular,
    Elite,
    Boss,
    Player,
}

/// World-region classification gating combat eligibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ZoneKind {
    #[default]
    Normal,
    /// Safe zone: no combat initiated here
    Peace,
    /// Player-versus-player enabled
    Pvp,
    /// Siege battlefield, player-type targets allowed
    Siege,
}

impl ZoneKind {
    /// Whether combat between player-type entities is permitted
    pub fn is_pvp(&self) -> bool {
        matches!(self, ZoneKind::Pvp | ZoneKind::Siege)
    }

    /// Whether this is a safe zone
    pub fn is_safe(&self) -> bool {
        matches!(self, ZoneKind::Peace)
    }
}

/// Filter applied to spatial queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityFilter {
    /// Every non-player entity (regular, elite and boss)
    Monsters,
    /// Player-type entities, including agent-controlled actors
    Players,
    All,
}

impl EntityFilter {
    /// Check whether an entity passes this filter
    pub fn matches(&self, view: &EntityView) -> bool {
        match self {
            EntityFilter::Monsters => view.class != EntityClass::Player,
            EntityFilter::Players => view.class == EntityClass::Player,
            EntityFilter::All => true,
        }
    }
}

/// Snapshot of an entity as seen by an agent during one think cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub name: String,
    pub location: Location,
    /// Current health as a fraction of maximum, `0.0..=1.0`
    pub health: f64,
    pub level: u32,
    pub alive: bool,
    pub attackable: bool,
    pub class: EntityClass,
    /// True when this player-type entity is driven by another autonomous agent
    pub controlled: bool,
    /// Player flagged for PvP combat
    pub pvp_flagged: bool,
    /// Entity this one is currently targeting
    pub target: Option<EntityId>,
    /// Whether the current target is a player-type entity
    pub target_is_player: bool,
    /// Whether this entity is swinging or casting at its target right now
    pub attacking: bool,
    /// Entities currently attacking this one
    pub attackers: Vec<EntityId>,
    pub zone: ZoneKind,
}

impl EntityView {
    /// Create a regular, full-health, attackable monster snapshot
    pub fn monster(id: EntityId, name: impl Into<String>, location: Location, level: u32) -> Self {
        Self {
            id,
            name: name.into(),
            location,
            health: 1.0,
            level,
            alive: true,
            attackable: true,
            class: EntityClass::Regular,
            controlled: false,
            pvp_flagged: false,
            target: None,
            target_is_player: false,
            attacking: false,
            attackers: Vec::new(),
            zone: ZoneKind::Normal,
        }
    }

    /// Set the health fraction
    pub fn with_health(mut self, health: f64) -> Self {
        self.health = health.clamp(0.0, 1.0);
        self
    }

    /// Set the entity classification
    pub fn with_class(mut self, class: EntityClass) -> Self {
        self.class = class;
        self
    }

    /// Set the current attackers
    pub fn with_attackers(mut self, attackers: impl IntoIterator<Item = EntityId>) -> Self {
        self.attackers = attackers.into_iter().collect();
        self
    }

    /// Set the current target and whether it is player-type
    pub fn with_target(mut self, target: EntityId, is_player: bool) -> Self {
        self.target = Some(target);
        self.target_is_player = is_player;
        self
    }

    /// Set the zone the entity stands in
    pub fn with_zone(mut self, zone: ZoneKind) -> Self {
        self.zone = zone;
        self
    }

    /// Player-type entity, human or agent controlled
    pub fn is_player_type(&self) -> bool {
        self.class == EntityClass::Player
    }

    /// A player-type entity driven by a human
    pub fn is_real_player(&self) -> bool {
        self.is_player_type() && !self.controlled
    }

    /// Boss or elite classification
    pub fn is_notable(&self) -> bool {
        matches!(self.class, EntityClass::Boss | EntityClass::Elite)
    }

    /// Number of attackers other than `excluding`
    pub fn attackers_excluding(&self, excluding: EntityId) -> usize {
        self.attackers.iter().filter(|id| **id != excluding).count()
    }

    /// Whether `attacker` is among the entities currently attacking this one
    pub fn is_attacked_by(&self, attacker: EntityId) -> bool {
        self.attackers.contains(&attacker)
    }
}
