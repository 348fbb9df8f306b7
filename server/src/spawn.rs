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

//! Predefined spawn groups
//!
//! A spawn group pairs a character class with a base location. Spawning a
//! group places its members on a ring around the base, names them after the
//! group prefix and turns on auto-farming for each of them.

use crate::error::{AiError, AiResult};
use crate::registry::AgentRegistry;
use autobot_common::{AgentClass, Archetype, Location, Race};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Auto-farm radius given to every group member
pub const GROUP_FARM_RADIUS: f64 = 800.0;

/// Highest `_k` suffix tried before giving up on a free name
const MAX_NAME_SUFFIX: u32 = 999;

/// One predefined group of agents sharing a class and a base location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnGroup {
    HumanWarriors,
    HumanMages,
    ElfWarriors,
    ElfMages,
    DarkWarriors,
    DarkMages,
    DwarfWarriors,
    OrcWarriors,
    OrcShamans,
}

impl SpawnGroup {
    /// All groups, ordered by id
    pub const ALL: [SpawnGroup; 9] = [
        SpawnGroup::HumanWarriors,
        SpawnGroup::HumanMages,
        SpawnGroup::ElfWarriors,
        SpawnGroup::ElfMages,
        SpawnGroup::DarkWarriors,
        SpawnGroup::DarkMages,
        SpawnGroup::DwarfWarriors,
        SpawnGroup::OrcWarriors,
        SpawnGroup::OrcShamans,
    ];

    /// Numeric id, starting at 1
    pub fn id(&self) -> u32 {
        match self {
            SpawnGroup::HumanWarriors => 1,
            SpawnGroup::HumanMages => 2,
            SpawnGroup::ElfWarriors => 3,
            SpawnGroup::ElfMages => 4,
            SpawnGroup::DarkWarriors => 5,
            SpawnGroup::DarkMages => 6,
            SpawnGroup::DwarfWarriors => 7,
            SpawnGroup::OrcWarriors => 8,
            SpawnGroup::OrcShamans => 9,
        }
    }

    pub fn from_id(id: u32) -> Option<SpawnGroup> {
        Self::ALL.into_iter().find(|group| group.id() == id)
    }

    /// Configuration key, e.g. `human_warriors`
    pub fn key(&self) -> &'static str {
        match self {
            SpawnGroup::HumanWarriors => "human_warriors",
            SpawnGroup::HumanMages => "human_mages",
            SpawnGroup::ElfWarriors => "elf_warriors",
            SpawnGroup::ElfMages => "elf_mages",
            SpawnGroup::DarkWarriors => "dark_warriors",
            SpawnGroup::DarkMages => "dark_mages",
            SpawnGroup::DwarfWarriors => "dwarf_warriors",
            SpawnGroup::OrcWarriors => "orc_warriors",
            SpawnGroup::OrcShamans => "orc_shamans",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SpawnGroup::HumanWarriors => "Human Fighter",
            SpawnGroup::HumanMages => "Human Mage",
            SpawnGroup::ElfWarriors => "Elf Fighter",
            SpawnGroup::ElfMages => "Elf Mage",
            SpawnGroup::DarkWarriors => "Dark Elf Fighter",
            SpawnGroup::DarkMages => "Dark Elf Mage",
            SpawnGroup::DwarfWarriors => "Dwarf Fighter",
            SpawnGroup::OrcWarriors => "Orc Fighter",
            SpawnGroup::OrcShamans => "Orc Mage",
        }
    }

    pub fn class(&self) -> AgentClass {
        let (archetype, race) = match self {
            SpawnGroup::HumanWarriors => (Archetype::Melee, Race::Human),
            SpawnGroup::HumanMages => (Archetype::Caster, Race::Human),
            SpawnGroup::ElfWarriors => (Archetype::Melee, Race::Elf),
            SpawnGroup::ElfMages => (Archetype::Caster, Race::Elf),
            SpawnGroup::DarkWarriors => (Archetype::Melee, Race::DarkElf),
            SpawnGroup::DarkMages => (Archetype::Caster, Race::DarkElf),
            SpawnGroup::DwarfWarriors => (Archetype::Melee, Race::Dwarf),
            SpawnGroup::OrcWarriors => (Archetype::Melee, Race::Orc),
            SpawnGroup::OrcShamans => (Archetype::Caster, Race::Orc),
        };
        AgentClass::new(archetype, race)
    }

    /// Prefix of member names
    pub fn prefix(&self) -> &'static str {
        match self {
            SpawnGroup::HumanWarriors => "HumanWarrior",
            SpawnGroup::HumanMages => "HumanMage",
            SpawnGroup::ElfWarriors => "ElfWarrior",
            SpawnGroup::ElfMages => "ElfMage",
            SpawnGroup::DarkWarriors => "DarkWarrior",
            SpawnGroup::DarkMages => "DarkMage",
            SpawnGroup::DwarfWarriors => "DwarfWarrior",
            SpawnGroup::OrcWarriors => "OrcWarrior",
            SpawnGroup::OrcShamans => "OrcShaman",
        }
    }

    /// Center of the spawn ring. Groups of the same race share a base.
    pub fn base(&self) -> Location {
        match self {
            SpawnGroup::HumanWarriors => Location::new(-800.0, -800.0, 0.0),
            SpawnGroup::HumanMages => Location::new(-800.0, 900.0, 0.0),
            SpawnGroup::ElfWarriors | SpawnGroup::ElfMages => Location::new(1400.0, -1400.0, 0.0),
            SpawnGroup::DarkWarriors | SpawnGroup::DarkMages => Location::new(-1600.0, -1700.0, 0.0),
            SpawnGroup::DwarfWarriors => Location::new(1500.0, 1000.0, 0.0),
            SpawnGroup::OrcWarriors | SpawnGroup::OrcShamans => Location::new(0.0, -2000.0, 0.0),
        }
    }
}

impl std::fmt::Display for SpawnGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SpawnGroup {
    type Err = AiError;

    /// Parse a group from its key or its numeric id
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let found = match s.parse::<u32>() {
            Ok(id) => SpawnGroup::from_id(id),
            Err(_) => SpawnGroup::ALL
                .into_iter()
                .find(|group| group.key().eq_ignore_ascii_case(s)),
        };
        found.ok_or_else(|| AiError::UnknownGroup(s.to_string()))
    }
}

/// A group to spawn at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnGroupConfig {
    /// Group key or numeric id
    pub group: String,
    pub count: usize,
}

/// Position of member `index` on the spawn ring around `base`
///
/// Members are spread evenly around the circle. Every five members the
/// ring widens by 30 units so larger groups do not stack.
pub fn ring_position(base: &Location, index: usize, count: usize) -> Location {
    let angle = TAU * index as f64 / count.max(1) as f64;
    let radius = 50.0 + (index / 5) as f64 * 30.0;
    base.polar(angle, radius)
}

/// Tracks which agents belong to which active spawn group
pub struct SpawnGroups {
    registry: Arc<AgentRegistry>,
    active: DashMap<SpawnGroup, Vec<(String, Uuid)>>,
}

impl SpawnGroups {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            active: DashMap::new(),
        }
    }

    // ============================================================================
    // Lifecycle
    // ============================================================================

    /// Spawn `count` members of a group around its base
    ///
    /// An already active group is despawned first.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of agents actually spawned
    /// * `Err(AiError)` - No member could be spawned
    pub fn spawn_group(&self, group: SpawnGroup, count: usize) -> AiResult<usize> {
        if self.is_active(group) {
            tracing::info!("Spawn group {} is already active, respawning it", group);
            self.despawn_group(group);
        }

        let base = group.base();
        let level = self.registry.context().config().min_level;
        let mut members = Vec::with_capacity(count);
        for index in 0..count {
            let Some(name) = self.member_name(group, index) else {
                tracing::warn!("No free name left for member {} of group {}", index + 1, group);
                continue;
            };
            let location = ring_position(&base, index, count);
            match self.registry.spawn(&name, group.class(), level, location) {
                Ok(id) => {
                    self.registry.set_auto_farm(&name, true)?;
                    self.registry.set_auto_farm_radius(&name, GROUP_FARM_RADIUS)?;
                    members.push((name, id));
                }
                Err(e) if members.is_empty() && index + 1 == count => return Err(e),
                Err(e) => tracing::warn!("Unable to spawn {} for group {}: {}", name, group, e),
            }
        }

        let spawned = members.len();
        if spawned > 0 {
            self.active.insert(group, members);
        }
        tracing::info!(
            "Spawned {}/{} agents for group {} ({}) around {}",
            spawned,
            count,
            group.id(),
            group.description(),
            base
        );
        Ok(spawned)
    }

    /// Despawn every member of a group. Returns `false` if it was not active.
    pub fn despawn_group(&self, group: SpawnGroup) -> bool {
        let Some((_, members)) = self.active.remove(&group) else {
            return false;
        };
        // Members may already be gone after dying; a reused name is left alone
        let removed = members
            .iter()
            .filter(|(name, id)| self.registry.despawn_generation(name, *id))
            .count();
        tracing::info!("Despawned {} members of group {}", removed, group);
        true
    }

    /// Despawn every active group, returning how many groups were removed
    pub fn despawn_all_groups(&self) -> usize {
        let groups: Vec<SpawnGroup> = self.active.iter().map(|entry| *entry.key()).collect();
        groups.into_iter().filter(|group| self.despawn_group(*group)).count()
    }

    // ============================================================================
    // Queries
    // ============================================================================

    pub fn is_active(&self, group: SpawnGroup) -> bool {
        self.active.contains_key(&group)
    }

    /// Member names of an active group
    pub fn members(&self, group: SpawnGroup) -> Vec<String> {
        self.active
            .get(&group)
            .map(|entry| entry.value().iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    /// Active groups with their member counts, ordered by id
    pub fn active_groups(&self) -> Vec<(SpawnGroup, usize)> {
        let mut groups: Vec<(SpawnGroup, usize)> = self
            .active
            .iter()
            .map(|entry| (*entry.key(), entry.value().len()))
            .collect();
        groups.sort_by_key(|(group, _)| group.id());
        groups
    }

    /// `Prefix01`, or `Prefix01_2`, `Prefix01_3`, ... when the name is taken
    fn member_name(&self, group: SpawnGroup, index: usize) -> Option<String> {
        let base = format!("{}{:02}", group.prefix(), index + 1);
        if !self.registry.contains(&base) {
            return Some(base);
        }
        (2..=MAX_NAME_SUFFIX)
            .map(|k| format!("{}_{}", base, k))
            .find(|name| !self.registry.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiConfig;
    use crate::context::AiContext;
    use crate::persistence::PersistenceWriter;
    use crate::world::sim::SimWorld;

    fn groups() -> (Arc<AgentRegistry>, SpawnGroups) {
        let world = Arc::new(SimWorld::new());
        let context = AiContext::new(world, AiConfig::default(), PersistenceWriter::disabled());
        let registry = Arc::new(AgentRegistry::new(Arc::new(context)));
        (registry.clone(), SpawnGroups::new(registry))
    }

    #[test]
    fn test_group_parsing() {
        assert_eq!("human_warriors".parse::<SpawnGroup>().unwrap(), SpawnGroup::HumanWarriors);
        assert_eq!("9".parse::<SpawnGroup>().unwrap(), SpawnGroup::OrcShamans);
        assert_eq!(" Elf_Mages ".parse::<SpawnGroup>().unwrap(), SpawnGroup::ElfMages);
        assert!(matches!("10".parse::<SpawnGroup>(), Err(AiError::UnknownGroup(_))));
        assert!(matches!("trolls".parse::<SpawnGroup>(), Err(AiError::UnknownGroup(_))));
        for group in SpawnGroup::ALL {
            assert_eq!(SpawnGroup::from_id(group.id()), Some(group));
        }
    }

    #[test]
    fn test_orc_shamans_fight_in_melee() {
        assert!(SpawnGroup::HumanMages.class().uses_spells());
        assert!(!SpawnGroup::OrcShamans.class().uses_spells());
    }

    #[test]
    fn test_ring_position() {
        let base = Location::new(100.0, 100.0, 0.0);
        let first = ring_position(&base, 0, 4);
        assert!((first.distance_2d(&base) - 50.0).abs() < 1e-6);
        let sixth = ring_position(&base, 5, 10);
        assert!((sixth.distance_2d(&base) - 80.0).abs() < 1e-6);
        let opposite = ring_position(&base, 2, 4);
        assert!((first.distance_2d(&opposite) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_spawn_group_configures_members() {
        let (registry, groups) = groups();
        assert_eq!(groups.spawn_group(SpawnGroup::ElfMages, 3).unwrap(), 3);
        assert_eq!(groups.members(SpawnGroup::ElfMages), vec!["ElfMage01", "ElfMage02", "ElfMage03"]);

        let agents = registry.list_active();
        assert_eq!(agents.len(), 3);
        for agent in &agents {
            assert!(agent.auto_farm);
            assert_eq!(agent.auto_farm_radius, GROUP_FARM_RADIUS);
            assert_eq!(agent.level, 1);
            assert_eq!(agent.class, SpawnGroup::ElfMages.class());
            assert!(agent.home.distance_2d(&SpawnGroup::ElfMages.base()) <= 50.0 + 1e-6);
        }
    }

    #[test]
    fn test_taken_names_get_suffix() {
        let (registry, groups) = groups();
        assert!(registry.create("OrcWarrior01", SpawnGroup::OrcWarriors.class(), 5, Location::default()));
        groups.spawn_group(SpawnGroup::OrcWarriors, 2).unwrap();
        assert_eq!(groups.members(SpawnGroup::OrcWarriors), vec!["OrcWarrior01_2", "OrcWarrior02"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_respawn_replaces_active_group() {
        let (registry, groups) = groups();
        groups.spawn_group(SpawnGroup::DwarfWarriors, 4).unwrap();
        groups.spawn_group(SpawnGroup::DwarfWarriors, 2).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(groups.active_groups(), vec![(SpawnGroup::DwarfWarriors, 2)]);
    }

    #[test]
    fn test_despawn_groups() {
        let (registry, groups) = groups();
        assert!(!groups.despawn_group(SpawnGroup::HumanWarriors));

        groups.spawn_group(SpawnGroup::HumanWarriors, 2).unwrap();
        groups.spawn_group(SpawnGroup::DarkMages, 2).unwrap();
        // A member already despawned by other means is tolerated
        assert!(registry.despawn("HumanWarrior01"));

        assert!(groups.despawn_group(SpawnGroup::HumanWarriors));
        assert!(!groups.is_active(SpawnGroup::HumanWarriors));
        assert_eq!(registry.len(), 2);

        assert_eq!(groups.despawn_all_groups(), 1);
        assert!(registry.is_empty());
        assert!(groups.active_groups().is_empty());
    }
}
