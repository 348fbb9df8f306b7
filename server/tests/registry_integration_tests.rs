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

//! Agent lifecycle integration tests: death handling, persistence and spawn groups

use autobot_common::{AgentClass, Archetype, EntityClass, Location, Race};
use autobot_server::config::{AiConfig, ConfigError, Configuration};
use autobot_server::context::AiContext;
use autobot_server::persistence::{JournalPersistence, PersistenceWriter, Record};
use autobot_server::registry::AgentRegistry;
use autobot_server::scheduler::Scheduler;
use autobot_server::spawn::{GROUP_FARM_RADIUS, SpawnGroup, SpawnGroups};
use autobot_server::world::sim::{MonsterSpec, SimWorld};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn warrior() -> AgentClass {
    AgentClass::new(Archetype::Melee, Race::Human)
}

#[tokio::test(start_paused = true)]
async fn test_killed_agent_is_recorded_then_despawned() {
    let world = Arc::new(SimWorld::new());
    let (writer, mut records) = PersistenceWriter::channel();
    let context = AiContext::new(world.clone(), AiConfig::default(), writer);
    let registry = Arc::new(AgentRegistry::new(Arc::new(context)));
    let scheduler = Scheduler::new(registry.clone());

    registry.spawn("Doomed", warrior(), 10, Location::default()).unwrap();
    let actor = registry.get("Doomed").unwrap().actor();
    let mut ogre = MonsterSpec::new("Ogre", Location::new(30.0, 0.0, 0.0), 40).with_class(EntityClass::Elite);
    ogre.damage = 10_000.0;
    let ogre = world.spawn_monster(ogre);
    world.set_attacking(ogre, actor);
    world.step(Duration::from_secs(1));

    let now = Instant::now();
    let report = scheduler.tick(now);
    assert_eq!(report.died, 1);
    // Dead agents stay registered until the despawn timer fires
    assert!(registry.contains("Doomed"));
    assert_eq!(registry.statistics().dead, 1);

    // A second think on the corpse does not report the death again
    let idle = AiConfig::default().think.idle();
    assert_eq!(scheduler.tick(now + idle * 2).died, 0);

    let delay = AiConfig::default().behavior.death_despawn_delay();
    tokio::time::sleep(delay + Duration::from_secs(1)).await;
    assert!(!registry.contains("Doomed"));

    assert!(matches!(records.try_recv(), Ok(Record::Spawn(_))));
    match records.try_recv() {
        Ok(Record::Death(death)) => {
            assert_eq!(death.name, "Doomed");
            assert_eq!(death.killer.as_deref(), Some("Ogre"));
            assert_eq!(death.killer_class, Some(EntityClass::Elite));
        }
        other => panic!("expected a death record, got {:?}", other),
    }
    match records.try_recv() {
        Ok(Record::Despawn(despawn)) => assert_eq!(despawn.losses, 1),
        other => panic!("expected a despawn record, got {:?}", other),
    }
    assert!(records.try_recv().is_err());
}

#[tokio::test]
async fn test_journal_receives_lifecycle_records() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("journal.jsonl");
    let (writer, task) = PersistenceWriter::start(Arc::new(JournalPersistence::new(&path)));

    let world = Arc::new(SimWorld::new());
    let context = AiContext::new(world, AiConfig::default(), writer);
    let registry = AgentRegistry::new(Arc::new(context));
    registry.spawn("Scribe", warrior(), 10, Location::default()).unwrap();
    registry.spawn("Copyist", warrior(), 12, Location::new(100.0, 0.0, 0.0)).unwrap();
    assert!(registry.despawn("Scribe"));
    drop(registry);

    assert_eq!(task.await.unwrap(), 3);
    let contents = std::fs::read_to_string(&path).unwrap();
    let records: Vec<Record> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let kinds: Vec<&str> = records.iter().map(|record| record.kind()).collect();
    assert_eq!(kinds, vec!["spawn", "spawn", "despawn"]);
}

#[test]
fn test_spawn_groups_from_configuration() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "ai:\n  tick_ms: 250\ndemo:\n  monsters: 0\n  groups:\n    - group: orc_shamans\n      count: 2\n    - group: \"1\"\n      count: 3\n    - group: trolls\n      count: 1"
    )
    .unwrap();
    let config = Configuration::load(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.ai.tick(), Duration::from_millis(250));
    assert_eq!(config.demo.groups.len(), 3);

    let world = Arc::new(SimWorld::new());
    let context = AiContext::new(world, config.ai.clone(), PersistenceWriter::disabled());
    let registry = Arc::new(AgentRegistry::new(Arc::new(context)));
    let groups = SpawnGroups::new(registry.clone());

    let mut failures = 0;
    for entry in &config.demo.groups {
        match entry.group.parse::<SpawnGroup>() {
            Ok(group) => {
                groups.spawn_group(group, entry.count).unwrap();
            }
            Err(_) => failures += 1,
        }
    }
    assert_eq!(failures, 1);
    assert_eq!(
        groups.active_groups(),
        vec![(SpawnGroup::HumanWarriors, 3), (SpawnGroup::OrcShamans, 2)]
    );

    let shaman = registry.get("OrcShaman01").unwrap().snapshot();
    assert!(shaman.auto_farm);
    assert_eq!(shaman.auto_farm_radius, GROUP_FARM_RADIUS);
    assert!(!shaman.class.uses_spells());
    assert!(registry.contains("HumanWarrior03"));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "ai:\n  tick_ms: 0").unwrap();
    assert!(matches!(
        Configuration::load(file.path().to_str().unwrap()),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(
        Configuration::load("/nonexistent/autobot.yaml"),
        Err(ConfigError::Open(_))
    ));
}
