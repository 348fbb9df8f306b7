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

//! Target acquisition shared by the farming, combat and idle actions

use crate::ai::agent::Agent;
use crate::ai::exclusion::ExclusionSet;
use crate::ai::selector::{Seeker, TargetSelector};
use crate::config::{AcquisitionConfig, AcquisitionMode};
use crate::context::AiContext;
use crate::world::ActorStatus;
use autobot_common::{EntityFilter, EntityId, EntityView, Location};
use rand::Rng;
use tokio::time::Instant;

/// Lower is better
pub fn acquisition_score(origin: &Location, candidate: &EntityView, other_attackers: usize) -> f64 {
    let wounded = if candidate.health < 0.5 {
        0.3
    } else if candidate.health < 0.75 {
        0.6
    } else {
        1.0
    };
    let contention = if other_attackers == 0 { 0.8 } else { 1.0 };
    origin.distance_2d(&candidate.location) * wounded * contention
}

/// Candidates `me` may pick: alive, attackable monsters that are not
/// excluded, match the name filter and are not contested.
pub fn survivors<'c>(
    me: EntityId,
    candidates: &'c [EntityView],
    exclusion: &ExclusionSet,
    config: &AcquisitionConfig,
) -> Vec<&'c EntityView> {
    let filter = config.name_filter.as_ref().map(|f| f.to_lowercase());
    candidates
        .iter()
        .filter(|c| {
            c.alive
                && c.attackable
                && c.id != me
                && !c.is_player_type()
                && !exclusion.contains(c.id)
                && filter
                    .as_deref()
                    .is_none_or(|f| c.name.to_lowercase().contains(f))
                && c.attackers_excluding(me) < config.contest_cap
        })
        .collect()
}

/// Pick the candidate with the lowest acquisition score
pub fn select_candidate<'c>(
    me: EntityId,
    origin: &Location,
    candidates: &'c [EntityView],
    exclusion: &ExclusionSet,
    config: &AcquisitionConfig,
) -> Option<&'c EntityView> {
    survivors(me, candidates, exclusion, config)
        .into_iter()
        .map(|c| (acquisition_score(origin, c, c.attackers_excluding(me)), c))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c)
}

impl Agent {
    /// Find, mark and target the best nearby monster
    pub(crate) fn acquire_target<R: Rng + ?Sized>(
        &mut self,
        context: &AiContext,
        status: &ActorStatus,
        rng: &mut R,
        now: Instant,
    ) -> bool {
        let config = context.config();
        if self.exclusion.purge_if_due(now) {
            tracing::debug!("{} cleared its excluded targets", self.name);
        }

        let radius = if self.auto_farm {
            self.auto_farm_radius
        } else {
            config.acquisition.radius
        };
        let candidates = context
            .spatial()
            .entities_in_radius(&status.location, radius, EntityFilter::Monsters);

        let chosen = match config.acquisition.mode {
            AcquisitionMode::Nearest => select_candidate(
                self.actor,
                &status.location,
                &candidates,
                &self.exclusion,
                &config.acquisition,
            ),
            AcquisitionMode::Scored => {
                let pool: Vec<EntityView> =
                    survivors(self.actor, &candidates, &self.exclusion, &config.acquisition)
                        .into_iter()
                        .cloned()
                        .collect();
                let seeker = Seeker {
                    actor: self.actor,
                    location: status.location,
                    level: self.level,
                    personality: self.personality,
                    zone: context.spatial().zone_at(&status.location),
                };
                let selector = TargetSelector::new(
                    config.acquisition.jitter,
                    config.combat.allow_player_targets,
                );
                selector
                    .select_best(&seeker, &pool, context.geodata(), rng)
                    .and_then(|best| candidates.iter().find(|c| c.id == best.id))
            }
        };

        let Some(target) = chosen else {
            tracing::debug!(
                "{} found no available targets among {} within {:.0}",
                self.name,
                candidates.len(),
                radius
            );
            return false;
        };

        self.exclusion.insert(target.id);
        self.target = Some(target.id);
        context.actors().set_target(self.actor, Some(target.id));
        tracing::info!(
            "{} targeting {} ({}) at distance {:.1}, HP {:.1}%, attackers {}",
            self.name,
            target.name,
            target.id,
            status.location.distance_2d(&target.location),
            target.health * 100.0,
            target.attackers_excluding(self.actor)
        );

        // Spell users open with their ability on the next combat round
        if !status.is_busy_for_attack() && !self.class.uses_spells() {
            context.actors().attack(self.actor, target.id);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::personality::Personality;
    use crate::config::AiConfig;
    use crate::persistence::PersistenceWriter;
    use crate::world::sim::{MonsterSpec, Rect, SimWorld};
    use crate::world::{ActorModel, ActorSpawn, SpatialQuery};
    use autobot_common::{AgentClass, Archetype, EntityClass, Race, ZoneKind};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;
    use std::time::Duration;

    fn mob(id: u64, x: f64) -> EntityView {
        EntityView::monster(EntityId(id), format!("Gremlin {id}"), Location::new(x, 0.0, 0.0), 10)
    }

    fn exclusion() -> ExclusionSet {
        ExclusionSet::new(Duration::from_secs(45), Instant::now())
    }

    const ME: EntityId = EntityId(1000);

    #[test]
    fn test_nearest_of_two() {
        let candidates = vec![mob(1, 900.0), mob(2, 500.0)];
        let config = AcquisitionConfig::default();
        let exclusion = exclusion();
        let chosen = select_candidate(ME, &Location::default(), &candidates, &exclusion, &config);
        assert_eq!(chosen.map(|c| c.id), Some(EntityId(2)));
    }

    #[test]
    fn test_contested_skipped_for_farther_uncontested() {
        let candidates = vec![
            mob(1, 200.0).with_attackers([EntityId(50), EntityId(51)]),
            mob(2, 800.0),
        ];
        let config = AcquisitionConfig::default();
        let exclusion = exclusion();
        let chosen = select_candidate(ME, &Location::default(), &candidates, &exclusion, &config);
        assert_eq!(chosen.map(|c| c.id), Some(EntityId(2)));
    }

    #[test]
    fn test_own_attack_does_not_count_as_contention() {
        let candidates = vec![mob(1, 200.0).with_attackers([EntityId(50), ME])];
        let config = AcquisitionConfig::default();
        let exclusion = exclusion();
        let chosen = select_candidate(ME, &Location::default(), &candidates, &exclusion, &config);
        assert_eq!(chosen.map(|c| c.id), Some(EntityId(1)));
    }

    #[test]
    fn test_wounded_preferred() {
        let candidates = vec![mob(1, 300.0), mob(2, 600.0).with_health(0.4)];
        let config = AcquisitionConfig::default();
        let exclusion = exclusion();
        let chosen = select_candidate(ME, &Location::default(), &candidates, &exclusion, &config);
        // 600 * 0.3 * 0.8 beats 300 * 0.8
        assert_eq!(chosen.map(|c| c.id), Some(EntityId(2)));
    }

    #[test]
    fn test_filters() {
        let mut dead = mob(1, 100.0);
        dead.alive = false;
        let mut player = mob(2, 100.0).with_class(EntityClass::Player);
        player.zone = ZoneKind::Pvp;
        let excluded = mob(3, 100.0);
        let mut wolf = mob(4, 100.0);
        wolf.name = "Wolf".to_string();

        let candidates = vec![dead, player, excluded, wolf];
        let mut exclusion = exclusion();
        exclusion.insert(EntityId(3));
        let config = AcquisitionConfig {
            name_filter: Some("GREMLIN".to_string()),
            ..AcquisitionConfig::default()
        };
        assert!(select_candidate(ME, &Location::default(), &candidates, &exclusion, &config).is_none());

        let unfiltered = AcquisitionConfig::default();
        let chosen = select_candidate(ME, &Location::default(), &candidates, &exclusion, &unfiltered);
        assert_eq!(chosen.map(|c| c.id), Some(EntityId(4)));
    }

    #[test]
    fn test_score_monotonic_in_distance() {
        let near = mob(1, 100.0);
        let far = mob(2, 101.0);
        let origin = Location::default();
        assert!(acquisition_score(&origin, &near, 0) <= acquisition_score(&origin, &far, 0));
    }

    struct Hunt {
        world: Arc<SimWorld>,
        context: AiContext,
        actor: EntityId,
        class: AgentClass,
        now: Instant,
    }

    impl Hunt {
        fn new(config: AiConfig) -> Self {
            let world = Arc::new(SimWorld::new());
            let class = AgentClass::new(Archetype::Melee, Race::Human);
            let actor = world
                .spawn_actor(&ActorSpawn {
                    name: "Hunter".to_string(),
                    class,
                    level: 10,
                    location: Location::default(),
                })
                .unwrap();
            let context = AiContext::new(world.clone(), config, PersistenceWriter::disabled());
            Self {
                world,
                context,
                actor,
                class,
                now: Instant::now(),
            }
        }

        fn agent(&self, personality: Personality) -> Agent {
            Agent::new(
                "Hunter",
                self.actor,
                self.class,
                10,
                Location::default(),
                personality,
                self.context.config(),
                self.now,
            )
        }

        fn status(&self) -> ActorStatus {
            self.world.status(self.actor).unwrap()
        }
    }

    fn scored() -> AiConfig {
        let mut config = AiConfig::default();
        config.acquisition.mode = AcquisitionMode::Scored;
        config
    }

    #[test]
    fn test_players_never_acquired_for_any_personality() {
        let mut pvp = scored();
        pvp.combat.allow_player_targets = true;
        for config in [AiConfig::default(), scored(), pvp] {
            let hunt = Hunt::new(config);
            hunt.world.add_zone(Rect::new(-500.0, -500.0, 500.0, 500.0), ZoneKind::Pvp);
            let human = hunt.world.spawn_player("Human", Location::new(20.0, 0.0, 0.0), 10);
            let gremlin = hunt
                .world
                .spawn_monster(MonsterSpec::new("gremlin", Location::new(300.0, 0.0, 0.0), 10));
            let mut rng = StdRng::seed_from_u64(17);
            let status = hunt.status();

            for aggression in 0..=100 {
                for sociability in 0..=100 {
                    let mut agent = hunt.agent(Personality::new(aggression, sociability, sociability % 2 == 0));
                    assert!(agent.acquire_target(&hunt.context, &status, &mut rng, hunt.now));
                    assert_ne!(agent.target, Some(human));
                    assert_eq!(agent.target, Some(gremlin));
                }
            }
            assert_ne!(hunt.world.entity(hunt.actor).unwrap().target, Some(human));
        }
    }

    #[test]
    fn test_excluded_target_selectable_after_window() {
        for config in [AiConfig::default(), scored()] {
            let hunt = Hunt::new(config);
            let gremlin = hunt
                .world
                .spawn_monster(MonsterSpec::new("gremlin", Location::new(300.0, 0.0, 0.0), 10));
            let mut rng = StdRng::seed_from_u64(3);
            let status = hunt.status();
            let mut agent = hunt.agent(Personality::new(50, 30, false));

            assert!(agent.acquire_target(&hunt.context, &status, &mut rng, hunt.now));
            assert_eq!(agent.target, Some(gremlin));
            assert!(agent.exclusion.contains(gremlin));

            agent.target = None;
            let later = hunt.now + Duration::from_secs(30);
            assert!(!agent.acquire_target(&hunt.context, &status, &mut rng, later));
            assert_eq!(agent.target, None);

            let expired = hunt.now + Duration::from_secs(46);
            assert!(agent.acquire_target(&hunt.context, &status, &mut rng, expired));
            assert_eq!(agent.target, Some(gremlin));
        }
    }

    #[test]
    fn test_scored_mode_prefers_closer_equal_target() {
        let mut config = scored();
        config.acquisition.jitter = 0.0;
        let hunt = Hunt::new(config);
        hunt.world
            .spawn_monster(MonsterSpec::new("gremlin", Location::new(900.0, 0.0, 0.0), 10));
        let near = hunt
            .world
            .spawn_monster(MonsterSpec::new("gremlin", Location::new(400.0, 0.0, 0.0), 10));
        let mut rng = StdRng::seed_from_u64(5);
        let mut agent = hunt.agent(Personality::new(50, 30, false));

        assert!(agent.acquire_target(&hunt.context, &hunt.status(), &mut rng, hunt.now));
        assert_eq!(agent.target, Some(near));
        assert_eq!(hunt.world.entity(hunt.actor).unwrap().target, Some(near));
    }
}
