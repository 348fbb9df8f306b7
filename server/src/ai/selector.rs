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

//! Multi-criteria target scoring
//!
//! Candidates first pass a validity prefilter, then receive a weighted score
//! built from five factors normalized to 0-100: distance, health, level
//! delta, threat and reward. Personality modulates the result and a bounded
//! jitter keeps choices from being fully predictable.

use crate::ai::personality::Personality;
use crate::world::Geodata;
use autobot_common::{EntityClass, EntityId, EntityView, Location, ZoneKind};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Discrete danger rating of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThreatLevel {
    None,
    Low,
    Medium,
    High,
    Extreme,
}

/// Strategic category of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetCategory {
    Monster,
    Player,
    /// Another autonomous agent's character
    Agent,
    Boss,
}

impl TargetCategory {
    pub fn of(candidate: &EntityView) -> Self {
        match candidate.class {
            EntityClass::Player if candidate.controlled => TargetCategory::Agent,
            EntityClass::Player => TargetCategory::Player,
            EntityClass::Boss | EntityClass::Elite => TargetCategory::Boss,
            EntityClass::Regular => TargetCategory::Monster,
        }
    }
}

/// The agent doing the choosing
#[derive(Debug, Clone, Copy)]
pub struct Seeker {
    pub actor: EntityId,
    pub location: Location,
    pub level: u32,
    pub personality: Personality,
    pub zone: ZoneKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub distance: f64,
    pub health: f64,
    pub level: f64,
    pub threat: f64,
    pub reward: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            distance: 0.25,
            health: 0.20,
            level: 0.15,
            threat: 0.30,
            reward: 0.10,
        }
    }
}

/// Weighted target selector
#[derive(Debug, Clone)]
pub struct TargetSelector {
    weights: ScoreWeights,
    jitter: f64,
    allow_player_targets: bool,
}

impl TargetSelector {
    /// Create a new selector.
    ///
    /// `jitter` is the relative spread of the random factor (0.1 = ±10%).
    /// `allow_player_targets` permits human players inside PvP zones.
    pub fn new(jitter: f64, allow_player_targets: bool) -> Self {
        Self {
            weights: ScoreWeights::default(),
            jitter: jitter.clamp(0.0, 1.0),
            allow_player_targets,
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Validity prefilter
    pub fn is_valid(&self, seeker: &Seeker, candidate: &EntityView, geodata: &dyn Geodata) -> bool {
        if !candidate.alive || !candidate.attackable || candidate.id == seeker.actor {
            return false;
        }
        if candidate.is_real_player() && !(self.allow_player_targets && seeker.zone == ZoneKind::Pvp)
        {
            return false;
        }
        if candidate.is_player_type() && candidate.controlled && !seeker.zone.is_pvp() {
            return false;
        }
        if candidate.zone.is_safe() && seeker.zone != ZoneKind::Pvp {
            return false;
        }
        geodata.can_see(&seeker.location, &candidate.location)
    }

    /// Classify how dangerous a candidate is to the seeker
    pub fn classify_threat(seeker: &Seeker, candidate: &EntityView) -> ThreatLevel {
        let delta = candidate.level as i64 - seeker.level as i64;
        let base = if candidate.target == Some(seeker.actor) {
            ThreatLevel::High
        } else if candidate.target.is_some() && candidate.target_is_player && candidate.attacking {
            ThreatLevel::Medium
        } else if delta > 10 {
            ThreatLevel::Extreme
        } else if delta > 5 {
            ThreatLevel::High
        } else if delta > 0 {
            ThreatLevel::Medium
        } else if candidate.is_player_type() {
            if candidate.pvp_flagged {
                ThreatLevel::High
            } else if candidate.health < 0.5 {
                ThreatLevel::Low
            } else {
                ThreatLevel::Medium
            }
        } else {
            ThreatLevel::Low
        };

        match candidate.class {
            EntityClass::Boss => base.max(ThreatLevel::Extreme),
            EntityClass::Elite => base.max(ThreatLevel::High),
            _ => base,
        }
    }

    /// Deterministic score, before jitter
    pub fn base_score(&self, seeker: &Seeker, candidate: &EntityView) -> f64 {
        let threat = Self::classify_threat(seeker, candidate);
        let delta = candidate.level as i64 - seeker.level as i64;
        let w = &self.weights;
        let score = w.distance * distance_score(seeker.location.distance_2d(&candidate.location))
            + w.health * health_score(candidate)
            + w.level * level_score(delta)
            + w.threat * threat_score(threat, seeker.personality.aggression())
            + w.reward * reward_score(seeker, candidate, delta);
        score * personality_modifier(seeker, candidate)
    }

    /// Score with jitter applied
    pub fn score<R: Rng + ?Sized>(&self, seeker: &Seeker, candidate: &EntityView, rng: &mut R) -> f64 {
        let base = self.base_score(seeker, candidate);
        if self.jitter <= 0.0 {
            return base;
        }
        base * rng.random_range((1.0 - self.jitter)..=(1.0 + self.jitter))
    }

    /// Highest scoring valid candidate
    pub fn select_best<'c, R: Rng + ?Sized>(
        &self,
        seeker: &Seeker,
        candidates: &'c [EntityView],
        geodata: &dyn Geodata,
        rng: &mut R,
    ) -> Option<&'c EntityView> {
        candidates
            .iter()
            .filter(|c| self.is_valid(seeker, c, geodata))
            .map(|c| (self.score(seeker, c, rng), c))
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, c)| c)
    }
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self::new(0.1, false)
    }
}

/// Closer scores higher, zero beyond 2000 units
pub fn distance_score(distance: f64) -> f64 {
    (100.0 - distance / 20.0).max(0.0)
}

/// Wounded targets score higher; notable targets at full health keep a floor
pub fn health_score(candidate: &EntityView) -> f64 {
    match candidate.health {
        h if h < 0.25 => 90.0,
        h if h < 0.50 => 70.0,
        h if h < 0.75 => 50.0,
        _ if candidate.is_notable() => 60.0,
        _ => 30.0,
    }
}

/// Slightly above the seeker's level scores highest
pub fn level_score(delta: i64) -> f64 {
    match delta {
        d if d <= -5 => 40.0,
        d if d <= 0 => 80.0,
        d if d <= 3 => 90.0,
        d if d <= 7 => 60.0,
        _ => 20.0,
    }
}

/// Tolerance for danger grows with aggression
pub fn threat_score(threat: ThreatLevel, aggression: u8) -> f64 {
    match threat {
        ThreatLevel::None => 100.0,
        ThreatLevel::Low => 80.0,
        ThreatLevel::Medium if aggression > 50 => 60.0,
        ThreatLevel::Medium => 40.0,
        ThreatLevel::High if aggression > 70 => 40.0,
        ThreatLevel::High => 10.0,
        ThreatLevel::Extreme if aggression > 90 => 20.0,
        ThreatLevel::Extreme => 0.0,
    }
}

fn reward_score(seeker: &Seeker, candidate: &EntityView, delta: i64) -> f64 {
    let mut reward = 50.0;
    match candidate.class {
        EntityClass::Boss => reward += 40.0,
        EntityClass::Elite => reward += 25.0,
        _ => {}
    }
    if delta.abs() <= 3 {
        reward += 20.0;
    }
    if candidate.is_player_type() && seeker.zone == ZoneKind::Pvp {
        reward += 30.0;
    }
    f64::min(reward, 100.0)
}

fn personality_modifier(seeker: &Seeker, candidate: &EntityView) -> f64 {
    let aggression = seeker.personality.aggression();
    let mut modifier = 1.0;
    if candidate.is_player_type() {
        if aggression > 70 {
            modifier *= 1.3;
        } else if aggression < 30 {
            modifier *= 0.7;
        }
    }
    if seeker.zone.is_safe() && seeker.personality.sociability() > 60 {
        modifier *= 0.5;
    }
    modifier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::SimWorld;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn seeker(aggression: u8) -> Seeker {
        Seeker {
            actor: EntityId(1),
            location: Location::default(),
            level: 10,
            personality: Personality::new(aggression, 30, false),
            zone: ZoneKind::Normal,
        }
    }

    fn mob(id: u64, x: f64) -> EntityView {
        EntityView::monster(EntityId(id), "gremlin", Location::new(x, 0.0, 0.0), 10)
    }

    #[test]
    fn test_distance_score_monotonic() {
        let selector = TargetSelector::new(0.0, false);
        let s = seeker(50);
        let mut previous = f64::INFINITY;
        for x in (0..3000).step_by(50) {
            let score = selector.base_score(&s, &mob(2, x as f64));
            assert!(score <= previous);
            previous = score;
        }
    }

    #[test]
    fn test_select_closer_of_equal_candidates() {
        let world = SimWorld::new();
        let selector = TargetSelector::new(0.0, false);
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = vec![mob(2, 900.0), mob(3, 500.0)];
        let best = selector.select_best(&seeker(70), &candidates, &world, &mut rng).unwrap();
        assert_eq!(best.id, EntityId(3));
    }

    #[test]
    fn test_jitter_bounded() {
        let selector = TargetSelector::new(0.1, false);
        let mut rng = StdRng::seed_from_u64(11);
        let s = seeker(50);
        let candidate = mob(2, 400.0);
        let base = selector.base_score(&s, &candidate);
        for _ in 0..500 {
            let score = selector.score(&s, &candidate, &mut rng);
            assert!(score >= base * 0.9 - 1e-9 && score <= base * 1.1 + 1e-9);
        }
    }

    #[test]
    fn test_validity_rules() {
        let world = SimWorld::new();
        let selector = TargetSelector::default();
        let s = seeker(50);

        assert!(selector.is_valid(&s, &mob(2, 100.0), &world));

        let mut dead = mob(3, 100.0);
        dead.alive = false;
        assert!(!selector.is_valid(&s, &dead, &world));

        let me = mob(1, 0.0);
        assert!(!selector.is_valid(&s, &me, &world));

        let player = mob(4, 100.0).with_class(EntityClass::Player);
        assert!(!selector.is_valid(&s, &player, &world));

        let mut other_agent = player.clone();
        other_agent.controlled = true;
        assert!(!selector.is_valid(&s, &other_agent, &world));
        let siege = Seeker {
            zone: ZoneKind::Siege,
            ..s
        };
        assert!(selector.is_valid(&siege, &other_agent, &world));

        let in_town = mob(5, 100.0).with_zone(ZoneKind::Peace);
        assert!(!selector.is_valid(&s, &in_town, &world));
    }

    #[test]
    fn test_players_only_with_ruleset_in_pvp() {
        let world = SimWorld::new();
        let player = mob(4, 100.0).with_class(EntityClass::Player);
        let pvp = Seeker {
            zone: ZoneKind::Pvp,
            ..seeker(90)
        };
        assert!(!TargetSelector::new(0.0, false).is_valid(&pvp, &player, &world));
        assert!(TargetSelector::new(0.0, true).is_valid(&pvp, &player, &world));
        assert!(!TargetSelector::new(0.0, true).is_valid(&seeker(90), &player, &world));
    }

    #[test]
    fn test_threat_classification() {
        let s = seeker(50);
        let mut engaged = mob(2, 100.0);
        engaged.target = Some(EntityId(1));
        assert_eq!(TargetSelector::classify_threat(&s, &engaged), ThreatLevel::High);

        let mut busy_with_monster = mob(2, 100.0).with_target(EntityId(99), false);
        busy_with_monster.attacking = true;
        assert_eq!(TargetSelector::classify_threat(&s, &busy_with_monster), ThreatLevel::Low);

        let mut busy_with_player = mob(2, 100.0).with_target(EntityId(99), true);
        busy_with_player.attacking = true;
        assert_eq!(TargetSelector::classify_threat(&s, &busy_with_player), ThreatLevel::Medium);

        let mut high = mob(2, 100.0);
        high.level = 21;
        assert_eq!(TargetSelector::classify_threat(&s, &high), ThreatLevel::Extreme);

        let boss = mob(2, 100.0).with_class(EntityClass::Boss);
        assert_eq!(TargetSelector::classify_threat(&s, &boss), ThreatLevel::Extreme);

        let elite = mob(2, 100.0).with_class(EntityClass::Elite);
        assert_eq!(TargetSelector::classify_threat(&s, &elite), ThreatLevel::High);

        assert_eq!(TargetSelector::classify_threat(&s, &mob(2, 100.0)), ThreatLevel::Low);
    }

    #[test]
    fn test_factor_tables() {
        assert_eq!(level_score(-6), 40.0);
        assert_eq!(level_score(0), 80.0);
        assert_eq!(level_score(2), 90.0);
        assert_eq!(level_score(6), 60.0);
        assert_eq!(level_score(12), 20.0);
        assert_eq!(threat_score(ThreatLevel::High, 71), 40.0);
        assert_eq!(threat_score(ThreatLevel::High, 70), 10.0);
        assert_eq!(threat_score(ThreatLevel::Extreme, 95), 20.0);
        assert_eq!(distance_score(500.0), 75.0);
        assert_eq!(distance_score(5000.0), 0.0);
        let boss = mob(2, 0.0).with_class(EntityClass::Boss);
        assert_eq!(health_score(&boss), 60.0);
        assert_eq!(health_score(&mob(2, 0.0).with_health(0.2)), 90.0);
    }

    #[test]
    fn test_sociable_agent_suppressed_in_town() {
        let selector = TargetSelector::new(0.0, false);
        let candidate = mob(2, 100.0);
        let outside = Seeker {
            personality: Personality::new(50, 80, false),
            ..seeker(50)
        };
        let in_town = Seeker {
            zone: ZoneKind::Peace,
            ..outside
        };
        let ratio = selector.base_score(&in_town, &candidate) / selector.base_score(&outside, &candidate);
        assert!((ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_category() {
        assert_eq!(TargetCategory::of(&mob(2, 0.0)), TargetCategory::Monster);
        let mut agent = mob(2, 0.0).with_class(EntityClass::Player);
        assert_eq!(TargetCategory::of(&agent), TargetCategory::Player);
        agent.controlled = true;
        assert_eq!(TargetCategory::of(&agent), TargetCategory::Agent);
    }
}
