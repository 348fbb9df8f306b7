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

//! Tactical profiles layered over the base combat policy

use crate::ai::combat::{CombatOutcome, CombatPolicy, Combatant};
use autobot_common::EntityView;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tactic {
    /// Close in tight and use special attacks when mana allows
    Aggressive,
    /// Heal when hurt, back off after each strike
    Defensive,
    /// Hold at the optimal range, backing off when crowded
    Balanced,
    /// Same footing as balanced
    Support,
    /// Strike, then step back before the target closes
    Kiting,
}

impl Tactic {
    /// Pick a profile from health, aggression and `target level - agent level`
    pub fn choose(health: f64, aggression: u8, level_delta: i64) -> Tactic {
        if health < 0.30 {
            Tactic::Defensive
        } else if aggression > 70 {
            Tactic::Aggressive
        } else if level_delta > 5 {
            Tactic::Kiting
        } else {
            Tactic::Balanced
        }
    }
}

impl CombatPolicy<'_> {
    /// Engage using a tactical profile instead of the base policy
    pub fn engage_with<R: Rng + ?Sized>(
        &self,
        me: &Combatant,
        target: &EntityView,
        tactic: Tactic,
        rng: &mut R,
    ) -> CombatOutcome {
        if let Some(outcome) = self.preflight(me, target) {
            return outcome;
        }
        let combat = &self.context().config().combat;
        let range = self.effective_range(me);
        let distance = me.status.location.distance_2d(&target.location);
        let melee = !me.class.uses_spells();

        match tactic {
            Tactic::Aggressive => {
                if distance > range {
                    let standoff = combat.aggressive_approach.min(range * combat.approach_fraction);
                    return self.approach(me, target, standoff);
                }
                if melee && me.status.mana_fraction() > 0.3 && rng.random_bool(0.3) {
                    let actors = self.context().actors();
                    if let Some(ability) = actors.offensive_ability(me.actor) {
                        if actors.cast(me.actor, ability, target.id) {
                            return CombatOutcome::Cast(ability);
                        }
                    }
                }
                self.strike(me, target)
            }
            Tactic::Defensive => {
                if me.status.health < 0.5 {
                    let actors = self.context().actors();
                    if let Some(heal) = actors.healing_ability(me.actor) {
                        if actors.cast(me.actor, heal, me.actor) {
                            tracing::debug!("{} healing at {:.0}% health", me.name, me.status.health * 100.0);
                            return CombatOutcome::Cast(heal);
                        }
                    }
                }
                if distance <= range {
                    return self.hit_and_run(me, target, combat.defensive_retreat);
                }
                if distance < combat.defensive_retreat {
                    return self.retreat(me, target, combat.defensive_retreat);
                }
                self.approach(me, target, range * combat.approach_fraction)
            }
            Tactic::Balanced | Tactic::Support => {
                let optimal = range * combat.approach_fraction;
                if distance < optimal * 0.5 {
                    return self.retreat(me, target, optimal - distance);
                }
                if distance <= range {
                    return self.strike(me, target);
                }
                self.approach(me, target, optimal)
            }
            Tactic::Kiting => {
                if distance <= range {
                    return self.hit_and_run(me, target, combat.kiting_retreat);
                }
                self.approach(me, target, (range - 20.0).max(range * 0.5))
            }
        }
    }

    /// Strike, then step `offset` units back while the swing or cast resolves
    fn hit_and_run(&self, me: &Combatant, target: &EntityView, offset: f64) -> CombatOutcome {
        let outcome = self.strike(me, target);
        if matches!(outcome, CombatOutcome::Attacked | CombatOutcome::Cast(_)) {
            self.retreat(me, target, offset);
        }
        outcome
    }
}
