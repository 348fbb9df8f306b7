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

//! Combat policy for one agent against one validated target
//!
//! Safety comes first on every entry and on every swing: a human player is
//! never attacked outside the ruleset. Spell-using classes fight only with
//! their configured ranged ability; they never fall back to melee.

use crate::ai::personality::Personality;
use crate::context::AiContext;
use crate::world::{AbilityId, ActorStatus};
use autobot_common::{AgentClass, EntityId, EntityView};
use thiserror::Error;

/// Why the policy could not act at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CombatFailure {
    /// The required ability is unknown and the lookup failed.
    #[error("Required ability {0} is unavailable")]
    MissingAbility(AbilityId),
}

/// Result of one combat decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    /// Melee auto-attack issued
    Attacked,
    /// Ability cast started
    Cast(AbilityId),
    /// Movement issued (approach or retreat)
    Moving,
    /// Already attacking, casting or walking to the right spot
    InProgress,
    /// Nothing to do this tick, e.g. ability on cooldown
    Wait,
    /// Movement was needed but the way is blocked; retried next tick
    Blocked,
    /// Target is not allowed; caller must clear it
    Rejected,
    /// Unable to act; caller must re-acquire or idle
    Failed(CombatFailure),
}

/// The acting agent as seen by the combat policy
#[derive(Debug, Clone, Copy)]
pub struct Combatant<'a> {
    pub name: &'a str,
    pub actor: EntityId,
    pub class: AgentClass,
    pub level: u32,
    pub personality: Personality,
    pub status: &'a ActorStatus,
}

/// Combat decisions backed by the context's actor model and geodata
pub struct CombatPolicy<'a> {
    context: &'a AiContext,
}

impl<'a> CombatPolicy<'a> {
    /// Create a new combat policy
    pub fn new(context: &'a AiContext) -> Self {
        Self { context }
    }

    pub(crate) fn context(&self) -> &AiContext {
        self.context
    }

    /// Ranged spell range for spell users, physical range otherwise
    pub fn effective_range(&self, me: &Combatant) -> f64 {
        if me.class.uses_spells() {
            self.context.config().combat.caster_range
        } else {
            me.status.attack_range
        }
    }

    /// The base policy: close to range, then strike
    pub fn engage(&self, me: &Combatant, target: &EntityView) -> CombatOutcome {
        if let Some(outcome) = self.preflight(me, target) {
            return outcome;
        }
        let range = self.effective_range(me);
        let distance = me.status.location.distance_2d(&target.location);
        if distance <= range {
            return self.strike(me, target);
        }
        let standoff = range * self.context.config().combat.approach_fraction;
        self.approach(me, target, standoff)
    }

    /// Checks shared by every strategy: safety, busy state and spell cooldown
    pub(crate) fn preflight(&self, me: &Combatant, target: &EntityView) -> Option<CombatOutcome> {
        if self.forbidden(me, target) {
            return Some(CombatOutcome::Rejected);
        }
        if me.status.is_engaged() {
            return Some(CombatOutcome::InProgress);
        }
        if me.class.uses_spells() {
            let ability = self.primary_ability();
            let actors = self.context.actors();
            if actors.knows_ability(me.actor, ability) && !actors.ability_ready(me.actor, ability) {
                tracing::trace!("{} waiting for {} cooldown", me.name, ability);
                return Some(CombatOutcome::Wait);
            }
        }
        None
    }

    /// Human players are off limits outside the ruleset; clears the actor's target
    fn forbidden(&self, me: &Combatant, target: &EntityView) -> bool {
        let allowed = self.context.config().combat.allow_player_targets && target.zone.is_pvp();
        if target.is_real_player() && !allowed {
            tracing::warn!(
                "{} refused to attack player {} ({}), clearing target",
                me.name,
                target.name,
                target.id
            );
            self.context.actors().set_target(me.actor, None);
            return true;
        }
        false
    }

    fn primary_ability(&self) -> AbilityId {
        AbilityId(self.context.config().combat.caster_ability)
    }

    /// Walk to the point `standoff` units from the target on our side of it
    pub(crate) fn approach(&self, me: &Combatant, target: &EntityView, standoff: f64) -> CombatOutcome {
        let point = me.status.location.approach_point(&target.location, standoff);
        let refresh = self.context.config().behavior.move_refresh_distance;
        if me.status.moving
            && me
                .status
                .destination
                .is_some_and(|d| d.distance_2d(&point) <= refresh)
        {
            return CombatOutcome::InProgress;
        }
        if !self.context.geodata().can_move(&me.status.location, &point) {
            tracing::debug!("{} cannot reach {} from {}", me.name, target.name, me.status.location);
            return CombatOutcome::Blocked;
        }
        self.context.actors().move_to(me.actor, point);
        CombatOutcome::Moving
    }

    /// Step `distance` units further away from the target
    pub(crate) fn retreat(&self, me: &Combatant, target: &EntityView, distance: f64) -> CombatOutcome {
        let point = me.status.location.away_from(&target.location, distance);
        if !self.context.geodata().can_move(&me.status.location, &point) {
            tracing::debug!("{} has no room to back away from {}", me.name, target.name);
            return CombatOutcome::Blocked;
        }
        self.context.actors().move_to(me.actor, point);
        CombatOutcome::Moving
    }

    /// Attack now, according to the class rule
    pub fn strike(&self, me: &Combatant, target: &EntityView) -> CombatOutcome {
        if self.forbidden(me, target) {
            return CombatOutcome::Rejected;
        }
        if me.status.moving {
            self.context.actors().stop(me.actor);
        }
        if me.class.uses_spells() {
            return self.cast_primary(me, target);
        }
        self.context.actors().attack(me.actor, target.id);
        CombatOutcome::Attacked
    }

    fn cast_primary(&self, me: &Combatant, target: &EntityView) -> CombatOutcome {
        let actors = self.context.actors();
        let combat = &self.context.config().combat;
        let ability = self.primary_ability();

        if me.status.casting {
            return CombatOutcome::Wait;
        }
        if me.status.mana < combat.mana_floor {
            actors.restore_mana(me.actor, combat.mana_restore);
        }
        if !actors.knows_ability(me.actor, ability) {
            if !actors.grant_ability(me.actor, ability) {
                tracing::error!(
                    "{} cannot fight: {} is unknown and could not be granted",
                    me.name,
                    ability
                );
                return CombatOutcome::Failed(CombatFailure::MissingAbility(ability));
            }
            tracing::info!("{} learned {}", me.name, ability);
        }
        if !actors.ability_ready(me.actor, ability) {
            return CombatOutcome::Wait;
        }
        if actors.cast(me.actor, ability, target.id) {
            CombatOutcome::Cast(ability)
        } else {
            tracing::debug!("{} cast of {} on {} was refused", me.name, ability, target.name);
            CombatOutcome::Wait
        }
    }
}
