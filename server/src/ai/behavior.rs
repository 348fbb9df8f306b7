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

//! The think cycle: gather facts, transition, act

use crate::ai::agent::{Agent, StuckTracker};
use crate::ai::combat::{CombatOutcome, CombatPolicy, Combatant};
use crate::ai::fsm::{TargetFacts, TransitionInput, next_state};
use crate::ai::patterns::generate_pattern;
use crate::ai::tactics::Tactic;
use crate::context::AiContext;
use crate::error::{AiError, AiResult};
use crate::persistence::{DeathRecord, Record};
use crate::world::ActorStatus;
use autobot_common::{AgentState, EntityFilter, EntityView, Location};
use chrono::Utc;
use rand::Rng;
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use tokio::time::Instant;

/// What the scheduler must do after a think
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkOutcome {
    Continue,
    /// The agent sat down; schedule the stand-up timer
    Sat,
    /// The actor died this cycle; schedule the despawn timer
    Died,
}

impl Agent {
    /// Run one think cycle
    pub fn think<R: Rng + ?Sized>(
        &mut self,
        context: &AiContext,
        rng: &mut R,
        now: Instant,
    ) -> AiResult<ThinkOutcome> {
        let status = context
            .actors()
            .status(self.actor)
            .ok_or_else(|| AiError::ActorMissing {
                name: self.name.clone(),
                actor: self.actor,
            })?;
        self.last_think = Some(now);

        if !status.alive {
            return Ok(self.handle_death(context, &status));
        }
        if self.dead {
            tracing::info!("{} is back on its feet", self.name);
            self.dead = false;
        }

        let target = self.resolve_target(context);
        let input = self.transition_input(context, &status, target.as_ref(), rng, now);
        let next = next_state(self.state, &input, &context.config().behavior);
        self.set_state(next, now);

        let mut outcome = ThinkOutcome::Continue;
        match self.state {
            AgentState::Combat => self.combat_action(context, &status, target, rng, now),
            AgentState::Exploring => self.explore_action(context, &status, rng, now),
            AgentState::Fleeing => self.flee_action(context, &status),
            AgentState::ReturningHome => self.return_home(context, &status),
            AgentState::Farming => self.farming_action(context, &status, rng, now),
            AgentState::Socializing => self.set_state(AgentState::Farming, now),
            AgentState::Idle => outcome = self.idle_action(context, &status, rng, now),
        }

        self.check_stuck(context, &status, rng, now);
        Ok(outcome)
    }

    fn handle_death(&mut self, context: &AiContext, status: &ActorStatus) -> ThinkOutcome {
        if self.dead {
            return ThinkOutcome::Continue;
        }
        self.dead = true;
        self.losses += 1;
        self.target = None;
        self.engaged = None;
        self.destination = None;

        let killer = status.last_attacker.and_then(|id| context.spatial().entity(id));
        tracing::info!(
            "{} was killed by {} at {}",
            self.name,
            killer.as_ref().map(|k| k.name.as_str()).unwrap_or("unknown causes"),
            status.location
        );
        context.persistence().submit(Record::Death(DeathRecord {
            agent_id: self.id,
            name: self.name.clone(),
            class: self.class,
            level: self.level,
            killer: killer.as_ref().map(|k| k.name.clone()),
            killer_class: killer.map(|k| k.class),
            location: status.location,
            at: Utc::now(),
        }));
        ThinkOutcome::Died
    }

    /// Look up the current target, dropping it when it left the world or is a forbidden player
    fn resolve_target(&mut self, context: &AiContext) -> Option<EntityView> {
        let id = self.target?;
        let Some(view) = context.spatial().entity(id) else {
            tracing::debug!("{} lost track of target {}", self.name, id);
            self.clear_target(context);
            return None;
        };
        if self.is_forbidden(context, &view) {
            tracing::warn!(
                "{} was targeting player {}, clearing target",
                self.name,
                view.name
            );
            self.clear_target(context);
            return None;
        }
        Some(view)
    }

    fn is_forbidden(&self, context: &AiContext, view: &EntityView) -> bool {
        view.is_real_player() && !(context.config().combat.allow_player_targets && view.zone.is_pvp())
    }

    fn transition_input<R: Rng + ?Sized>(
        &self,
        context: &AiContext,
        status: &ActorStatus,
        target: Option<&EntityView>,
        rng: &mut R,
        now: Instant,
    ) -> TransitionInput {
        let behavior = &context.config().behavior;
        let hostiles_targeting = context
            .spatial()
            .hostiles_targeting(self.actor, &status.location, behavior.outnumbered_radius)
            .len();

        TransitionInput {
            target: target.map(|t| TargetFacts {
                alive: t.alive,
                attackable: t.attackable,
                health: t.health,
            }),
            health: status.health,
            aggression: self.personality.aggression(),
            hostiles_targeting,
            distance_from_home: status.location.distance_2d(&self.home),
            in_safe_zone: context.spatial().zone_at(&status.location).is_safe(),
            auto_farm: self.auto_farm,
            socialize: false,
            explore_roll: rng.random_range(0..100),
            explore_chance: self.personality.explore_chance(),
            since_state_change: now.saturating_duration_since(self.last_state_change),
        }
    }

    // ============================================================================
    // Per-State Actions
    // ============================================================================

    fn combat_action<R: Rng + ?Sized>(
        &mut self,
        context: &AiContext,
        status: &ActorStatus,
        target: Option<EntityView>,
        rng: &mut R,
        now: Instant,
    ) {
        let Some(target) = target else {
            if !self.acquire_target(context, status, rng, now) {
                self.set_state(AgentState::Farming, now);
            }
            return;
        };

        if !target.alive {
            tracing::info!("{} killed {} ({})", self.name, target.name, target.id);
            metrics::counter!("autobot_kills_total").increment(1);
            self.wins += 1;
            self.clear_target(context);
            if !self.acquire_target(context, status, rng, now) {
                self.set_state(AgentState::Farming, now);
            }
            return;
        }

        if !target.attackable {
            tracing::debug!("{} dropping unattackable target {}", self.name, target.name);
            self.clear_target(context);
            return;
        }

        let cap = context.config().acquisition.contest_cap;
        let attackers = context.spatial().attackers_on(target.id, self.actor);
        if self.engaged != Some(target.id) && attackers >= cap {
            tracing::info!(
                "{} abandoning {} ({} already attacking), looking for a new target",
                self.name,
                target.name,
                attackers
            );
            self.exclusion.insert(target.id);
            self.clear_target(context);
            if !self.acquire_target(context, status, rng, now) {
                self.set_state(AgentState::Farming, now);
            }
            return;
        }

        if self.engaged != Some(target.id) {
            tracing::info!(
                "{} engaging {} ({}) at {} HP {:.0}%",
                self.name,
                target.name,
                target.id,
                target.location,
                target.health * 100.0
            );
            self.engaged = Some(target.id);
        }

        let me = Combatant {
            name: &self.name,
            actor: self.actor,
            class: self.class,
            level: self.level,
            personality: self.personality,
            status,
        };
        let policy = CombatPolicy::new(context);
        let outcome = if context.config().combat.use_tactics {
            let tactic = Tactic::choose(
                status.health,
                self.personality.aggression(),
                target.level as i64 - self.level as i64,
            );
            policy.engage_with(&me, &target, tactic, rng)
        } else {
            policy.engage(&me, &target)
        };

        match outcome {
            CombatOutcome::Rejected => {
                self.target = None;
                self.engaged = None;
                self.set_state(AgentState::Farming, now);
            }
            CombatOutcome::Failed(reason) => {
                tracing::debug!("{} cannot fight {}: {}", self.name, target.name, reason);
                self.clear_target(context);
            }
            other => tracing::trace!("{} combat round against {}: {:?}", self.name, target.name, other),
        }
    }

    fn explore_action<R: Rng + ?Sized>(
        &mut self,
        context: &AiContext,
        status: &ActorStatus,
        rng: &mut R,
        now: Instant,
    ) {
        let behavior = &context.config().behavior;
        let reached = self
            .destination
            .is_none_or(|d| status.location.distance_2d(&d) < behavior.destination_reach);
        let expired = self
            .destination_set
            .is_none_or(|set| now.saturating_duration_since(set) > behavior.destination_timeout());

        if reached || expired {
            self.destination = self.exploration_destination(context, status, rng);
            self.destination_set = Some(now);
            match self.destination {
                Some(destination) => tracing::trace!("{} exploring to {}", self.name, destination),
                None => tracing::debug!("{} found nowhere to explore", self.name),
            }
        }

        if !status.moving {
            if let Some(destination) = self.destination {
                self.move_to(context, status, destination);
            }
        }
    }

    /// A random navigable waypoint of the personality's pattern, or a random probe
    pub(crate) fn exploration_destination<R: Rng + ?Sized>(
        &self,
        context: &AiContext,
        status: &ActorStatus,
        rng: &mut R,
    ) -> Option<Location> {
        let behavior = &context.config().behavior;
        let geodata = context.geodata();
        let origin = status.location;
        let roll_radius = |rng: &mut R| {
            if behavior.explore_radius_max > behavior.explore_radius_min {
                rng.random_range(behavior.explore_radius_min..behavior.explore_radius_max)
            } else {
                behavior.explore_radius_min
            }
        };

        let radius = roll_radius(rng);
        let points = generate_pattern(
            geodata,
            &origin,
            radius,
            behavior.explore_steps,
            self.personality.exploration_pattern(),
            rng,
        );
        // A waypoint within reach counts as already visited
        let reachable: Vec<Location> = points
            .into_iter()
            .filter(|p| p.distance_2d(&origin) >= behavior.destination_reach && geodata.can_move(&origin, p))
            .collect();
        if !reachable.is_empty() {
            return Some(reachable[rng.random_range(0..reachable.len())]);
        }

        for _ in 0..behavior.explore_fallback_attempts {
            let heading = rng.random_range(0.0..TAU);
            let probe = origin.polar(heading, roll_radius(rng));
            let probe = Location::new(probe.x, probe.y, geodata.height(probe.x, probe.y, origin.z));
            if geodata.can_move(&origin, &probe) {
                return Some(probe);
            }
        }
        None
    }

    fn flee_action(&mut self, context: &AiContext, status: &ActorStatus) {
        if status.moving {
            return;
        }
        let behavior = &context.config().behavior;
        let geodata = context.geodata();
        let origin = status.location;

        let nearest_threat = context
            .spatial()
            .hostiles_targeting(self.actor, &origin, behavior.flee_distance)
            .into_iter()
            .map(|e| e.location)
            .min_by(|a, b| a.distance_2d(&origin).total_cmp(&b.distance_2d(&origin)));

        let probes = Location::compass().into_iter().filter_map(|heading| {
            let probe = origin.polar(heading, behavior.flee_distance);
            let probe = Location::new(probe.x, probe.y, geodata.height(probe.x, probe.y, origin.z));
            geodata.can_move(&origin, &probe).then_some(probe)
        });
        let refuge = match nearest_threat {
            Some(threat) => {
                probes.max_by(|a, b| a.distance_2d(&threat).total_cmp(&b.distance_2d(&threat)))
            }
            None => probes.into_iter().next(),
        };

        match refuge {
            Some(refuge) => {
                tracing::debug!("{} fleeing to {}", self.name, refuge);
                self.move_to(context, status, refuge);
            }
            None => {
                tracing::debug!("{} has nowhere to flee, heading home", self.name);
                let home = self.home;
                self.move_to(context, status, home);
            }
        }
    }

    fn return_home(&mut self, context: &AiContext, status: &ActorStatus) {
        if !status.moving {
            let home = self.home;
            self.move_to(context, status, home);
        }
    }

    fn farming_action<R: Rng + ?Sized>(
        &mut self,
        context: &AiContext,
        status: &ActorStatus,
        rng: &mut R,
        now: Instant,
    ) {
        self.scan_nearby(context, status, now);
        if self.acquire_target(context, status, rng, now) {
            self.set_state(AgentState::Combat, now);
        } else {
            self.explore_action(context, status, rng, now);
        }
    }

    /// Periodic summary of the monsters around the agent
    fn scan_nearby(&mut self, context: &AiContext, status: &ActorStatus, now: Instant) {
        let behavior = &context.config().behavior;
        if self
            .last_mob_scan
            .is_some_and(|last| now.saturating_duration_since(last) < behavior.mob_scan_interval())
        {
            return;
        }
        self.last_mob_scan = Some(now);

        let radius = context.config().acquisition.radius;
        let nearby = context
            .spatial()
            .entities_in_radius(&status.location, radius, EntityFilter::Monsters);
        if nearby.is_empty() {
            tracing::debug!("{} at {} sees no monsters within {:.0}", self.name, status.location, radius);
            return;
        }

        // name -> (total, attackable, nearest, farthest)
        let mut groups: BTreeMap<&str, (usize, usize, f64, f64)> = BTreeMap::new();
        for mob in &nearby {
            let distance = status.location.distance_2d(&mob.location);
            let entry = groups
                .entry(mob.name.as_str())
                .or_insert((0, 0, f64::MAX, 0.0));
            entry.0 += 1;
            if mob.alive && mob.attackable {
                entry.1 += 1;
            }
            entry.2 = entry.2.min(distance);
            entry.3 = entry.3.max(distance);
        }
        let summary = groups
            .iter()
            .map(|(name, (total, attackable, near, far))| {
                format!("{name}: {total} total, {attackable} attackable, range {near:.0}-{far:.0}")
            })
            .collect::<Vec<_>>()
            .join("; ");
        tracing::debug!("{} at {} detects {} monsters: {}", self.name, status.location, nearby.len(), summary);
    }

    fn idle_action<R: Rng + ?Sized>(
        &mut self,
        context: &AiContext,
        status: &ActorStatus,
        rng: &mut R,
        now: Instant,
    ) -> ThinkOutcome {
        let chance = context.config().behavior.idle_action_chance.clamp(0.0, 1.0);
        if !rng.random_bool(chance) {
            return ThinkOutcome::Continue;
        }
        match rng.random_range(0..4) {
            0 => self.set_state(AgentState::Exploring, now),
            // Socializing is gated off
            1 => self.set_state(AgentState::Farming, now),
            2 if !status.sitting => {
                context.actors().sit(self.actor);
                return ThinkOutcome::Sat;
            }
            3 if status.sitting => context.actors().stand(self.actor),
            _ => {}
        }
        ThinkOutcome::Continue
    }

    /// Stand up again after a cosmetic sit
    pub(crate) fn stand_up(&mut self, context: &AiContext) {
        let sitting = context
            .actors()
            .status(self.actor)
            .is_some_and(|status| status.alive && status.sitting);
        if sitting {
            context.actors().stand(self.actor);
        }
    }

    fn check_stuck<R: Rng + ?Sized>(
        &mut self,
        context: &AiContext,
        status: &ActorStatus,
        rng: &mut R,
        now: Instant,
    ) {
        let travelling = matches!(
            self.state,
            AgentState::Exploring | AgentState::Farming | AgentState::ReturningHome | AgentState::Fleeing
        ) && !status.is_engaged();
        if !travelling {
            self.stuck = StuckTracker::default();
            return;
        }

        let behavior = &context.config().behavior;
        if !self
            .stuck
            .observe(status.location, behavior.stuck_threshold, behavior.stuck_limit)
        {
            return;
        }

        tracing::info!("{} appears stuck at {}", self.name, status.location);
        self.destination = self.exploration_destination(context, status, rng);
        self.destination_set = Some(now);
        let fallback = self.destination.unwrap_or(self.home);
        self.move_to(context, status, fallback);
    }
}
