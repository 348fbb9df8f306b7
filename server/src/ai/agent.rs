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

//! Per-agent state owned by its think cycle

use crate::ai::exclusion::ExclusionSet;
use crate::ai::pathfinder::{PathKind, Pathfinder};
use crate::ai::personality::Personality;
use crate::config::AiConfig;
use crate::context::AiContext;
use crate::world::ActorStatus;
use autobot_common::{AgentClass, AgentSnapshot, AgentState, EntityId, Location};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Counts consecutive think cycles without meaningful displacement
#[derive(Debug, Clone, Default)]
pub struct StuckTracker {
    last: Option<Location>,
    count: u32,
}

impl StuckTracker {
    /// Record a position; true once `limit` consecutive checks moved less than `threshold`
    pub fn observe(&mut self, location: Location, threshold: f64, limit: u32) -> bool {
        let stalled = self
            .last
            .is_some_and(|last| last.distance_2d(&location) < threshold);
        self.last = Some(location);
        if !stalled {
            self.count = 0;
            return false;
        }
        self.count += 1;
        if self.count >= limit {
            self.count = 0;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// An autonomously controlled character.
///
/// Identity, class and personality are fixed at creation. Everything else is
/// mutated only by the agent's own think cycle, or by registry timers that
/// first confirm the agent is still registered.
#[derive(Debug)]
pub struct Agent {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) actor: EntityId,
    pub(crate) class: AgentClass,
    pub(crate) level: u32,
    pub(crate) personality: Personality,
    pub(crate) state: AgentState,
    pub(crate) target: Option<EntityId>,
    /// Target the combat round has already committed to
    pub(crate) engaged: Option<EntityId>,
    pub(crate) destination: Option<Location>,
    pub(crate) home: Location,
    pub(crate) auto_farm: bool,
    pub(crate) auto_farm_radius: f64,
    pub(crate) online: bool,
    pub(crate) dead: bool,

    pub(crate) last_state_change: Instant,
    pub(crate) last_think: Option<Instant>,
    pub(crate) destination_set: Option<Instant>,
    pub(crate) last_mob_scan: Option<Instant>,

    pub(crate) stuck: StuckTracker,
    pub(crate) wins: u32,
    pub(crate) losses: u32,
    pub(crate) exclusion: ExclusionSet,
}

impl Agent {
    /// Create a new agent controlling `actor`, homed where it spawned
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        actor: EntityId,
        class: AgentClass,
        level: u32,
        home: Location,
        personality: Personality,
        config: &AiConfig,
        now: Instant,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            actor,
            class,
            level,
            personality,
            state: AgentState::Idle,
            target: None,
            engaged: None,
            destination: None,
            home,
            auto_farm: false,
            auto_farm_radius: config.behavior.auto_farm_radius,
            online: true,
            dead: false,
            last_state_change: now,
            last_think: None,
            destination_set: None,
            last_mob_scan: None,
            stuck: StuckTracker::default(),
            wins: 0,
            losses: 0,
            exclusion: ExclusionSet::new(config.acquisition.exclusion_window(), now),
        }
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    /// Generation id; a new agent with the same name gets a new id
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actor(&self) -> EntityId {
        self.actor
    }

    pub fn class(&self) -> AgentClass {
        self.class
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn personality(&self) -> Personality {
        self.personality
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    pub fn destination(&self) -> Option<Location> {
        self.destination
    }

    pub fn home(&self) -> Location {
        self.home
    }

    pub fn auto_farm(&self) -> bool {
        self.auto_farm
    }

    pub fn auto_farm_radius(&self) -> f64 {
        self.auto_farm_radius
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    pub fn exclusion(&self) -> &ExclusionSet {
        &self.exclusion
    }

    pub fn last_think(&self) -> Option<Instant> {
        self.last_think
    }

    // ============================================================================
    // Administrative Mutators
    // ============================================================================

    pub fn set_home(&mut self, home: Location) {
        self.home = home;
    }

    pub fn set_auto_farm(&mut self, enabled: bool) {
        self.auto_farm = enabled;
    }

    pub fn set_auto_farm_radius(&mut self, radius: f64) {
        self.auto_farm_radius = radius.max(0.0);
    }

    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Read-only view for reporting and coordination
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            name: self.name.clone(),
            actor: self.actor,
            level: self.level,
            class: self.class,
            state: self.state,
            online: self.online,
            home: self.home,
            target: self.target,
            auto_farm: self.auto_farm,
            auto_farm_radius: self.auto_farm_radius,
            wins: self.wins,
            losses: self.losses,
        }
    }

    /// Whether at least `interval` has passed since the last think
    pub fn is_due(&self, now: Instant, interval: Duration) -> bool {
        match self.last_think {
            Some(last) => now.saturating_duration_since(last) >= interval,
            None => true,
        }
    }

    // ============================================================================
    // Think Helpers
    // ============================================================================

    pub(crate) fn set_state(&mut self, state: AgentState, now: Instant) {
        if self.state == state {
            return;
        }
        tracing::debug!("{} state change: {} -> {}", self.name, self.state, state);
        self.state = state;
        self.last_state_change = now;
    }

    /// Forget the current target locally and on the actor
    pub(crate) fn clear_target(&mut self, context: &AiContext) {
        self.target = None;
        self.engaged = None;
        context.actors().set_target(self.actor, None);
    }

    /// Issue a movement intent toward `destination`.
    ///
    /// A moving agent is not redirected toward a destination it is already
    /// close to. When the direct line is blocked the agent walks to the next
    /// waypoint of a searched path instead.
    pub(crate) fn move_to(&mut self, context: &AiContext, status: &ActorStatus, destination: Location) -> bool {
        let behavior = &context.config().behavior;
        if status.moving && status.location.distance_2d(&destination) <= behavior.move_refresh_distance {
            return false;
        }

        let mut waypoint = destination;
        if !context.geodata().can_move(&status.location, &destination) {
            let path = Pathfinder::new(context.geodata(), &context.config().pathfinder)
                .find_path(&status.location, &destination);
            if path.kind == PathKind::Degraded {
                tracing::debug!(
                    "{} found no path to {} after {} expansions",
                    self.name,
                    destination,
                    path.expanded
                );
            }
            waypoint = path.next_waypoint();
        }

        tracing::trace!("{} moving to {}", self.name, waypoint);
        context.actors().move_to(self.actor, waypoint);
        true
    }
}
