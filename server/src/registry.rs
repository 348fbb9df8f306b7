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

//! Agent registry
//!
//! The registry owns every live agent. Entries are keyed by name in a
//! concurrent map so administrative spawn and despawn can race the
//! scheduler's iteration safely. Removing an entry is the only way to
//! cancel an agent: the scheduler stops visiting it and pending timers find
//! their generation id gone.

use crate::ai::{Agent, Personality};
use crate::context::AiContext;
use crate::error::{AiError, AiResult};
use crate::persistence::{DespawnRecord, Record, SpawnRecord};
use crate::world::ActorSpawn;
use autobot_common::{AgentClass, AgentSnapshot, AgentState, EntityId, Location};
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// A registered agent behind its think lock
#[derive(Debug)]
pub struct AgentHandle {
    id: Uuid,
    name: String,
    actor: EntityId,
    agent: Mutex<Agent>,
}

impl AgentHandle {
    fn new(agent: Agent) -> Self {
        Self {
            id: agent.id(),
            name: agent.name().to_string(),
            actor: agent.actor(),
            agent: Mutex::new(agent),
        }
    }

    /// Generation id of this registration
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actor(&self) -> EntityId {
        self.actor
    }

    /// Lock the agent, waiting for a think in progress to finish
    pub fn lock(&self) -> MutexGuard<'_, Agent> {
        self.agent.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Lock the agent unless another think holds it
    pub fn try_lock(&self) -> Option<MutexGuard<'_, Agent>> {
        match self.agent.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        self.lock().snapshot()
    }
}

/// Aggregate counts over all registered agents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryStatistics {
    pub total: usize,
    pub online: usize,
    pub dead: usize,
    pub auto_farming: usize,
    pub wins: u64,
    pub losses: u64,
    /// Agents per state, in [`AgentState::ALL`] order
    pub by_state: Vec<(AgentState, usize)>,
}

impl RegistryStatistics {
    pub fn in_state(&self, state: AgentState) -> usize {
        self.by_state
            .iter()
            .find(|(s, _)| *s == state)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

/// Lifecycle and enumeration of all agents
pub struct AgentRegistry {
    context: Arc<AiContext>,
    agents: DashMap<String, Arc<AgentHandle>>,
}

impl AgentRegistry {
    /// Create a new empty registry
    pub fn new(context: Arc<AiContext>) -> Self {
        Self {
            context,
            agents: DashMap::new(),
        }
    }

    pub fn context(&self) -> &Arc<AiContext> {
        &self.context
    }

    // ============================================================================
    // Lifecycle
    // ============================================================================

    /// Spawn a new agent
    ///
    /// # Arguments
    /// * `name` - Unique agent name
    /// * `class` - Archetype and race
    /// * `level` - Character level within the configured range
    /// * `location` - Spawn point, which also becomes the agent's home
    ///
    /// # Returns
    /// * `Ok(Uuid)` - Generation id of the new registration
    /// * `Err(AiError)` - The name is taken or invalid, the level is out of range or the actor could not be placed
    pub fn spawn(&self, name: &str, class: AgentClass, level: u32, location: Location) -> AiResult<Uuid> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AiError::EmptyName);
        }
        let config = self.context.config();
        if level < config.min_level || level > config.max_level {
            return Err(AiError::InvalidLevel {
                name: name.to_string(),
                level,
                min: config.min_level,
                max: config.max_level,
            });
        }

        if self.agents.contains_key(name) {
            return Err(AiError::DuplicateName(name.to_string()));
        }

        // The actor model may read the registry, so place the actor before taking the entry
        let actor = self.context.actors().spawn_actor(&ActorSpawn {
            name: name.to_string(),
            class,
            level,
            location,
        })?;
        let personality = Personality::random(&mut rand::rng());
        let agent = Agent::new(name, actor, class, level, location, personality, config, Instant::now());
        let snapshot = agent.snapshot();
        match self.agents.entry(name.to_string()) {
            Entry::Occupied(_) => {
                tracing::debug!("{} was registered while its actor spawned, removing {}", name, actor);
                self.context.actors().despawn_actor(actor);
                return Err(AiError::DuplicateName(name.to_string()));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(AgentHandle::new(agent)));
            }
        }
        tracing::info!(
            "Spawned {} ({}, level {}) at {} with aggression {}, sociability {}{}",
            name,
            class,
            level,
            location,
            personality.aggression(),
            personality.sociability(),
            if personality.group_hunter() { ", group hunter" } else { "" }
        );

        metrics::gauge!("autobot_active").set(self.agents.len() as f64);
        self.context.persistence().submit(Record::Spawn(SpawnRecord {
            agent_id: snapshot.id,
            name: snapshot.name,
            class,
            level,
            location,
            at: Utc::now(),
        }));
        Ok(snapshot.id)
    }

    /// Spawn a new agent, reporting only success
    pub fn create(&self, name: &str, class: AgentClass, level: u32, location: Location) -> bool {
        match self.spawn(name, class, level, location) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Unable to create agent {}: {}", name, e);
                false
            }
        }
    }

    /// Despawn an agent by name
    pub fn despawn(&self, name: &str) -> bool {
        match self.agents.remove(name) {
            Some((_, handle)) => {
                self.retire(&handle);
                true
            }
            None => false,
        }
    }

    /// Despawn an agent only if `name` still refers to generation `id`
    pub fn despawn_generation(&self, name: &str, id: Uuid) -> bool {
        match self.agents.remove_if(name, |_, handle| handle.id() == id) {
            Some((_, handle)) => {
                self.retire(&handle);
                true
            }
            None => false,
        }
    }

    /// Despawn every agent, returning how many were removed
    pub fn despawn_all(&self) -> usize {
        let names: Vec<String> = self.agents.iter().map(|entry| entry.key().clone()).collect();
        let count = names.iter().filter(|name| self.despawn(name)).count();
        tracing::info!("Despawned {} agents", count);
        count
    }

    fn retire(&self, handle: &AgentHandle) {
        let (wins, losses) = {
            let mut agent = handle.lock();
            agent.set_online(false);
            (agent.wins(), agent.losses())
        };
        if !self.context.actors().despawn_actor(handle.actor()) {
            tracing::debug!("Actor {} of {} was already gone", handle.actor(), handle.name());
        }
        metrics::gauge!("autobot_active").set(self.agents.len() as f64);
        self.context.persistence().submit(Record::Despawn(DespawnRecord {
            agent_id: handle.id(),
            name: handle.name().to_string(),
            wins,
            losses,
            at: Utc::now(),
        }));
        tracing::info!("Despawned {} ({} wins, {} losses)", handle.name(), wins, losses);
    }

    // ============================================================================
    // Enumeration
    // ============================================================================

    pub fn get(&self, name: &str) -> Option<Arc<AgentHandle>> {
        self.agents.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Point-in-time copy of all handles, safe to iterate while the map changes
    pub fn handles(&self) -> Vec<Arc<AgentHandle>> {
        self.agents.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Snapshots of all agents, sorted by name
    pub fn list_active(&self) -> Vec<AgentSnapshot> {
        let mut snapshots: Vec<AgentSnapshot> = self.handles().iter().map(|h| h.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn statistics(&self) -> RegistryStatistics {
        let mut stats = RegistryStatistics {
            by_state: AgentState::ALL.iter().map(|s| (*s, 0)).collect(),
            ..Default::default()
        };
        for handle in self.handles() {
            let agent = handle.lock();
            stats.total += 1;
            if agent.is_online() {
                stats.online += 1;
            }
            if agent.is_dead() {
                stats.dead += 1;
            }
            if agent.auto_farm() {
                stats.auto_farming += 1;
            }
            stats.wins += agent.wins() as u64;
            stats.losses += agent.losses() as u64;
            if let Some(entry) = stats.by_state.iter_mut().find(|(s, _)| *s == agent.state()) {
                entry.1 += 1;
            }
        }
        stats
    }

    // ============================================================================
    // Administrative Toggles
    // ============================================================================

    pub fn set_ai_enabled(&self, enabled: bool) {
        self.context.set_ai_enabled(enabled);
    }

    pub fn ai_enabled(&self) -> bool {
        self.context.ai_enabled()
    }

    pub fn set_auto_farm(&self, name: &str, enabled: bool) -> AiResult<()> {
        self.update(name, |agent| agent.set_auto_farm(enabled))
    }

    pub fn set_auto_farm_radius(&self, name: &str, radius: f64) -> AiResult<()> {
        self.update(name, |agent| agent.set_auto_farm_radius(radius))
    }

    pub fn set_home(&self, name: &str, home: Location) -> AiResult<()> {
        self.update(name, |agent| agent.set_home(home))
    }

    fn update(&self, name: &str, f: impl FnOnce(&mut Agent)) -> AiResult<()> {
        let handle = self.get(name).ok_or_else(|| AiError::NotFound(name.to_string()))?;
        f(&mut handle.lock());
        Ok(())
    }

    // ============================================================================
    // Timers
    // ============================================================================

    /// Run `f` on the agent if `name` still refers to generation `id`
    pub fn with_agent<T>(&self, name: &str, id: Uuid, f: impl FnOnce(&mut Agent) -> T) -> Option<T> {
        let handle = self.get(name).filter(|h| h.id() == id)?;
        let mut agent = handle.lock();
        Some(f(&mut agent))
    }

    /// Run `f` after `delay`, unless the agent was despawned in the meantime.
    ///
    /// The returned task resolves to whether `f` ran.
    pub fn schedule<F>(self: &Arc<Self>, name: &str, id: Uuid, delay: Duration, f: F) -> JoinHandle<bool>
    where
        F: FnOnce(&AiContext, &mut Agent) + Send + 'static,
    {
        let registry = Arc::clone(self);
        let name = name.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let context = Arc::clone(&registry.context);
            let ran = registry
                .with_agent(&name, id, |agent| f(&context, agent))
                .is_some();
            if !ran {
                tracing::trace!("Timer for {} skipped, agent is gone", name);
            }
            ran
        })
    }

    /// Stand the agent up again after a cosmetic sit
    pub fn schedule_stand_up(self: &Arc<Self>, name: &str, id: Uuid) -> JoinHandle<bool> {
        let delay = self.context.config().behavior.stand_up_delay();
        self.schedule(name, id, delay, |context, agent| agent.stand_up(context))
    }

    /// Despawn a dead agent after the configured delay
    pub fn schedule_despawn(self: &Arc<Self>, name: &str, id: Uuid) -> JoinHandle<bool> {
        let registry = Arc::clone(self);
        let name = name.to_string();
        let delay = self.context.config().behavior.death_despawn_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let removed = registry.despawn_generation(&name, id);
            if !removed {
                tracing::trace!("Despawn timer for {} skipped, agent is gone", name);
            }
            removed
        })
    }
}
