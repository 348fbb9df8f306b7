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

use crate::config::AiConfig;
use crate::persistence::PersistenceWriter;
use crate::world::{ActorModel, Geodata, SpatialQuery};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Services shared by the scheduler, the registry and every think cycle
///
/// The context replaces global manager lookups: collaborators are injected
/// once at startup, which lets tests substitute the world and the
/// persistence backend.
///
/// # Components
///
/// - **Spatial query**: nearby entities and zone lookups
/// - **Geodata**: navigability, line of sight, terrain height
/// - **Actor model**: agent characters and their intent API
/// - **Persistence writer**: fire-and-forget spawn/despawn/death records
/// - **Configuration**: immutable tuning shared by all agents
/// - **Global switch**: pauses all AI processing without despawning
pub struct AiContext {
    spatial: Arc<dyn SpatialQuery>,
    geodata: Arc<dyn Geodata>,
    actors: Arc<dyn ActorModel>,
    persistence: PersistenceWriter,
    config: Arc<AiConfig>,
    enabled: AtomicBool,
}

impl AiContext {
    /// Create a new context backed by a single world implementing every collaborator
    pub fn new<W>(world: Arc<W>, config: AiConfig, persistence: PersistenceWriter) -> Self
    where
        W: SpatialQuery + Geodata + ActorModel + 'static,
    {
        Self::from_parts(world.clone(), world.clone(), world, config, persistence)
    }

    /// Create a new context from individual collaborators
    pub fn from_parts(
        spatial: Arc<dyn SpatialQuery>,
        geodata: Arc<dyn Geodata>,
        actors: Arc<dyn ActorModel>,
        config: AiConfig,
        persistence: PersistenceWriter,
    ) -> Self {
        Self {
            spatial,
            geodata,
            actors,
            persistence,
            config: Arc::new(config),
            enabled: AtomicBool::new(true),
        }
    }

    // ============================================================================
    // Collaborators
    // ============================================================================

    pub fn spatial(&self) -> &dyn SpatialQuery {
        self.spatial.as_ref()
    }

    pub fn geodata(&self) -> &dyn Geodata {
        self.geodata.as_ref()
    }

    pub fn actors(&self) -> &dyn ActorModel {
        self.actors.as_ref()
    }

    pub fn persistence(&self) -> &PersistenceWriter {
        &self.persistence
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    // ============================================================================
    // Administrative Toggles
    // ============================================================================

    /// Enable or disable AI processing for every agent
    pub fn set_ai_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            tracing::info!(
                "Autobot AI processing {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
    }

    /// Whether AI processing is enabled
    pub fn ai_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}
