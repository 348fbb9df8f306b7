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

use autobot_server::config::{Arguments, Configuration};
use autobot_server::context::AiContext;
use autobot_server::persistence::{JournalPersistence, NullPersistence, Persistence, PersistenceWriter};
use autobot_server::registry::AgentRegistry;
use autobot_server::scheduler::Scheduler;
use autobot_server::spawn::{SpawnGroup, SpawnGroups};
use autobot_server::world::sim::SimWorld;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    // Load environment variables from .env file if specified
    if let Some(ref env_file) = arguments.env_file {
        if std::path::Path::new(env_file).exists() {
            tracing::debug!("Loading environment variables from file: {}", env_file);
            dotenv::from_filename(env_file).ok();
        }
    } else {
        tracing::debug!("Loading environment variables from default file");
        dotenv::dotenv().ok();
    }

    // Load configuration from a file with environment variable substitution
    let config = Configuration::load(&arguments.config_file)?;
    tracing::debug!("Configuration loaded: {:?}", config);
    tracing::info!("Starting Autobot Server...");

    // Build the simulated world
    let world = Arc::new(SimWorld::new());
    world.populate(&config.demo, &mut rand::rng());

    // Start the persistence writer
    let journal: &str = &config.persistence.journal_path;
    let backend: Arc<dyn Persistence> = if journal.trim().is_empty() {
        tracing::info!("Persistence journal disabled");
        Arc::new(NullPersistence)
    } else {
        tracing::info!("Writing persistence journal to {}", journal);
        Arc::new(JournalPersistence::new(journal.trim()))
    };
    let (writer, writer_task) = PersistenceWriter::start(backend);

    let context = Arc::new(AiContext::new(world.clone(), config.ai.clone(), writer));
    let registry = Arc::new(AgentRegistry::new(context));
    let groups = SpawnGroups::new(registry.clone());

    for entry in &config.demo.groups {
        let spawned = entry
            .group
            .parse::<SpawnGroup>()
            .and_then(|group| groups.spawn_group(group, entry.count));
        if let Err(e) = spawned {
            tracing::warn!("Unable to spawn group {}: {}", entry.group, e);
        }
    }
    tracing::info!("{} agents online", registry.len());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Advance the simulated world at a fixed step
    let step = Duration::from_millis(config.demo.step_ms.max(1));
    let simulation = {
        let world = world.clone();
        let mut shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(step);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => world.step(step),
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    };

    let scheduler = Arc::new(Scheduler::new(registry.clone())).start(shutdown_rx);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    shutdown_tx.send(true).ok();
    scheduler.await?;
    simulation.await?;

    let statistics = registry.statistics();
    tracing::info!(
        "Final tally: {} agents, {} wins, {} losses",
        statistics.total,
        statistics.wins,
        statistics.losses
    );
    groups.despawn_all_groups();
    registry.despawn_all();
    drop(groups);
    drop(registry);

    // Pending timers may still hold the writer; do not wait on them forever
    match tokio::time::timeout(Duration::from_secs(5), writer_task).await {
        Ok(written) => tracing::info!("Persisted {} records", written?),
        Err(_) => tracing::warn!("Persistence writer did not drain in time"),
    }
    tracing::info!("Autobot Server stopped");
    Ok(())
}
