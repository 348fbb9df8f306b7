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

//! Spawn, despawn and death records
//!
//! The decision loop never waits on storage. Records are pushed onto an
//! unbounded channel owned by a [`PersistenceWriter`]; a background task
//! drains the channel into a [`Persistence`] backend and logs failures.

use async_trait::async_trait;
use autobot_common::{AgentClass, EntityClass, Location};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Errors that can occur while writing records.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing store could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The record could not be encoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRecord {
    pub agent_id: Uuid,
    pub name: String,
    pub class: AgentClass,
    pub level: u32,
    pub location: Location,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DespawnRecord {
    pub agent_id: Uuid,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub at: DateTime<Utc>,
}

/// Hall-of-death entry written when an agent's actor dies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub agent_id: Uuid,
    pub name: String,
    pub class: AgentClass,
    pub level: u32,
    pub killer: Option<String>,
    pub killer_class: Option<EntityClass>,
    pub location: Location,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Spawn(SpawnRecord),
    Despawn(DespawnRecord),
    Death(DeathRecord),
}

impl Record {
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Spawn(_) => "spawn",
            Record::Despawn(_) => "despawn",
            Record::Death(_) => "death",
        }
    }
}

/// Storage backend for agent records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn record_spawn(&self, record: &SpawnRecord) -> Result<(), PersistenceError>;

    async fn record_despawn(&self, record: &DespawnRecord) -> Result<(), PersistenceError>;

    async fn record_death(&self, record: &DeathRecord) -> Result<(), PersistenceError>;
}

/// Backend that discards every record
#[derive(Debug, Default)]
pub struct NullPersistence;

#[async_trait]
impl Persistence for NullPersistence {
    async fn record_spawn(&self, _record: &SpawnRecord) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn record_despawn(&self, _record: &DespawnRecord) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn record_death(&self, _record: &DeathRecord) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Backend appending one JSON object per line to a file
#[derive(Debug)]
pub struct JournalPersistence {
    path: PathBuf,
}

impl JournalPersistence {
    /// Create a new journal writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn append(&self, record: Record) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Persistence for JournalPersistence {
    async fn record_spawn(&self, record: &SpawnRecord) -> Result<(), PersistenceError> {
        self.append(Record::Spawn(record.clone())).await
    }

    async fn record_despawn(&self, record: &DespawnRecord) -> Result<(), PersistenceError> {
        self.append(Record::Despawn(record.clone())).await
    }

    async fn record_death(&self, record: &DeathRecord) -> Result<(), PersistenceError> {
        self.append(Record::Death(record.clone())).await
    }
}

/// Non-blocking handle for submitting records
#[derive(Debug, Clone)]
pub struct PersistenceWriter {
    sender: mpsc::UnboundedSender<Record>,
}

impl PersistenceWriter {
    /// Start the writer task draining into `backend`.
    ///
    /// The task ends once every writer handle has been dropped and returns
    /// the number of records it stored successfully.
    pub fn start(backend: Arc<dyn Persistence>) -> (Self, JoinHandle<usize>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Record>();

        let handle = tokio::spawn(async move {
            let mut written = 0usize;
            while let Some(record) = receiver.recv().await {
                let result = match &record {
                    Record::Spawn(r) => backend.record_spawn(r).await,
                    Record::Despawn(r) => backend.record_despawn(r).await,
                    Record::Death(r) => backend.record_death(r).await,
                };
                match result {
                    Ok(()) => written += 1,
                    Err(e) => tracing::error!("Failed to persist {} record: {}", record.kind(), e),
                }
            }
            tracing::debug!("Persistence writer stopped after {} records", written);
            written
        });

        (Self { sender }, handle)
    }

    /// A writer paired with a raw receiver, for inspecting submitted records
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Record>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// A writer whose records go nowhere
    pub fn disabled() -> Self {
        let (sender, _) = mpsc::unbounded_channel();
        Self { sender }
    }

    /// Queue a record without waiting
    pub fn submit(&self, record: Record) {
        if let Err(e) = self.sender.send(record) {
            tracing::trace!("Dropping {} record, writer is closed", e.0.kind());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_record(name: &str) -> SpawnRecord {
        SpawnRecord {
            agent_id: Uuid::new_v4(),
            name: name.to_string(),
            class: AgentClass::new(autobot_common::Archetype::Melee, autobot_common::Race::Human),
            level: 20,
            location: Location::new(1.0, 2.0, 3.0),
            at: Utc::now(),
        }
    }

    #[test]
    fn test_record_json_is_tagged() {
        let json = serde_json::to_string(&Record::Spawn(spawn_record("Tagged"))).unwrap();
        assert!(json.contains("\"kind\":\"spawn\""));
        assert!(json.contains("\"name\":\"Tagged\""));
    }

    #[test]
    fn test_disabled_writer_does_not_panic() {
        let writer = PersistenceWriter::disabled();
        writer.submit(Record::Spawn(spawn_record("Nobody")));
    }

    #[tokio::test]
    async fn test_writer_dispatches_to_backend() {
        let mut backend = MockPersistence::new();
        backend
            .expect_record_spawn()
            .withf(|r: &SpawnRecord| r.name == "Alpha")
            .times(1)
            .returning(|_| Ok(()));
        backend
            .expect_record_despawn()
            .times(1)
            .returning(|_| Err(PersistenceError::Io(std::io::Error::other("disk full"))));

        let (writer, handle) = PersistenceWriter::start(Arc::new(backend));
        let spawn = spawn_record("Alpha");
        writer.submit(Record::Spawn(spawn.clone()));
        writer.submit(Record::Despawn(DespawnRecord {
            agent_id: spawn.agent_id,
            name: spawn.name.clone(),
            wins: 1,
            losses: 0,
            at: Utc::now(),
        }));
        drop(writer);

        let written = handle.await.unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn test_journal_appends_lines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("journal.jsonl");
        let journal = JournalPersistence::new(&path);

        journal.record_spawn(&spawn_record("One")).await.unwrap();
        journal.record_spawn(&spawn_record("Two")).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: Record = serde_json::from_str(lines[1]).unwrap();
        assert!(matches!(second, Record::Spawn(ref r) if r.name == "Two"));
    }
}
