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

//! Errors surfaced by the agent registry and think cycle

use crate::world::WorldError;
use autobot_common::EntityId;
use thiserror::Error;

/// Errors that can occur while managing or running agents.
#[derive(Debug, Error)]
pub enum AiError {
    /// Agent names must contain at least one visible character.
    #[error("Agent name must not be empty")]
    EmptyName,

    /// An agent with this name is already registered.
    #[error("Agent already exists: {0}")]
    DuplicateName(String),

    /// The requested level is outside the allowed range.
    #[error("Invalid level {level} for agent {name} (expected {min}..={max})")]
    InvalidLevel {
        name: String,
        level: u32,
        min: u32,
        max: u32,
    },

    /// No agent with this name is registered.
    #[error("Agent not found: {0}")]
    NotFound(String),

    /// The agent's actor vanished from the world.
    #[error("Actor {actor} of agent {name} is missing from the world")]
    ActorMissing { name: String, actor: EntityId },

    /// Unknown spawn group.
    #[error("Unknown spawn group: {0}")]
    UnknownGroup(String),

    /// A world collaborator failed.
    #[error("World error: {0}")]
    World(#[from] WorldError),
}

pub type AiResult<T> = Result<T, AiError>;
