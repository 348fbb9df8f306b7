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

//! Autobot Common Types
//!
//! This crate defines the shared, serializable types exchanged between the
//! decision core and the world it drives:
//! - Geometry (`Location`)
//! - Read-only entity snapshots (`EntityView`, `EntityClass`, `ZoneKind`)
//! - Agent descriptors (`AgentClass`, `AgentState`, `AgentSnapshot`)

pub mod agent;
pub mod entity;
pub mod geometry;

pub use agent::{AgentClass, AgentSnapshot, AgentState, Archetype, Race};
pub use entity::{EntityClass, EntityFilter, EntityId, EntityView, ZoneKind};
pub use geometry::Location;
