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

//! Autobot Server
//!
//! Decision core for autonomous in-world agents:
//! - Per-agent behavior state machine and think cycle (`ai`)
//! - Agent registry with spawn, despawn and delayed actions (`registry`)
//! - Fixed-rate scheduler with per-agent fault isolation (`scheduler`)
//! - Predefined spawn groups (`spawn`)
//! - World collaborator traits plus a simulated world (`world`)

pub mod ai;
pub mod config;
pub mod context;
pub mod error;
pub mod persistence;
pub mod registry;
pub mod scheduler;
pub mod spawn;
pub mod world;
