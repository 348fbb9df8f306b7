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

//! Autonomous agent decision making
//!
//! Leaf modules are pure: the pathfinder, pattern generator and target
//! selector hold no shared state. The combat policy and the think cycle act
//! on the world only through the collaborators in [`crate::context::AiContext`].

pub mod acquisition;
pub mod agent;
pub mod behavior;
pub mod combat;
pub mod exclusion;
pub mod fsm;
pub mod pathfinder;
pub mod patterns;
pub mod personality;
pub mod selector;
pub mod tactics;

pub use agent::Agent;
pub use behavior::ThinkOutcome;
pub use combat::{CombatFailure, CombatOutcome, CombatPolicy, Combatant};
pub use fsm::{TransitionInput, next_state};
pub use pathfinder::{PathKind, PathResult, Pathfinder};
pub use patterns::{PatternKind, generate_pattern};
pub use personality::Personality;
pub use selector::{TargetCategory, TargetSelector, ThreatLevel};
pub use tactics::Tactic;
