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

//! Personality traits rolled once per agent

use crate::ai::patterns::PatternKind;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Behavioral traits on a 0-100 scale.
///
/// Traits are fixed when the agent is created; there are no setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    aggression: u8,
    sociability: u8,
    group_hunter: bool,
}

impl Personality {
    /// Create a personality from explicit traits, clamped to 0-100
    pub fn new(aggression: u8, sociability: u8, group_hunter: bool) -> Self {
        Self {
            aggression: aggression.min(100),
            sociability: sociability.min(100),
            group_hunter,
        }
    }

    /// Roll a personality: aggression 20-79, sociability 10-59
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            aggression: rng.random_range(20..80),
            sociability: rng.random_range(10..60),
            group_hunter: rng.random_bool(0.5),
        }
    }

    pub fn aggression(&self) -> u8 {
        self.aggression
    }

    pub fn sociability(&self) -> u8 {
        self.sociability
    }

    pub fn group_hunter(&self) -> bool {
        self.group_hunter
    }

    /// Percent chance per think to start exploring
    pub fn explore_chance(&self) -> u32 {
        (self.aggression as u32 + self.sociability as u32) / 2
    }

    /// Exploration pattern this personality prefers
    pub fn exploration_pattern(&self) -> PatternKind {
        if self.aggression > 60 {
            PatternKind::Direct
        } else if self.sociability > 50 {
            PatternKind::Circular
        } else if self.group_hunter {
            PatternKind::Patrol
        } else {
            PatternKind::Random
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_random_within_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let p = Personality::random(&mut rng);
            assert!((20..80).contains(&p.aggression()));
            assert!((10..60).contains(&p.sociability()));
        }
    }

    #[test]
    fn test_exploration_pattern_priority() {
        assert_eq!(Personality::new(70, 90, true).exploration_pattern(), PatternKind::Direct);
        assert_eq!(Personality::new(40, 55, true).exploration_pattern(), PatternKind::Circular);
        assert_eq!(Personality::new(40, 20, true).exploration_pattern(), PatternKind::Patrol);
        assert_eq!(Personality::new(40, 20, false).exploration_pattern(), PatternKind::Random);
    }

    #[test]
    fn test_new_clamps() {
        let p = Personality::new(250, 101, false);
        assert_eq!(p.aggression(), 100);
        assert_eq!(p.sociability(), 100);
        assert_eq!(p.explore_chance(), 100);
    }
}
