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

//! Short-term memory of recently considered targets

use autobot_common::EntityId;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

/// Target ids an agent has recently picked or rejected.
///
/// The whole set is cleared once per window so previously rejected targets
/// become selectable again.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    ids: HashSet<EntityId>,
    window: Duration,
    last_purge: Instant,
}

impl ExclusionSet {
    /// Create a new empty set whose first window starts at `now`
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            ids: HashSet::new(),
            window,
            last_purge: now,
        }
    }

    /// Clear the set if a full window has passed since the last purge
    pub fn purge_if_due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_purge) < self.window {
            return false;
        }
        if !self.ids.is_empty() {
            tracing::trace!("Purging {} excluded targets", self.ids.len());
        }
        self.ids.clear();
        self.last_purge = now;
        true
    }

    pub fn insert(&mut self, id: EntityId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purge_only_after_window() {
        let start = Instant::now();
        let mut set = ExclusionSet::new(Duration::from_secs(45), start);
        set.insert(EntityId(1));

        assert!(!set.purge_if_due(start + Duration::from_secs(44)));
        assert!(set.contains(EntityId(1)));

        assert!(set.purge_if_due(start + Duration::from_secs(45)));
        assert!(set.is_empty());

        // The next window restarts from the purge
        set.insert(EntityId(2));
        assert!(!set.purge_if_due(start + Duration::from_secs(60)));
        assert_eq!(set.len(), 1);
    }
}
