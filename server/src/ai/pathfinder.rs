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

//! Point-to-point path search
//!
//! A direct line is tried first. When it is blocked, a bounded A* search
//! runs over an 8-connected lattice anchored at the start point. Search
//! nodes live in an index-addressed arena that is dropped when the call
//! returns. The expansion cap guarantees termination; on exhaustion the
//! caller receives the direct pair and must tolerate it being unwalkable.

use crate::config::PathfinderConfig;
use crate::world::Geodata;
use autobot_common::Location;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// How a path was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Start and goal coincide
    Trivial,
    /// Straight, unobstructed line
    Direct,
    /// Lattice search reached the goal
    Searched,
    /// Search exhausted; direct pair returned unvalidated
    Degraded,
}

/// Result of a path request
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// Waypoints, never empty, always beginning at the requested start
    pub waypoints: Vec<Location>,
    pub kind: PathKind,
    /// Nodes expanded by the lattice search
    pub expanded: usize,
}

impl PathResult {
    /// First waypoint after the start, or the start itself for trivial paths
    pub fn next_waypoint(&self) -> Location {
        self.waypoints
            .get(1)
            .or_else(|| self.waypoints.first())
            .copied()
            .unwrap_or_default()
    }
}

type Cell = (i64, i64);

/// Arena entry for the lattice search
#[derive(Debug, Clone)]
struct SearchNode {
    location: Location,
    parent: Option<usize>,
    cost: f64,
    heuristic: f64,
}

impl SearchNode {
    fn total_cost(&self) -> f64 {
        self.cost + self.heuristic
    }
}

#[derive(Debug, PartialEq)]
struct OpenEntry {
    total_cost: f64,
    index: usize,
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on total cost, deeper nodes first on ties
        other
            .total_cost
            .total_cmp(&self.total_cost)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const NEIGHBORS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Stateless path search over a [`Geodata`] collaborator
pub struct Pathfinder<'a> {
    geodata: &'a dyn Geodata,
    config: &'a PathfinderConfig,
}

impl<'a> Pathfinder<'a> {
    /// Create a new pathfinder
    pub fn new(geodata: &'a dyn Geodata, config: &'a PathfinderConfig) -> Self {
        Self { geodata, config }
    }

    /// Find a walkable route from `start` to `goal`
    pub fn find_path(&self, start: &Location, goal: &Location) -> PathResult {
        if start.distance_2d(goal) <= f64::EPSILON {
            return PathResult {
                waypoints: vec![*start],
                kind: PathKind::Trivial,
                expanded: 0,
            };
        }

        if self.geodata.can_move(start, goal) {
            return PathResult {
                waypoints: vec![*start, *goal],
                kind: PathKind::Direct,
                expanded: 0,
            };
        }

        let (found, expanded) = self.search(start, goal);
        match found {
            Some(path) => {
                let adjusted = self.adjust_for_obstacles(&path);
                let optimized = self.optimize(&adjusted);
                tracing::trace!(
                    "Path {} -> {}: {} waypoints after {} expansions",
                    start,
                    goal,
                    optimized.len(),
                    expanded
                );
                PathResult {
                    waypoints: optimized,
                    kind: PathKind::Searched,
                    expanded,
                }
            }
            None => {
                tracing::debug!(
                    "No path {} -> {} within {} expansions, using direct line",
                    start,
                    goal,
                    expanded
                );
                PathResult {
                    waypoints: vec![*start, *goal],
                    kind: PathKind::Degraded,
                    expanded,
                }
            }
        }
    }

    /// Bounded A* over the lattice. Returns the raw path and the expansion count.
    fn search(&self, start: &Location, goal: &Location) -> (Option<Vec<Location>>, usize) {
        let step = self.config.step;
        let tolerance = self.config.goal_tolerance;
        let lattice = |cell: Cell, z: f64| -> Location {
            let x = start.x + cell.0 as f64 * step;
            let y = start.y + cell.1 as f64 * step;
            Location::new(x, y, self.geodata.height(x, y, z))
        };

        let mut nodes = vec![SearchNode {
            location: *start,
            parent: None,
            cost: 0.0,
            heuristic: start.distance_2d(goal),
        }];
        let mut cells: Vec<Cell> = vec![(0, 0)];
        let mut open = BinaryHeap::new();
        open.push(OpenEntry {
            total_cost: nodes[0].total_cost(),
            index: 0,
        });
        let mut best_cost: HashMap<Cell, f64> = HashMap::from([((0, 0), 0.0)]);
        let mut closed: HashSet<Cell> = HashSet::new();
        let mut expanded = 0;

        while let Some(OpenEntry { index, .. }) = open.pop() {
            let cell = cells[index];
            if closed.contains(&cell) {
                continue;
            }
            if expanded >= self.config.max_iterations {
                break;
            }
            closed.insert(cell);
            expanded += 1;

            let current = nodes[index].location;
            if current.distance_2d(goal) <= tolerance && self.geodata.can_move(&current, goal) {
                return (Some(Self::reconstruct(&nodes, index, goal)), expanded);
            }

            for (dx, dy) in NEIGHBORS {
                let next_cell = (cell.0 + dx, cell.1 + dy);
                if closed.contains(&next_cell) {
                    continue;
                }
                let neighbor = lattice(next_cell, current.z);
                if !self.geodata.can_move(&current, &neighbor) {
                    continue;
                }
                let cost = nodes[index].cost + current.distance_2d(&neighbor);
                if best_cost.get(&next_cell).is_some_and(|best| *best <= cost) {
                    continue;
                }
                best_cost.insert(next_cell, cost);
                let heuristic = neighbor.distance_2d(goal);
                nodes.push(SearchNode {
                    location: neighbor,
                    parent: Some(index),
                    cost,
                    heuristic,
                });
                cells.push(next_cell);
                open.push(OpenEntry {
                    total_cost: cost + heuristic,
                    index: nodes.len() - 1,
                });
            }
        }

        (None, expanded)
    }

    fn reconstruct(nodes: &[SearchNode], last: usize, goal: &Location) -> Vec<Location> {
        let mut path = Vec::new();
        let mut cursor = Some(last);
        while let Some(index) = cursor {
            path.push(nodes[index].location);
            cursor = nodes[index].parent;
        }
        path.reverse();
        if path.last().is_some_and(|end| end.distance_2d(goal) > f64::EPSILON) {
            path.push(*goal);
        }
        path
    }

    /// Insert a detour point wherever a segment is blocked.
    ///
    /// Probes the eight compass headings around the segment start at the
    /// configured detour distance and keeps the first probe that sees both
    /// ends. Segments with no usable detour are kept as they are.
    pub fn adjust_for_obstacles(&self, path: &[Location]) -> Vec<Location> {
        let Some(first) = path.first() else {
            return Vec::new();
        };
        let mut adjusted = vec![*first];
        for pair in path.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            if !self.geodata.can_move(from, to) {
                let detour = Location::compass().into_iter().find_map(|heading| {
                    let probe = from.polar(heading, self.config.detour_distance);
                    let probe = Location::new(
                        probe.x,
                        probe.y,
                        self.geodata.height(probe.x, probe.y, from.z),
                    );
                    (self.geodata.can_move(from, &probe) && self.geodata.can_move(&probe, to))
                        .then_some(probe)
                });
                if let Some(detour) = detour {
                    adjusted.push(detour);
                }
            }
            adjusted.push(*to);
        }
        adjusted
    }

    /// Greedily drop waypoints while a later one is directly reachable
    pub fn optimize(&self, path: &[Location]) -> Vec<Location> {
        if path.len() <= 2 {
            return path.to_vec();
        }
        let mut optimized = vec![path[0]];
        let mut i = 0;
        while i < path.len() - 1 {
            let reach = (i + 1..path.len())
                .rev()
                .find(|&j| self.geodata.can_move(&path[i], &path[j]))
                .unwrap_or(i + 1);
            optimized.push(path[reach]);
            i = reach;
        }
        optimized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::{Rect, SimWorld};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn config() -> PathfinderConfig {
        PathfinderConfig::default()
    }

    fn assert_walkable(world: &SimWorld, path: &[Location]) {
        for pair in path.windows(2) {
            assert!(
                world.can_move(&pair[0], &pair[1]),
                "segment {} -> {} is blocked",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_same_point_returns_start() {
        let world = SimWorld::new();
        let config = config();
        let finder = Pathfinder::new(&world, &config);
        let start = Location::new(5.0, 5.0, 0.0);
        let result = finder.find_path(&start, &start);
        assert_eq!(result.waypoints, vec![start]);
        assert_eq!(result.kind, PathKind::Trivial);
    }

    #[test]
    fn test_direct_line() {
        let world = SimWorld::new();
        let config = config();
        let finder = Pathfinder::new(&world, &config);
        let start = Location::default();
        let goal = Location::new(700.0, 200.0, 0.0);
        let result = finder.find_path(&start, &goal);
        assert_eq!(result.waypoints, vec![start, goal]);
        assert_eq!(result.kind, PathKind::Direct);
        assert_eq!(result.expanded, 0);
    }

    #[test]
    fn test_search_around_wall() {
        let world = SimWorld::new();
        world.add_obstacle(Rect::new(380.0, -150.0, 420.0, 150.0));
        let config = config();
        let finder = Pathfinder::new(&world, &config);
        let start = Location::default();
        let goal = Location::new(800.0, 0.0, 0.0);

        let result = finder.find_path(&start, &goal);
        assert_eq!(result.kind, PathKind::Searched);
        assert_eq!(result.waypoints.first(), Some(&start));
        assert_eq!(result.waypoints.last(), Some(&goal));
        assert!(result.waypoints.len() >= 3);
        assert!(result.expanded <= config.max_iterations);
        assert_walkable(&world, &result.waypoints);
    }

    #[test]
    fn test_enclosed_goal_degrades_to_direct_pair() {
        let world = SimWorld::new();
        world.add_obstacle(Rect::new(880.0, -120.0, 900.0, 120.0));
        world.add_obstacle(Rect::new(1100.0, -120.0, 1120.0, 120.0));
        world.add_obstacle(Rect::new(880.0, 100.0, 1120.0, 120.0));
        world.add_obstacle(Rect::new(880.0, -120.0, 1120.0, -100.0));
        let config = config();
        let finder = Pathfinder::new(&world, &config);
        let start = Location::default();
        let goal = Location::new(1000.0, 0.0, 0.0);

        let result = finder.find_path(&start, &goal);
        assert_eq!(result.kind, PathKind::Degraded);
        assert_eq!(result.waypoints, vec![start, goal]);
        assert!(result.expanded <= config.max_iterations);
    }

    #[test]
    fn test_expansions_never_exceed_cap() {
        let mut rng = StdRng::seed_from_u64(42);
        for cap in [1usize, 5, 17, 60] {
            for _ in 0..10 {
                let world = SimWorld::new();
                for _ in 0..rng.random_range(1..8) {
                    let x = rng.random_range(-500.0..500.0);
                    let y = rng.random_range(-500.0..500.0);
                    world.add_obstacle(Rect::new(x, y, x + rng.random_range(20.0..300.0), y + 40.0));
                }
                let config = PathfinderConfig {
                    max_iterations: cap,
                    ..PathfinderConfig::default()
                };
                let finder = Pathfinder::new(&world, &config);
                let start = Location::new(
                    rng.random_range(-800.0..-600.0),
                    rng.random_range(-100.0..100.0),
                    0.0,
                );
                let goal = Location::new(
                    rng.random_range(600.0..800.0),
                    rng.random_range(-100.0..100.0),
                    0.0,
                );
                let result = finder.find_path(&start, &goal);
                assert!(result.expanded <= cap);
                assert_eq!(result.waypoints[0], start);
                assert!(!result.waypoints.is_empty());
            }
        }
    }

    #[test]
    fn test_adjust_inserts_detour() {
        let world = SimWorld::new();
        world.add_obstacle(Rect::new(140.0, -60.0, 160.0, 60.0));
        let config = config();
        let finder = Pathfinder::new(&world, &config);
        let a = Location::default();
        let b = Location::new(300.0, 0.0, 0.0);

        let adjusted = finder.adjust_for_obstacles(&[a, b]);
        assert_eq!(adjusted.len(), 3);
        assert_eq!(adjusted[0], a);
        assert_eq!(adjusted[2], b);
        assert_walkable(&world, &adjusted);
    }

    #[test]
    fn test_optimize_skips_visible_waypoints() {
        let world = SimWorld::new();
        let config = config();
        let finder = Pathfinder::new(&world, &config);
        let path = vec![
            Location::new(0.0, 0.0, 0.0),
            Location::new(100.0, 0.0, 0.0),
            Location::new(200.0, 0.0, 0.0),
            Location::new(300.0, 0.0, 0.0),
        ];
        assert_eq!(finder.optimize(&path), vec![path[0], path[3]]);
    }
}
