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

//! Path search and exploration properties on the demo map

use autobot_common::Location;
use autobot_server::ai::{PathKind, PatternKind, Pathfinder, generate_pattern};
use autobot_server::config::{DemoConfig, PathfinderConfig};
use autobot_server::world::Geodata;
use autobot_server::world::sim::SimWorld;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn demo_world(seed: u64) -> SimWorld {
    let world = SimWorld::new();
    let config = DemoConfig {
        monsters: 10,
        ..DemoConfig::default()
    };
    world.populate(&config, &mut StdRng::seed_from_u64(seed));
    world
}

fn random_point<R: Rng>(rng: &mut R, extent: f64) -> Location {
    Location::new(rng.random_range(-extent..extent), rng.random_range(-extent..extent), 0.0)
}

#[test]
fn test_paths_on_demo_map_hold_their_guarantees() {
    let world = demo_world(5);
    let config = PathfinderConfig {
        max_iterations: 400,
        ..PathfinderConfig::default()
    };
    let finder = Pathfinder::new(&world, &config);
    let mut rng = StdRng::seed_from_u64(99);
    let mut searched = 0;

    for _ in 0..200 {
        let start = random_point(&mut rng, 2500.0);
        let goal = random_point(&mut rng, 2500.0);
        let result = finder.find_path(&start, &goal);

        assert!(!result.waypoints.is_empty());
        assert_eq!(result.waypoints[0], start);
        assert!(result.expanded <= config.max_iterations);
        match result.kind {
            PathKind::Trivial => assert_eq!(result.waypoints.len(), 1),
            PathKind::Direct => {
                assert_eq!(result.waypoints, vec![start, goal]);
                assert!(world.can_move(&start, &goal));
            }
            PathKind::Searched => {
                searched += 1;
                assert_eq!(result.waypoints.last(), Some(&goal));
                for pair in result.waypoints.windows(2) {
                    assert!(world.can_move(&pair[0], &pair[1]), "{} -> {} is blocked", pair[0], pair[1]);
                }
            }
            PathKind::Degraded => assert_eq!(result.waypoints, vec![start, goal]),
        }
    }
    // The demo walls are long enough that some random pairs need a search
    assert!(searched > 0);
}

#[test]
fn test_next_waypoint_is_reachable() {
    let world = demo_world(8);
    let config = PathfinderConfig::default();
    let finder = Pathfinder::new(&world, &config);

    // Straight through the western wall of the demo map
    let start = Location::new(-1000.0, 400.0, 0.0);
    let goal = Location::new(-1000.0, 900.0, 0.0);
    assert!(!world.can_move(&start, &goal));

    let result = finder.find_path(&start, &goal);
    let next = result.next_waypoint();
    if result.kind == PathKind::Searched {
        assert!(world.can_move(&start, &next));
    } else {
        assert_eq!(next, goal);
    }
}

#[test]
fn test_patterns_respect_radius() {
    let world = demo_world(2);
    let mut rng = StdRng::seed_from_u64(17);
    let center = Location::new(-400.0, -1200.0, 0.0);
    let radius = 600.0;

    for kind in [
        PatternKind::Zigzag,
        PatternKind::Circular,
        PatternKind::Random,
        PatternKind::Patrol,
        PatternKind::Spiral,
    ] {
        // Zigzag legs grow past the radius after five steps
        let points = generate_pattern(&world, &center, radius, 5, kind, &mut rng);
        assert_eq!(points.len(), 5, "{:?} produced the wrong number of points", kind);
        for point in &points {
            assert!(
                point.distance_2d(&center) <= radius + 1e-6,
                "{:?} point {} escapes the radius",
                kind,
                point
            );
        }
    }
    assert_eq!(
        generate_pattern(&world, &center, radius, 12, PatternKind::Direct, &mut rng),
        vec![center]
    );
}
