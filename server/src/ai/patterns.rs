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

//! Procedural waypoint patterns for exploration and patrols

use crate::world::Geodata;
use autobot_common::Location;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    /// The center itself
    Direct,
    /// Alternating ±45° legs moving outward
    Zigzag,
    /// Evenly spaced points on the circle
    Circular,
    /// Uniformly random points inside the circle
    Random,
    /// The four cardinal points, repeated
    Patrol,
    /// Eight points per turn, widening towards the radius
    Spiral,
}

/// Generate `steps` waypoints around `center`.
///
/// Points are dropped onto the walkable surface with a height query but are
/// not checked for navigability; callers filter them.
pub fn generate_pattern<R: Rng + ?Sized>(
    geodata: &dyn Geodata,
    center: &Location,
    radius: f64,
    steps: usize,
    kind: PatternKind,
    rng: &mut R,
) -> Vec<Location> {
    let radius = radius.max(0.0);
    let ground = |point: Location| {
        Location::new(point.x, point.y, geodata.height(point.x, point.y, center.z))
    };

    if kind == PatternKind::Direct {
        return vec![ground(*center)];
    }

    let mut points = Vec::with_capacity(steps);
    match kind {
        PatternKind::Direct => {}
        PatternKind::Zigzag => {
            let heading = rng.random_range(0.0..TAU);
            for i in 0..steps {
                let swing = if i % 2 == 0 { FRAC_PI_4 } else { -FRAC_PI_4 };
                let distance = radius * (0.5 + 0.1 * i as f64);
                points.push(ground(center.polar(heading + swing, distance)));
            }
        }
        PatternKind::Circular => {
            for i in 0..steps {
                let angle = TAU * i as f64 / steps as f64;
                points.push(ground(center.polar(angle, radius)));
            }
        }
        PatternKind::Random => {
            for _ in 0..steps {
                let angle = rng.random_range(0.0..TAU);
                let distance = rng.random::<f64>() * radius;
                points.push(ground(center.polar(angle, distance)));
            }
        }
        PatternKind::Patrol => {
            for i in 0..steps {
                let angle = FRAC_PI_2 * (i % 4) as f64;
                points.push(ground(center.polar(angle, radius)));
            }
        }
        PatternKind::Spiral => {
            for i in 0..steps {
                let angle = TAU * i as f64 / 8.0;
                let distance = radius * i as f64 / steps as f64;
                points.push(ground(center.polar(angle, distance)));
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Hills;

    impl Geodata for Hills {
        fn can_move(&self, _from: &Location, _to: &Location) -> bool {
            true
        }

        fn can_see(&self, _from: &Location, _to: &Location) -> bool {
            true
        }

        fn height(&self, _x: f64, _y: f64, _z: f64) -> f64 {
            42.0
        }
    }

    #[test]
    fn test_direct_is_center() {
        let mut rng = StdRng::seed_from_u64(1);
        let center = Location::new(10.0, 20.0, 0.0);
        let points = generate_pattern(&Hills, &center, 500.0, 5, PatternKind::Direct, &mut rng);
        assert_eq!(points, vec![Location::new(10.0, 20.0, 42.0)]);
    }

    #[test]
    fn test_circular_points_on_radius() {
        let mut rng = StdRng::seed_from_u64(1);
        let center = Location::default();
        let points = generate_pattern(&Hills, &center, 400.0, 6, PatternKind::Circular, &mut rng);
        assert_eq!(points.len(), 6);
        for point in &points {
            assert!((point.distance_2d(&center) - 400.0).abs() < 1e-6);
            assert_eq!(point.z, 42.0);
        }
    }

    #[test]
    fn test_patrol_cycles_four_corners() {
        let mut rng = StdRng::seed_from_u64(1);
        let center = Location::default();
        let points = generate_pattern(&Hills, &center, 300.0, 9, PatternKind::Patrol, &mut rng);
        assert_eq!(points.len(), 9);
        assert_eq!(points[0], points[4]);
        assert_eq!(points[1], points[5]);
        assert_eq!(points[0], points[8]);
    }

    #[test]
    fn test_spiral_widens() {
        let mut rng = StdRng::seed_from_u64(1);
        let center = Location::default();
        let points = generate_pattern(&Hills, &center, 500.0, 5, PatternKind::Spiral, &mut rng);
        let distances: Vec<f64> = points.iter().map(|p| p.distance_2d(&center)).collect();
        assert!(distances.windows(2).all(|w| w[0] < w[1]));
        assert!(distances[0].abs() < 1e-9);
    }

    #[test]
    fn test_random_and_zigzag_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        let center = Location::default();
        for kind in [PatternKind::Random, PatternKind::Zigzag] {
            let points = generate_pattern(&Hills, &center, 300.0, 5, kind, &mut rng);
            assert_eq!(points.len(), 5);
            for point in points {
                assert!(point.distance_2d(&center) <= 300.0 + 1e-6);
            }
        }
    }

    #[test]
    fn test_zero_steps_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = generate_pattern(&Hills, &Location::default(), 300.0, 0, PatternKind::Circular, &mut rng);
        assert!(points.is_empty());
    }
}
