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

//! World coordinates

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// A point in world space.
///
/// All planar reasoning (ranges, leash checks, path lattice) uses the
/// horizontal plane; `z` is carried along for terrain placement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    /// Create a new location
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Horizontal distance to another location
    pub fn distance_2d(&self, other: &Location) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Full 3D distance to another location
    pub fn distance(&self, other: &Location) -> f64 {
        let dz = other.z - self.z;
        (self.distance_2d(other).powi(2) + dz * dz).sqrt()
    }

    /// Heading in radians from this location towards another
    pub fn heading_to(&self, other: &Location) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Offset this location by `distance` along `angle` (radians) on the horizontal plane
    pub fn polar(&self, angle: f64, distance: f64) -> Location {
        Location::new(
            self.x + angle.cos() * distance,
            self.y + angle.sin() * distance,
            self.z,
        )
    }

    /// Step from this location towards `target` by `distance`.
    ///
    /// Never overshoots: if the target is closer than `distance` the target
    /// itself is returned. Negative distances step away from the target.
    pub fn towards(&self, target: &Location, distance: f64) -> Location {
        let total = self.distance_2d(target);
        if total <= f64::EPSILON {
            return *self;
        }
        if distance >= total {
            return *target;
        }
        let t = distance / total;
        Location::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
            self.z + (target.z - self.z) * t,
        )
    }

    /// The point `distance` away from `target` on the line back towards `self`.
    ///
    /// Used for approach points ("stand 80% of my range from the target").
    pub fn approach_point(&self, target: &Location, distance: f64) -> Location {
        if self.distance_2d(target) <= f64::EPSILON {
            return *target;
        }
        let angle = target.heading_to(self);
        target.polar(angle, distance)
    }

    /// The point `distance` further away from `threat`, continuing the line from it through `self`.
    pub fn away_from(&self, threat: &Location, distance: f64) -> Location {
        let angle = if self.distance_2d(threat) <= f64::EPSILON {
            0.0
        } else {
            threat.heading_to(self)
        };
        self.polar(angle, distance)
    }

    /// Returns the eight compass headings (radians) starting east, counter-clockwise
    pub fn compass() -> [f64; 8] {
        let mut headings = [0.0; 8];
        for (i, heading) in headings.iter_mut().enumerate() {
            *heading = TAU * i as f64 / 8.0;
        }
        headings
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.0}, {:.0}, {:.0})", self.x, self.y, self.z)
    }
}
