//! Abstract square grid map: coordinates, distance, and ETA.
//!
//! No geographic data is used (explicit Non-goal); the grid is a plain
//! integer coordinate space. Distance is **Chebyshev** (per-step grid
//! movement, matching the source's movement model) — this is the committed
//! choice documented in `DESIGN.md`.

use bevy_ecs::prelude::Resource;
use rand::Rng;

use crate::rng::SimRng;

/// 2D integer point on a square grid of size `G`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Immutable grid map. Read-only after construction. Lives in the `World`
/// as a resource so any system can query distances without threading it
/// through every function signature.
#[derive(Debug, Clone, Copy, Resource)]
pub struct Map {
    size: i32,
}

impl Map {
    pub fn new(size: i32) -> Self {
        assert!(size > 0, "grid size must be positive");
        Self { size }
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    /// Chebyshev distance between two points.
    pub fn distance(&self, a: Coordinate, b: Coordinate) -> f64 {
        let dx = (a.x - b.x).unsigned_abs();
        let dy = (a.y - b.y).unsigned_abs();
        dx.max(dy) as f64
    }

    /// Estimated travel time: `ceil(distance / rate)`, rate > 0.
    pub fn estimated_time(&self, a: Coordinate, b: Coordinate, rate: f64) -> u64 {
        assert!(rate > 0.0, "movement rate must be positive");
        (self.distance(a, b) / rate).ceil() as u64
    }

    /// Maximum possible distance on this grid (corner to corner, Chebyshev).
    pub fn max_distance(&self) -> f64 {
        (self.size - 1) as f64
    }

    /// Uniformly random point on the grid.
    pub fn random_point(&self, rng: &mut SimRng) -> Coordinate {
        Coordinate::new(
            rng.gen_range(0..self.size),
            rng.gen_range(0..self.size),
        )
    }

    /// Clamp a point into the grid bounds `[0, size)`.
    pub fn clamp(&self, point: Coordinate) -> Coordinate {
        Coordinate::new(
            point.x.clamp(0, self.size - 1),
            point.y.clamp(0, self.size - 1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chebyshev_distance_is_max_of_axes() {
        let map = Map::new(10);
        let a = Coordinate::new(0, 0);
        let b = Coordinate::new(3, 7);
        assert_eq!(map.distance(a, b), 7.0);
    }

    #[test]
    fn estimated_time_rounds_up() {
        let map = Map::new(10);
        let a = Coordinate::new(0, 0);
        let b = Coordinate::new(5, 0);
        assert_eq!(map.estimated_time(a, b, 2.0), 3);
        assert_eq!(map.estimated_time(a, b, 5.0), 1);
    }

    #[test]
    fn max_distance_is_corner_to_corner() {
        let map = Map::new(10);
        assert_eq!(map.max_distance(), 9.0);
    }

    #[test]
    fn random_point_stays_in_bounds() {
        let map = Map::new(5);
        let mut rng = SimRng::new(Some(1));
        for _ in 0..50 {
            let p = map.random_point(&mut rng);
            assert!(p.x >= 0 && p.x < 5);
            assert!(p.y >= 0 && p.y < 5);
        }
    }
}
