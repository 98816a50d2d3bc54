//! Pluggable order-to-driver matching: the algorithm that picks
//! which available driver, if any, takes a newly-ready order.

mod cost_based;
mod simple;

pub use cost_based::CostBasedMatching;
pub use simple::{NearestMatching, RandomMatching};

use crate::cost::CostFunction;
use crate::map::{Coordinate, Map};
use crate::rng::SimRng;
use bevy_ecs::prelude::{Entity, Resource};

/// A driver eligible to take on a new order: idle or already underway but
/// with spare capacity.
#[derive(Debug, Clone, Copy)]
pub struct DriverCandidate {
    pub entity: Entity,
    /// The driver's live position right now.
    pub coordinate: Coordinate,
    /// Where the driver's current commitments end (its own position if idle).
    pub route_tail: Coordinate,
    pub movement_rate: f64,
    pub spare_capacity: u32,
}

/// The order being matched, reduced to what a matching algorithm needs.
#[derive(Debug, Clone, Copy)]
pub struct OrderRequest {
    pub pickup: Coordinate,
    pub delivery: Coordinate,
    pub required_capacity: u32,
}

/// Which matching algorithm a scenario selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingKind {
    Random,
    Nearest,
    CostBased,
}

/// Selects a driver for a ready order out of the supplied candidates, or
/// `None` if no candidate is currently feasible (the order stays queued).
pub trait MatchingAlgorithm {
    fn find_match(
        &self,
        order: &OrderRequest,
        candidates: &[DriverCandidate],
        map: &Map,
        rng: &mut SimRng,
    ) -> Option<Entity>;
}

pub fn algorithm_for(kind: MatchingKind, cost_fn: CostFunction, eta_weight: f64) -> Box<dyn MatchingAlgorithm + Send + Sync> {
    match kind {
        MatchingKind::Random => Box::new(RandomMatching),
        MatchingKind::Nearest => Box::new(NearestMatching),
        MatchingKind::CostBased => Box::new(CostBasedMatching::new(cost_fn, eta_weight)),
    }
}

/// The configured matching algorithm, held as a `World` resource.
#[derive(Resource)]
pub struct ActiveMatcher(pub Box<dyn MatchingAlgorithm + Send + Sync>);
