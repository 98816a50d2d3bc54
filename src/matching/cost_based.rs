//! Cost-based matching: feeds each candidate through the shared cost
//! function and picks the minimum. Grounded on the source's
//! `CostBasedMatching.find_match` (score every pairing, keep the best).

use bevy_ecs::prelude::Entity;

use crate::cost::CostFunction;
use crate::ecs::OrderStatus;
use crate::map::Map;
use crate::rng::SimRng;

use super::{DriverCandidate, MatchingAlgorithm, OrderRequest};

#[derive(Debug, Clone, Copy)]
pub struct CostBasedMatching {
    cost_fn: CostFunction,
    /// Extra weight applied to ETA-to-pickup on top of the base cost
    /// function, so scenarios can bias toward drivers that are simply
    /// closer right now over ones that are merely cheap overall.
    eta_weight: f64,
}

impl CostBasedMatching {
    pub fn new(cost_fn: CostFunction, eta_weight: f64) -> Self {
        Self { cost_fn, eta_weight }
    }

    pub fn score_pairing(&self, map: &Map, candidate: &DriverCandidate, order: &OrderRequest) -> f64 {
        if candidate.spare_capacity < order.required_capacity {
            return f64::INFINITY;
        }
        let base = self.cost_fn.cost_of_new_order(
            map,
            candidate.coordinate,
            candidate.route_tail,
            candidate.movement_rate,
            order.pickup,
            order.delivery,
            OrderStatus::Ready,
        );
        if !base.is_finite() {
            return base;
        }
        let eta = map.estimated_time(candidate.route_tail, order.pickup, candidate.movement_rate) as f64;
        base + self.eta_weight * eta
    }
}

impl MatchingAlgorithm for CostBasedMatching {
    fn find_match(
        &self,
        order: &OrderRequest,
        candidates: &[DriverCandidate],
        map: &Map,
        _rng: &mut SimRng,
    ) -> Option<Entity> {
        candidates
            .iter()
            .map(|c| (c, self.score_pairing(map, c, order)))
            .filter(|(_, score)| score.is_finite())
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).expect("scores are never NaN"))
            .map(|(c, _)| c.entity)
    }
}
