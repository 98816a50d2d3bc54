//! Baseline matching algorithms used as agent-free comparisons in training:
//! pick uniformly at random, or pick the nearest feasible driver.

use bevy_ecs::prelude::Entity;
use rand::seq::SliceRandom;

use crate::map::Map;
use crate::rng::SimRng;

use super::{DriverCandidate, MatchingAlgorithm, OrderRequest};

fn feasible<'a>(
    order: &OrderRequest,
    candidates: &'a [DriverCandidate],
) -> Vec<&'a DriverCandidate> {
    candidates
        .iter()
        .filter(|c| c.spare_capacity >= order.required_capacity)
        .collect()
}

pub struct RandomMatching;

impl MatchingAlgorithm for RandomMatching {
    fn find_match(
        &self,
        order: &OrderRequest,
        candidates: &[DriverCandidate],
        _map: &Map,
        rng: &mut SimRng,
    ) -> Option<Entity> {
        feasible(order, candidates)
            .choose(&mut rng.0)
            .map(|c| c.entity)
    }
}

pub struct NearestMatching;

impl MatchingAlgorithm for NearestMatching {
    fn find_match(
        &self,
        order: &OrderRequest,
        candidates: &[DriverCandidate],
        map: &Map,
        _rng: &mut SimRng,
    ) -> Option<Entity> {
        feasible(order, candidates)
            .into_iter()
            .min_by(|a, b| {
                map.distance(a.route_tail, order.pickup)
                    .partial_cmp(&map.distance(b.route_tail, order.pickup))
                    .expect("distances are never NaN")
            })
            .map(|c| c.entity)
    }
}
