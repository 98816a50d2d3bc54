//! The dispatch cost function, shared by initial matching
//! (`matching::cost_based`) and the dynamic reordering engine (`reorder`).
//!
//! Grounded on the source's `SimpleCostFunction`: `cost = w_delay*delay +
//! w_distance*distance + penalty`, with `penalty = +inf` unless the
//! pickup/delivery ordering constraint still holds for the order being
//! considered.

use bevy_ecs::prelude::Resource;

use crate::ecs::{OrderStatus, SegmentKind};
use crate::map::{Coordinate, Map};

#[derive(Debug, Clone, Copy, Resource)]
pub struct CostFunction {
    pub weight_delay: f64,
    pub weight_distance: f64,
}

impl Default for CostFunction {
    fn default() -> Self {
        Self {
            weight_delay: 1.0,
            weight_distance: 1.0,
        }
    }
}

/// One additional stop being considered, expressed independent of any
/// particular driver's route so it can be scored against many routes.
#[derive(Debug, Clone, Copy)]
pub struct CandidateSegment {
    pub kind: SegmentKind,
    pub coordinate: Coordinate,
    pub order_status: OrderStatus,
}

impl CostFunction {
    /// `+inf` unless the order is still early enough in its lifecycle for
    /// this segment to make sense: a pickup only helps before a driver has
    /// already committed to the run, a delivery only helps before the order
    /// has already been picked up by someone else.
    pub fn penalty(&self, segment: &CandidateSegment) -> f64 {
        let gate_ok = match segment.kind {
            SegmentKind::Pickup => segment.order_status <= OrderStatus::DriverAccepted,
            SegmentKind::Delivery => segment.order_status <= OrderStatus::PickedUp,
        };
        if gate_ok {
            0.0
        } else {
            f64::INFINITY
        }
    }

    /// Cost of a driver taking on `segment` next. **Precise definition**
    /// (from the source's `simple_cost_function.py`): if the driver's route
    /// is non-empty, `delay`/`distance` is the sum of (a) the driver's
    /// current-position-to-route-tail leg and (b) the route-tail-to-segment
    /// leg; if the route is empty, `route_tail` equals `current` and (a)
    /// collapses to zero, leaving the plain driver-to-segment estimate.
    pub fn cost(&self, map: &Map, current: Coordinate, route_tail: Coordinate, movement_rate: f64, segment: &CandidateSegment) -> f64 {
        let penalty = self.penalty(segment);
        if !penalty.is_finite() {
            return penalty;
        }
        let to_tail_distance = map.distance(current, route_tail);
        let to_tail_delay = map.estimated_time(current, route_tail, movement_rate) as f64;
        let tail_distance = map.distance(route_tail, segment.coordinate);
        let tail_delay = map.estimated_time(route_tail, segment.coordinate, movement_rate) as f64;
        let distance = to_tail_distance + tail_distance;
        let delay = to_tail_delay + tail_delay;
        self.weight_delay * delay + self.weight_distance * distance + penalty
    }

    /// Cost of appending a full pickup-then-delivery pair to a route whose
    /// current tail is `route_tail`, for a driver whose live position is
    /// `current`: the initial assignment of a fresh order to a driver that
    /// isn't yet holding any segments for it. The delivery leg's `current`
    /// and `route_tail` are both `pickup` — once picked up, the driver is
    /// right there, no separate current-to-tail detour to add.
    pub fn cost_of_new_order(
        &self,
        map: &Map,
        current: Coordinate,
        route_tail: Coordinate,
        movement_rate: f64,
        pickup: Coordinate,
        delivery: Coordinate,
        order_status: OrderStatus,
    ) -> f64 {
        let pickup_cost = self.cost(
            map,
            current,
            route_tail,
            movement_rate,
            &CandidateSegment {
                kind: SegmentKind::Pickup,
                coordinate: pickup,
                order_status,
            },
        );
        if !pickup_cost.is_finite() {
            return pickup_cost;
        }
        let delivery_cost = self.cost(
            map,
            pickup,
            pickup,
            movement_rate,
            &CandidateSegment {
                kind: SegmentKind::Delivery,
                coordinate: delivery,
                order_status,
            },
        );
        pickup_cost + delivery_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_is_infinite_past_pickup_for_pickup_segment() {
        let cost_fn = CostFunction::default();
        let segment = CandidateSegment {
            kind: SegmentKind::Pickup,
            coordinate: Coordinate::new(0, 0),
            order_status: OrderStatus::PickedUp,
        };
        assert_eq!(cost_fn.penalty(&segment), f64::INFINITY);
    }

    #[test]
    fn penalty_is_zero_before_driver_accepted() {
        let cost_fn = CostFunction::default();
        let segment = CandidateSegment {
            kind: SegmentKind::Pickup,
            coordinate: Coordinate::new(0, 0),
            order_status: OrderStatus::Ready,
        };
        assert_eq!(cost_fn.penalty(&segment), 0.0);
    }

    #[test]
    fn cost_combines_delay_and_distance() {
        let cost_fn = CostFunction::default();
        let map = Map::new(20);
        let segment = CandidateSegment {
            kind: SegmentKind::Pickup,
            coordinate: Coordinate::new(3, 0),
            order_status: OrderStatus::Ready,
        };
        let cost = cost_fn.cost(&map, Coordinate::new(0, 0), Coordinate::new(0, 0), 1.0, &segment);
        assert_eq!(cost, 3.0 + 3.0);
    }

    #[test]
    fn cost_adds_current_to_tail_leg_when_route_is_non_empty() {
        let cost_fn = CostFunction::default();
        let map = Map::new(20);
        let segment = CandidateSegment {
            kind: SegmentKind::Pickup,
            coordinate: Coordinate::new(3, 0),
            order_status: OrderStatus::Ready,
        };
        // current (0,0) -> tail (1,0): 1. tail (1,0) -> segment (3,0): 2. total 3, doubled (delay+distance).
        let cost = cost_fn.cost(&map, Coordinate::new(0, 0), Coordinate::new(1, 0), 1.0, &segment);
        assert_eq!(cost, 3.0 + 3.0);
    }

    #[test]
    fn new_order_cost_chains_pickup_then_delivery() {
        let cost_fn = CostFunction::default();
        let map = Map::new(20);
        let cost = cost_fn.cost_of_new_order(
            &map,
            Coordinate::new(0, 0),
            Coordinate::new(0, 0),
            1.0,
            Coordinate::new(2, 0),
            Coordinate::new(2, 5),
            OrderStatus::Ready,
        );
        // pickup: distance 2, delay 2 -> 4. delivery: distance 5, delay 5 -> 10.
        assert_eq!(cost, 14.0);
    }

    #[test]
    fn new_order_cost_includes_current_to_tail_leg_for_pickup() {
        let cost_fn = CostFunction::default();
        let map = Map::new(20);
        let cost = cost_fn.cost_of_new_order(
            &map,
            Coordinate::new(0, 0),
            Coordinate::new(1, 0),
            1.0,
            Coordinate::new(2, 0),
            Coordinate::new(2, 5),
            OrderStatus::Ready,
        );
        // pickup: (0,0)->(1,0)=1, (1,0)->(2,0)=1, total 2 -> 4. delivery: 5 -> 10.
        assert_eq!(cost, 14.0);
    }
}
