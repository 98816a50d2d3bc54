//! Route insertion and dynamic reordering.
//!
//! Two distinct mechanisms live here:
//! - `try_insert_order`: the *initial assignment* gate. When a new order is
//!   matched to a driver, append its pickup/delivery pair to the route's
//!   tail, rejecting the insertion outright on capacity or detour-tolerance
//!   overrun. Grounded on the source's `DynamicRouteDriver.picked_up()` /
//!   `should_collect_next_before_delivery` detour-percentage formula.
//! - `try_reorder_pickup_forward`: the *dynamic reordering* check, run every
//!   time a pickup or delivery completes. A driver carrying collected
//!   (picked-up, undelivered) orders may pull its next order's pickup ahead
//!   of those pending deliveries if doing so still lets every collected
//!   order arrive within its own `latest_delivery` window.

use crate::cost::{CandidateSegment, CostFunction};
use crate::ecs::{Driver, OrderStatus, Route, RouteSegment, SegmentKind};
use crate::map::{Coordinate, Map};
use bevy_ecs::prelude::Entity;

/// One order the driver is currently carrying (picked up, not yet
/// delivered), in the order its delivery segment sits in the route.
#[derive(Debug, Clone, Copy)]
pub struct CollectedDelivery {
    pub order: Entity,
    pub coordinate: Coordinate,
    pub latest_delivery: u64,
}

/// The next not-yet-picked-up order on the driver's route.
#[derive(Debug, Clone, Copy)]
pub struct PendingPickup {
    pub order: Entity,
    pub coordinate: Coordinate,
    pub estimated_ready_time: u64,
}

/// Normal (no-reorder) delivery time window for an order that was just
/// picked up: `now + (est_time_between_picked_up_and_start_delivery +
/// est_delivery_travel_time) * (1 + tolerance)`.
pub fn latest_delivery_window(now: u64, map: &Map, movement_rate: f64, pickup: Coordinate, delivery: Coordinate, tolerance_percentage: f64) -> u64 {
    let normal_delivery_time = map.estimated_time(pickup, delivery, movement_rate);
    let slack = normal_delivery_time as f64 * (tolerance_percentage / 100.0);
    now + normal_delivery_time + slack.ceil() as u64
}

/// Whether pulling `next`'s pickup ahead of the currently-collected
/// deliveries still lets every collected order arrive by its own
/// `latest_delivery` window, simulated as: drive to `next`'s pickup (waiting
/// out any remaining prep time), then deliver the collected orders in their
/// current route order.
fn respects_collected_windows(map: &Map, movement_rate: f64, from: Coordinate, now: u64, next: &PendingPickup, collected: &[CollectedDelivery]) -> bool {
    let mut t = now + map.estimated_time(from, next.coordinate, movement_rate);
    t = t.max(next.estimated_ready_time);
    let mut at = next.coordinate;
    for delivery in collected {
        t += map.estimated_time(at, delivery.coordinate, movement_rate);
        if t > delivery.latest_delivery {
            return false;
        }
        at = delivery.coordinate;
    }
    true
}

/// Total time to finish the reordered sequence: pick up `next` (waiting out
/// any remaining prep time) first, then deliver every collected order in
/// route order.
fn pickup_first_time(map: &Map, movement_rate: f64, from: Coordinate, now: u64, next: &PendingPickup, collected: &[CollectedDelivery]) -> u64 {
    let mut t = now + map.estimated_time(from, next.coordinate, movement_rate);
    t = t.max(next.estimated_ready_time);
    let mut at = next.coordinate;
    for delivery in collected {
        t += map.estimated_time(at, delivery.coordinate, movement_rate);
        at = delivery.coordinate;
    }
    t
}

/// Total time to finish the planned (no-reorder) sequence: deliver every
/// collected order in route order first, then pick up `next`.
fn deliveries_first_time(map: &Map, movement_rate: f64, from: Coordinate, now: u64, next: &PendingPickup, collected: &[CollectedDelivery]) -> u64 {
    let mut t = now;
    let mut at = from;
    for delivery in collected {
        t += map.estimated_time(at, delivery.coordinate, movement_rate);
        at = delivery.coordinate;
    }
    t += map.estimated_time(at, next.coordinate, movement_rate);
    t.max(next.estimated_ready_time)
}

/// Total distance (no waiting) of the reordered sequence.
fn pickup_first_distance(map: &Map, from: Coordinate, next: &PendingPickup, collected: &[CollectedDelivery]) -> f64 {
    let mut total = map.distance(from, next.coordinate);
    let mut at = next.coordinate;
    for delivery in collected {
        total += map.distance(at, delivery.coordinate);
        at = delivery.coordinate;
    }
    total
}

/// Total distance (no waiting) of the planned (no-reorder) sequence.
fn deliveries_first_distance(map: &Map, from: Coordinate, next: &PendingPickup, collected: &[CollectedDelivery]) -> f64 {
    let mut total = 0.0;
    let mut at = from;
    for delivery in collected {
        total += map.distance(at, delivery.coordinate);
        at = delivery.coordinate;
    }
    total += map.distance(at, next.coordinate);
    total
}

/// What a successful `try_reorder_pickup_forward` call logs: the order
/// that jumped the queue plus the estimated time/distance saved compared to
/// the planned (deliveries-then-pickup) sequence it replaced.
#[derive(Debug, Clone, Copy)]
pub struct ReorderOutcome {
    pub order: Entity,
    pub estimated_time_saved: i64,
    pub estimated_distance_saved: f64,
    pub segment_type: SegmentKind,
}

/// Move `order`'s pickup segment to the front of the route, ahead of any
/// pending delivery segments. No-op (returns `false`) if the segment isn't
/// found or is already at the front.
fn splice_pickup_forward(route: &mut Route, order: Entity) -> bool {
    let Some(pos) = route
        .segments
        .iter()
        .position(|s| s.order == order && s.kind == SegmentKind::Pickup)
    else {
        return false;
    };
    if pos == 0 {
        return false;
    }
    let segment = route.segments.remove(pos).expect("position checked above");
    route.segments.push_front(segment);
    true
}

/// Run after a pickup or delivery completes: if there is spare capacity and
/// an uncollected order waiting on this route, check whether collecting it
/// next still respects every already-collected order's delivery window, and
/// splice its pickup to the front of the route if so. Every time the splice
/// actually happens the estimated time/distance saved against the planned
/// sequence is returned so the caller can log a reordering record; the
/// heuristic is myopic, so a reorder still goes ahead even when that delta
/// turns out to be negative.
pub fn try_reorder_pickup_forward(driver: &mut Driver, map: &Map, now: u64, next: &PendingPickup, collected: &[CollectedDelivery]) -> Option<ReorderOutcome> {
    if driver.current_load >= driver.max_capacity {
        return None;
    }
    let route = driver.route.as_mut()?;
    if !respects_collected_windows(map, driver.movement_rate, driver.coordinate, now, next, collected) {
        return None;
    }
    if !splice_pickup_forward(route, next.order) {
        return None;
    }

    let reordered_time = pickup_first_time(map, driver.movement_rate, driver.coordinate, now, next, collected);
    let planned_time = deliveries_first_time(map, driver.movement_rate, driver.coordinate, now, next, collected);
    let reordered_distance = pickup_first_distance(map, driver.coordinate, next, collected);
    let planned_distance = deliveries_first_distance(map, driver.coordinate, next, collected);

    Some(ReorderOutcome {
        order: next.order,
        estimated_time_saved: planned_time as i64 - reordered_time as i64,
        estimated_distance_saved: planned_distance - reordered_distance,
        segment_type: SegmentKind::Pickup,
    })
}

/// Whether inserting one more `required_capacity` unit of load at the
/// deepest point of the route would exceed `max_capacity`.
fn capacity_fits(route: &Route, required_capacity: u32, max_capacity: u32) -> bool {
    route.required_capacity() + required_capacity <= max_capacity
}

/// `(detour_time - direct_time) / direct_time * 100`, the delay percentage
/// compared against the driver's tolerance.
fn delay_percentage(direct_time: u64, detour_time: u64) -> f64 {
    if direct_time == 0 {
        return if detour_time == 0 { 0.0 } else { f64::INFINITY };
    }
    (detour_time as f64 - direct_time as f64) / direct_time as f64 * 100.0
}

/// Attempt to splice `order`'s pickup and delivery into `driver`'s route.
/// Returns `true` and mutates the route in place on success; leaves the
/// driver untouched on rejection (over capacity or over tolerance).
pub fn try_insert_order(
    driver: &mut Driver,
    map: &Map,
    cost_fn: &CostFunction,
    order: Entity,
    pickup: Coordinate,
    delivery: Coordinate,
    required_capacity: u32,
) -> bool {
    let pickup_penalty = cost_fn.penalty(&CandidateSegment {
        kind: SegmentKind::Pickup,
        coordinate: pickup,
        order_status: OrderStatus::Ready,
    });
    if !pickup_penalty.is_finite() {
        return false;
    }

    match &driver.route {
        None => {
            if required_capacity > driver.max_capacity {
                return false;
            }
            let route_id = driver.next_route_id;
            driver.next_route_id += 1;
            let mut route = Route {
                id: route_id,
                segments: Default::default(),
            };
            push_pair(&mut route, route_id, order, pickup, delivery, required_capacity);
            driver.route = Some(route);
            true
        }
        Some(route) => {
            if !capacity_fits(route, required_capacity, driver.max_capacity) {
                return false;
            }
            let tail = driver.route_tail_coordinate();
            let detour_time = map.estimated_time(tail, pickup, driver.movement_rate)
                + map.estimated_time(pickup, delivery, driver.movement_rate);
            let direct_time = map.estimated_time(driver.coordinate, pickup, driver.movement_rate)
                + map.estimated_time(pickup, delivery, driver.movement_rate);
            let pct = delay_percentage(direct_time, detour_time);
            if pct > driver.tolerance_percentage {
                return false;
            }
            let route = driver.route.as_mut().expect("checked Some above");
            let segment_id = route.id;
            push_pair(route, segment_id, order, pickup, delivery, required_capacity);
            true
        }
    }
}

fn push_pair(
    route: &mut Route,
    route_id: u64,
    order: Entity,
    pickup: Coordinate,
    delivery: Coordinate,
    required_capacity: u32,
) {
    let next_id = route.segments.len() as u64 + route_id * 1000;
    route.segments.push_back(RouteSegment {
        id: next_id,
        kind: SegmentKind::Pickup,
        order,
        coordinate: pickup,
        required_capacity,
    });
    route.segments.push_back(RouteSegment {
        id: next_id + 1,
        kind: SegmentKind::Delivery,
        order,
        coordinate: delivery,
        required_capacity,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::DriverStatus;

    fn driver(capacity: u32, tolerance: f64) -> Driver {
        Driver {
            coordinate: Coordinate::new(0, 0),
            movement_rate: 1.0,
            status: DriverStatus::Available,
            max_capacity: capacity,
            current_load: 0,
            tolerance_percentage: tolerance,
            route: None,
            accepted_orders: Vec::new(),
            distance_travelled: 0.0,
            idle_time: 0,
            waiting_time: 0,
            waiting_since: None,
            idle_since: Some(0),
            next_route_id: 0,
            time_spent_on_delivery: 0,
            distance_travelled_delta: 0.0,
        }
    }

    #[test]
    fn first_order_always_starts_a_route() {
        let map = Map::new(20);
        let cost_fn = CostFunction::default();
        let mut d = driver(2, 50.0);
        let accepted = try_insert_order(
            &mut d,
            &map,
            &cost_fn,
            Entity::from_raw(1),
            Coordinate::new(3, 0),
            Coordinate::new(5, 0),
            1,
        );
        assert!(accepted);
        assert_eq!(d.route.as_ref().unwrap().segments.len(), 2);
    }

    #[test]
    fn rejects_insertion_over_capacity() {
        let map = Map::new(20);
        let cost_fn = CostFunction::default();
        let mut d = driver(1, 1000.0);
        try_insert_order(
            &mut d,
            &map,
            &cost_fn,
            Entity::from_raw(1),
            Coordinate::new(3, 0),
            Coordinate::new(5, 0),
            1,
        );
        let accepted = try_insert_order(
            &mut d,
            &map,
            &cost_fn,
            Entity::from_raw(2),
            Coordinate::new(0, 3),
            Coordinate::new(0, 5),
            1,
        );
        assert!(!accepted);
    }

    #[test]
    fn rejects_insertion_past_tolerance() {
        let map = Map::new(50);
        let cost_fn = CostFunction::default();
        let mut d = driver(5, 1.0);
        try_insert_order(
            &mut d,
            &map,
            &cost_fn,
            Entity::from_raw(1),
            Coordinate::new(1, 0),
            Coordinate::new(2, 0),
            1,
        );
        let accepted = try_insert_order(
            &mut d,
            &map,
            &cost_fn,
            Entity::from_raw(2),
            Coordinate::new(40, 40),
            Coordinate::new(45, 45),
            1,
        );
        assert!(!accepted);
    }

    /// Spec §8 scenario #2 ("capacity gate"): a driver at full capacity with
    /// zero tolerance slack can never reorder, so orders are delivered in
    /// arrival order.
    #[test]
    fn zero_tolerance_and_no_spare_capacity_never_reorders() {
        let map = Map::new(20);
        let mut d = driver(1, 0.0);
        d.current_load = 1;
        let mut route = Route::default();
        push_pair(&mut route, 0, Entity::from_raw(1), Coordinate::new(5, 0), Coordinate::new(10, 0), 1);
        d.route = Some(route);

        let next = PendingPickup {
            order: Entity::from_raw(2),
            coordinate: Coordinate::new(1, 0),
            estimated_ready_time: 0,
        };
        let collected = [CollectedDelivery {
            order: Entity::from_raw(1),
            coordinate: Coordinate::new(10, 0),
            latest_delivery: 10,
        }];
        let outcome = try_reorder_pickup_forward(&mut d, &map, 0, &next, &collected);
        assert!(outcome.is_none(), "no spare capacity means the gate must reject every reorder");
        assert_eq!(d.route.as_ref().unwrap().segments[0].order, Entity::from_raw(1));
    }

    /// A driver mid-route: order 1 already picked up (only its delivery
    /// remains), order 2 accepted but not yet picked up (both its segments
    /// still queued behind order 1's delivery) — the shape
    /// `driver_picked_up_system` leaves behind right after a pickup.
    fn mid_route(delivery_one: Coordinate, pickup_two: Coordinate, delivery_two: Coordinate) -> Route {
        let mut route = Route::default();
        route.segments.push_back(RouteSegment {
            id: 0,
            kind: SegmentKind::Delivery,
            order: Entity::from_raw(1),
            coordinate: delivery_one,
            required_capacity: 1,
        });
        route.segments.push_back(RouteSegment {
            id: 1,
            kind: SegmentKind::Pickup,
            order: Entity::from_raw(2),
            coordinate: pickup_two,
            required_capacity: 1,
        });
        route.segments.push_back(RouteSegment {
            id: 2,
            kind: SegmentKind::Delivery,
            order: Entity::from_raw(2),
            coordinate: delivery_two,
            required_capacity: 1,
        });
        route
    }

    /// Spec §8 scenario #3 ("opportunistic pickup"): a driver with spare
    /// capacity and loose tolerance picks up a second, nearby order before
    /// finishing its first delivery, without blowing the first order's
    /// delivery window.
    #[test]
    fn spare_capacity_and_feasible_window_reorders_pickup_forward() {
        let map = Map::new(50);
        let mut d = driver(2, 50.0);
        d.current_load = 1;
        d.route = Some(mid_route(Coordinate::new(40, 0), Coordinate::new(1, 0), Coordinate::new(45, 0)));

        let next = PendingPickup {
            order: Entity::from_raw(2),
            coordinate: Coordinate::new(1, 0),
            estimated_ready_time: 0,
        };
        let collected = [CollectedDelivery {
            order: Entity::from_raw(1),
            coordinate: Coordinate::new(40, 0),
            latest_delivery: 1000,
        }];
        let outcome = try_reorder_pickup_forward(&mut d, &map, 0, &next, &collected);
        let outcome = outcome.expect("spare capacity and ample slack should let the second pickup jump the queue");
        assert_eq!(outcome.order, Entity::from_raw(2));
        assert_eq!(outcome.segment_type, SegmentKind::Pickup);
        // deliveries-then-pickup costs 79 (40 to the delivery, 39 back to the
        // new pickup); pickup-then-deliveries costs 40 (1 to the pickup, 39 on
        // to the delivery) — a 39-unit saving in both time and distance.
        assert_eq!(outcome.estimated_time_saved, 39);
        assert_eq!(outcome.estimated_distance_saved, 39.0);

        let route = d.route.as_ref().unwrap();
        assert_eq!(route.segments[0].order, Entity::from_raw(2));
        assert_eq!(route.segments[0].kind, SegmentKind::Pickup);
    }

    #[test]
    fn reorder_is_rejected_when_it_would_blow_a_collected_order_s_window() {
        let map = Map::new(50);
        let mut d = driver(2, 50.0);
        d.current_load = 1;
        d.route = Some(mid_route(Coordinate::new(6, 0), Coordinate::new(49, 49), Coordinate::new(49, 0)));

        // `next`'s establishment is far away, and order 1's delivery window
        // is razor-tight, so detouring to collect `next` first would make
        // order 1 late.
        let next = PendingPickup {
            order: Entity::from_raw(2),
            coordinate: Coordinate::new(49, 49),
            estimated_ready_time: 0,
        };
        let collected = [CollectedDelivery {
            order: Entity::from_raw(1),
            coordinate: Coordinate::new(6, 0),
            latest_delivery: 5,
        }];
        let outcome = try_reorder_pickup_forward(&mut d, &map, 0, &next, &collected);
        assert!(outcome.is_none());
        assert_eq!(d.route.as_ref().unwrap().segments[0].order, Entity::from_raw(1));
    }
}
