//! Entity Component System: components and state enums for customers,
//! establishments, orders, and drivers.
//!
//! Cyclic references (driver ↔ order ↔ establishment ↔ customer) are
//! replaced with integer entity IDs into the `World`'s arenas: no pointer
//! graphs, no ownership cycles.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Component, Entity};

use crate::map::Coordinate;

/// A catalog item an establishment can sell. Orders reference items by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: u32,
}

/// Strictly-ordered order lifecycle status. Declaration order is
/// the ordinal order (mirrors the source's `IntEnum`-style `__lt__`).
/// Composite in-flight states are *not* separate variants (see `DESIGN.md`'s
/// Open Question decision): they are derived booleans computed from
/// `(prep_done, driver_accepted, pickup_in_progress)` by `Order`'s `is_*`
/// accessors below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderStatus {
    Created,
    Placed,
    EstablishmentAccepted,
    Preparing,
    Ready,
    DriverAccepted,
    PickingUp,
    PickedUp,
    Delivering,
    Received,
    Delivered,
}

/// Timestamps and estimated durations recorded as each transition fires
/// so reward, reordering, and the cost function can plan without
/// peeking at future events.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderTimings {
    pub established_accepted_at: Option<u64>,
    pub estimated_preparation_duration: Option<u64>,
    pub estimated_ready_time: Option<u64>,
    pub time_order_became_ready: Option<u64>,
    pub driver_accepted_at: Option<u64>,
    pub estimated_time_between_accept_and_start_picking_up: Option<u64>,
    pub estimated_pickup_travel_time: Option<u64>,
    pub estimated_time_between_picked_up_and_start_delivery: Option<u64>,
    pub estimated_delivery_travel_time: Option<u64>,
    pub estimated_customer_receive_delay: Option<u64>,
    pub picked_up_at: Option<u64>,
    pub delivered_at: Option<u64>,
    /// Dynamic-reorder time window, set once the order is picked up.
    pub latest_delivery: Option<u64>,
}

/// A customer order. Referenced by exactly one customer and one
/// establishment; by at most one driver at a time.
#[derive(Debug, Clone, Component)]
pub struct Order {
    pub customer: Entity,
    pub establishment: Entity,
    pub request_time: u64,
    pub items: Vec<u32>,
    pub required_capacity: u32,
    pub status: OrderStatus,
    pub driver: Option<Entity>,
    pub pickup_segment_id: Option<u64>,
    pub delivery_segment_id: Option<u64>,
    pub timings: OrderTimings,
}

impl Order {
    /// Move `status` forward to `new`, never backward. The early-release
    /// path can hand a driver an order before it's `Ready`, so `status` can
    /// legitimately jump ahead of where the prep-side track thinks it is;
    /// without this guard the prep-side track would later stomp that
    /// progress back down when it catches up.
    pub fn advance_status(&mut self, new: OrderStatus) {
        if new > self.status {
            self.status = new;
        }
    }

    /// Whether prep has actually finished, independent of `status` (which
    /// may already be ahead of `Ready` under early release).
    pub fn prep_done(&self) -> bool {
        self.timings.time_order_became_ready.is_some()
    }

    /// Whether a driver has accepted a route carrying this order.
    pub fn driver_accepted(&self) -> bool {
        self.driver.is_some()
    }

    /// Whether the driver is actively en route to pick the order up (or
    /// parked waiting for it to finish preparing).
    pub fn pickup_in_progress(&self) -> bool {
        self.status == OrderStatus::PickingUp
    }

    /// Derived composite: ready and a driver has already accepted it.
    pub fn is_ready_and_driver_accepted(&self) -> bool {
        self.prep_done() && self.driver_accepted()
    }

    /// Derived composite: a driver is already heading to pick this order up
    /// even though it hasn't finished preparing yet (the early-release
    /// overlap the source's `IntEnum` ordering can't express on its own).
    pub fn is_preparing_and_picking_up(&self) -> bool {
        !self.prep_done() && self.pickup_in_progress()
    }

    pub fn is_already_caught(&self) -> bool {
        self.status >= OrderStatus::PickedUp
    }
}

/// A customer, spawned alongside each order: exactly one customer per order.
#[derive(Debug, Clone, Copy, Component)]
pub struct Customer {
    pub coordinate: Coordinate,
}

/// Prep-time distribution parameters and capacity for an establishment.
#[derive(Debug, Clone, Component)]
pub struct Establishment {
    pub coordinate: Coordinate,
    pub catalog: Vec<CatalogItem>,
    pub production_capacity: u32,
    pub operating_radius: f64,
    pub min_prep_time: f64,
    pub max_prep_time: f64,
    pub target_prep_rate: f64,
    /// Probability an order is released to the core-event queue immediately
    /// on acceptance rather than deferred until `ready`.
    pub percentage_allocation_driver: f64,
}

/// Runtime queue/semaphore state for an establishment (separate from the
/// static config component so tests can construct establishments without it).
#[derive(Debug, Clone, Default, Component)]
pub struct EstablishmentQueue {
    pub pending: VecDeque<Entity>,
    pub prep_slots_in_use: u32,
}

/// Driver status, six-way split straight from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    Available,
    ProcessingPreviousOrders,
    PickingUp,
    PickingUpWaiting,
    Delivering,
    DeliveringWaiting,
}

/// A route segment: a (type, order) pair with a derived destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Pickup,
    Delivery,
}

#[derive(Debug, Clone, Copy)]
pub struct RouteSegment {
    pub id: u64,
    pub kind: SegmentKind,
    pub order: Entity,
    pub coordinate: Coordinate,
    pub required_capacity: u32,
}

/// An ordered sequence of route segments with a fresh unique id.
#[derive(Debug, Clone, Default)]
pub struct Route {
    pub id: u64,
    pub segments: VecDeque<RouteSegment>,
}

impl Route {
    /// Sum of `required_capacity` over remaining segments (pickups consume,
    /// deliveries release, so only undelivered pickups count here).
    pub fn required_capacity(&self) -> u32 {
        let mut load = 0i64;
        let mut max_load = 0i64;
        for segment in &self.segments {
            match segment.kind {
                SegmentKind::Pickup => load += segment.required_capacity as i64,
                SegmentKind::Delivery => load -= segment.required_capacity as i64,
            }
            max_load = max_load.max(load);
        }
        max_load.max(0) as u32
    }

    /// Index of the first segment for `order`, if present.
    pub fn position_of(&self, order: Entity) -> Option<usize> {
        self.segments.iter().position(|s| s.order == order)
    }
}

/// A driver: coordinate, movement rate, capacity, current route, and
/// accumulated counters.
#[derive(Debug, Clone, Component)]
pub struct Driver {
    pub coordinate: Coordinate,
    pub movement_rate: f64,
    pub status: DriverStatus,
    pub max_capacity: u32,
    pub current_load: u32,
    /// Per-order tolerance (τ) applied when building dynamic-reorder time
    /// windows; sourced from the scenario's `max_delay_percentage`.
    pub tolerance_percentage: f64,
    pub route: Option<Route>,
    pub accepted_orders: Vec<Entity>,
    pub distance_travelled: f64,
    pub idle_time: u64,
    /// Cumulative time spent parked at a pickup location waiting for the
    /// order to finish preparing (`DriverStatus::PickingUpWaiting`).
    pub waiting_time: u64,
    /// Timestamp the driver parked waiting for an order to become `Ready`,
    /// if it currently is. Consumed (and folded into `waiting_time`) once
    /// the order becomes ready and the pickup actually happens.
    pub waiting_since: Option<u64>,
    /// Timestamp the driver most recently went idle, if it currently is.
    /// Consumed (and cleared) the next time it's handed a route.
    pub idle_since: Option<u64>,
    /// Next fresh route id to hand out when a route is created or extended.
    pub next_route_id: u64,
    /// Cumulative time spent actively delivering (picked-up-to-delivered),
    /// summed across every order this driver has completed. Reward
    /// objectives 3/7/9/10 read this directly.
    pub time_spent_on_delivery: u64,
    /// Distance travelled since the last time an agent step read and reset
    /// it. Mirrors `distance_travelled` but is zeroed every step so reward
    /// objective 4/8 can read a per-step delta instead of a running total.
    pub distance_travelled_delta: f64,
}

impl Driver {
    pub fn new(coordinate: Coordinate, movement_rate: f64, max_capacity: u32, tolerance: f64) -> Self {
        Self {
            coordinate,
            movement_rate,
            status: DriverStatus::Available,
            max_capacity,
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

    /// The coordinate the driver's current route heads toward next, or the
    /// driver's own position if the route is empty.
    pub fn route_tail_coordinate(&self) -> Coordinate {
        self.route
            .as_ref()
            .and_then(|r| r.segments.back())
            .map(|s| s.coordinate)
            .unwrap_or(self.coordinate)
    }

    /// Estimated total time to finish the remaining route, leg by leg, from
    /// the driver's current position. Zero once the route is empty.
    pub fn estimate_total_busy_time(&self, map: &crate::map::Map) -> u64 {
        let Some(route) = self.route.as_ref() else {
            return 0;
        };
        let mut total = 0u64;
        let mut at = self.coordinate;
        for segment in &route.segments {
            total += map.estimated_time(at, segment.coordinate, self.movement_rate);
            at = segment.coordinate;
        }
        total
    }

    /// Sum of Chebyshev distance over the remaining route, leg by leg, from
    /// the driver's current position.
    pub fn total_remaining_distance(&self, map: &crate::map::Map) -> f64 {
        let Some(route) = self.route.as_ref() else {
            return 0.0;
        };
        let mut total = 0.0;
        let mut at = self.coordinate;
        for segment in &route.segments {
            total += map.distance(at, segment.coordinate);
            at = segment.coordinate;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_is_strictly_ordered() {
        assert!(OrderStatus::Created < OrderStatus::Placed);
        assert!(OrderStatus::Ready < OrderStatus::DriverAccepted);
        assert!(OrderStatus::Delivering < OrderStatus::Delivered);
    }

    #[test]
    fn route_required_capacity_tracks_peak_load() {
        let mut route = Route::default();
        let order_a = Entity::from_raw(1);
        let order_b = Entity::from_raw(2);
        route.segments.push_back(RouteSegment {
            id: 0,
            kind: SegmentKind::Pickup,
            order: order_a,
            coordinate: Coordinate::new(0, 0),
            required_capacity: 1,
        });
        route.segments.push_back(RouteSegment {
            id: 1,
            kind: SegmentKind::Pickup,
            order: order_b,
            coordinate: Coordinate::new(1, 1),
            required_capacity: 1,
        });
        route.segments.push_back(RouteSegment {
            id: 2,
            kind: SegmentKind::Delivery,
            order: order_a,
            coordinate: Coordinate::new(2, 2),
            required_capacity: 1,
        });
        route.segments.push_back(RouteSegment {
            id: 3,
            kind: SegmentKind::Delivery,
            order: order_b,
            coordinate: Coordinate::new(3, 3),
            required_capacity: 1,
        });
        assert_eq!(route.required_capacity(), 2);
    }

    #[test]
    fn composite_statuses_are_derived() {
        let mut timings = OrderTimings::default();
        timings.time_order_became_ready = Some(5);
        let order = Order {
            customer: Entity::from_raw(1),
            establishment: Entity::from_raw(2),
            request_time: 0,
            items: vec![],
            required_capacity: 1,
            status: OrderStatus::Ready,
            driver: Some(Entity::from_raw(3)),
            pickup_segment_id: None,
            delivery_segment_id: None,
            timings,
        };
        assert!(order.is_ready_and_driver_accepted());
        assert!(!order.is_preparing_and_picking_up());
    }

    #[test]
    fn preparing_and_picking_up_is_true_only_while_prep_is_unfinished() {
        let mut order = Order {
            customer: Entity::from_raw(1),
            establishment: Entity::from_raw(2),
            request_time: 0,
            items: vec![],
            required_capacity: 1,
            status: OrderStatus::PickingUp,
            driver: Some(Entity::from_raw(3)),
            pickup_segment_id: None,
            delivery_segment_id: None,
            timings: OrderTimings::default(),
        };
        assert!(order.is_preparing_and_picking_up());
        order.timings.time_order_became_ready = Some(10);
        assert!(!order.is_preparing_and_picking_up());
    }

    #[test]
    fn advance_status_never_regresses() {
        let mut order = Order {
            customer: Entity::from_raw(1),
            establishment: Entity::from_raw(2),
            request_time: 0,
            items: vec![],
            required_capacity: 1,
            status: OrderStatus::DriverAccepted,
            driver: Some(Entity::from_raw(3)),
            pickup_segment_id: None,
            delivery_segment_id: None,
            timings: OrderTimings::default(),
        };
        order.advance_status(OrderStatus::Ready);
        assert_eq!(order.status, OrderStatus::DriverAccepted);
        order.advance_status(OrderStatus::PickedUp);
        assert_eq!(order.status, OrderStatus::PickedUp);
    }
}
