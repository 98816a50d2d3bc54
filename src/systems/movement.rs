//! Driver movement between route stops: one event per leg,
//! arrival separated from the pickup/delivery action itself so telemetry and
//! the agent adapter can observe "arrived" and "handled" as distinct ticks.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::{Driver, DriverStatus, Order, OrderStatus, SegmentKind};
use crate::map::Map;
use crate::reorder::{self, CollectedDelivery, PendingPickup};
use crate::telemetry::{CompletedOrderRecord, EventLog, ReorderLog, ReorderRecord, SimTelemetry};

fn driver_subject(current: &CurrentEvent) -> Entity {
    match current.0.subject {
        Some(EventSubject::Driver(driver)) => driver,
        _ => panic!("expected a Driver event subject for {:?}", current.0.kind),
    }
}

/// Gather the dynamic-reorder check's inputs straight from the driver's
/// current route: the next not-yet-picked-up order (if any) and every
/// already-collected order's pending delivery window.
fn reorder_inputs(driver: &Driver, orders: &Query<&mut Order>, now: u64) -> Option<(PendingPickup, Vec<CollectedDelivery>)> {
    let route = driver.route.as_ref()?;
    let next_segment = route.segments.iter().find(|s| s.kind == SegmentKind::Pickup)?;
    let next_order = orders.get(next_segment.order).ok()?;
    let next = PendingPickup {
        order: next_segment.order,
        coordinate: next_segment.coordinate,
        estimated_ready_time: next_order.timings.estimated_ready_time.unwrap_or(now),
    };
    let collected = route
        .segments
        .iter()
        .filter(|s| s.kind == SegmentKind::Delivery)
        .filter_map(|s| {
            let order = orders.get(s.order).ok()?;
            if order.status != OrderStatus::PickedUp {
                return None;
            }
            Some(CollectedDelivery {
                order: s.order,
                coordinate: s.coordinate,
                latest_delivery: order.timings.latest_delivery.unwrap_or(u64::MAX),
            })
        })
        .collect();
    Some((next, collected))
}

/// Run the dynamic-reorder check after a pickup or delivery completes,
/// splicing the next pickup to the front of the route when feasible and
/// recording the outcome into `ReorderLog`/`EventLog`.
fn try_reorder(
    driver: &mut Driver,
    map: &Map,
    orders: &Query<&mut Order>,
    now: u64,
    reorder_log: &mut ReorderLog,
    event_log: &mut EventLog,
) {
    let Some((next, collected)) = reorder_inputs(driver, orders, now) else {
        return;
    };
    let Some(outcome) = reorder::try_reorder_pickup_forward(driver, map, now, &next, &collected) else {
        return;
    };
    reorder_log.record(ReorderRecord {
        time: now,
        order: outcome.order,
        estimated_time_saved: outcome.estimated_time_saved,
        estimated_distance_saved: outcome.estimated_distance_saved,
        segment_type: outcome.segment_type,
    });
    event_log.record(now, EventKind::RouteReordered, Some(EventSubject::Order(outcome.order)));
}

/// Schedule the event for the driver's next leg, or go idle if the route is
/// exhausted. Shared by route acceptance, pickup, and delivery handlers.
/// Advances the next segment's order status as the driver commits to that
/// leg, since the status only reflects a driver's commitment, not arrival.
fn schedule_next_leg(driver_entity: Entity, driver: &mut Driver, map: &Map, clock: &mut SimulationClock, orders: &mut Query<&mut Order>) {
    let now = clock.now();
    let next = driver.route.as_ref().and_then(|r| r.segments.front()).copied();
    match next {
        Some(segment) => {
            let eta = map.estimated_time(driver.coordinate, segment.coordinate, driver.movement_rate);
            driver.idle_since = None;
            match segment.kind {
                SegmentKind::Pickup => {
                    driver.status = DriverStatus::PickingUp;
                    if let Ok(mut order) = orders.get_mut(segment.order) {
                        order.advance_status(OrderStatus::PickingUp);
                    }
                    clock.schedule_at(now + eta, EventKind::DriverArrivedPickup, Some(EventSubject::Driver(driver_entity)));
                }
                SegmentKind::Delivery => {
                    driver.status = DriverStatus::Delivering;
                    if let Ok(mut order) = orders.get_mut(segment.order) {
                        order.advance_status(OrderStatus::Delivering);
                    }
                    clock.schedule_at(now + eta, EventKind::DriverArrivedDelivery, Some(EventSubject::Driver(driver_entity)));
                }
            }
        }
        None => {
            driver.status = DriverStatus::Available;
            driver.idle_since = Some(now);
        }
    }
}

pub fn driver_accepted_route_system(
    current: Res<CurrentEvent>,
    map: Res<Map>,
    mut clock: ResMut<SimulationClock>,
    mut drivers: Query<&mut Driver>,
    mut orders: Query<&mut Order>,
) {
    let driver_entity = driver_subject(&current);
    let mut driver = drivers.get_mut(driver_entity).expect("driver entity exists");
    if driver.status == DriverStatus::Available {
        schedule_next_leg(driver_entity, &mut driver, &map, &mut clock, &mut orders);
    }
}

/// A driver arriving at a pickup location before the order has actually
/// finished preparing parks in `PickingUpWaiting` rather than collecting it
/// early; `order_ready_system` wakes it once the order's `OrderReady` event
/// fires, so `status` never advances past what the kitchen has truly reached.
pub fn driver_arrived_pickup_system(
    current: Res<CurrentEvent>,
    map: Res<Map>,
    mut clock: ResMut<SimulationClock>,
    mut drivers: Query<&mut Driver>,
    orders: Query<&Order>,
) {
    let driver_entity = driver_subject(&current);
    let now = clock.now();
    let mut driver = drivers.get_mut(driver_entity).expect("driver entity exists");
    let segment = driver
        .route
        .as_ref()
        .and_then(|r| r.segments.front())
        .copied()
        .expect("arrived-at-pickup event fired with an empty route");
    let leg_distance = map.distance(driver.coordinate, segment.coordinate);
    driver.distance_travelled += leg_distance;
    driver.distance_travelled_delta += leg_distance;
    driver.coordinate = segment.coordinate;

    let order = orders.get(segment.order).expect("order entity exists");
    if order.prep_done() {
        clock.schedule_at(now, EventKind::DriverPickedUpOrder, Some(EventSubject::Driver(driver_entity)));
    } else {
        driver.status = DriverStatus::PickingUpWaiting;
        driver.waiting_since = Some(now);
    }
}

pub fn driver_picked_up_system(
    current: Res<CurrentEvent>,
    map: Res<Map>,
    mut clock: ResMut<SimulationClock>,
    mut reorder_log: ResMut<ReorderLog>,
    mut event_log: ResMut<EventLog>,
    mut drivers: Query<&mut Driver>,
    mut orders: Query<&mut Order>,
) {
    let driver_entity = driver_subject(&current);
    let now = clock.now();
    let mut driver = drivers.get_mut(driver_entity).expect("driver entity exists");
    let segment = driver
        .route
        .as_mut()
        .and_then(|r| r.segments.pop_front())
        .expect("picked-up event fired with an empty route");
    debug_assert_eq!(segment.kind, SegmentKind::Pickup);

    let delivery_coordinate = driver
        .route
        .as_ref()
        .and_then(|r| r.segments.iter().find(|s| s.order == segment.order && s.kind == SegmentKind::Delivery))
        .map(|s| s.coordinate)
        .expect("a just-picked-up order still has its delivery segment queued");

    let mut order = orders.get_mut(segment.order).expect("order entity exists");
    debug_assert!(order.prep_done(), "a driver can only actually pick up an order once it's ready");
    order.advance_status(OrderStatus::PickedUp);
    order.timings.picked_up_at = Some(now);
    order.timings.latest_delivery = Some(crate::reorder::latest_delivery_window(
        now,
        &map,
        driver.movement_rate,
        segment.coordinate,
        delivery_coordinate,
        driver.tolerance_percentage,
    ));
    driver.current_load += segment.required_capacity;

    try_reorder(&mut driver, &map, &orders, now, &mut reorder_log, &mut event_log);
    schedule_next_leg(driver_entity, &mut driver, &map, &mut clock, &mut orders);
}

pub fn driver_arrived_delivery_system(
    current: Res<CurrentEvent>,
    map: Res<Map>,
    mut clock: ResMut<SimulationClock>,
    mut drivers: Query<&mut Driver>,
    mut orders: Query<&mut Order>,
) {
    let driver_entity = driver_subject(&current);
    let now = clock.now();
    let mut driver = drivers.get_mut(driver_entity).expect("driver entity exists");
    let segment = driver
        .route
        .as_ref()
        .and_then(|r| r.segments.front())
        .copied()
        .expect("arrived-at-delivery event fired with an empty route");
    let leg_distance = map.distance(driver.coordinate, segment.coordinate);
    driver.distance_travelled += leg_distance;
    driver.distance_travelled_delta += leg_distance;
    driver.coordinate = segment.coordinate;

    if let Ok(mut order) = orders.get_mut(segment.order) {
        order.advance_status(OrderStatus::Received);
    }

    clock.schedule_at(now, EventKind::DriverDeliveredOrder, Some(EventSubject::Driver(driver_entity)));
}

pub fn driver_delivered_system(
    current: Res<CurrentEvent>,
    map: Res<Map>,
    mut clock: ResMut<SimulationClock>,
    mut telemetry: ResMut<SimTelemetry>,
    mut drivers: Query<&mut Driver>,
    mut orders: Query<&mut Order>,
) {
    let driver_entity = driver_subject(&current);
    let now = clock.now();
    let mut driver = drivers.get_mut(driver_entity).expect("driver entity exists");
    let segment = driver
        .route
        .as_mut()
        .and_then(|r| r.segments.pop_front())
        .expect("delivered event fired with an empty route");
    debug_assert_eq!(segment.kind, SegmentKind::Delivery);
    driver.current_load = driver.current_load.saturating_sub(segment.required_capacity);

    let mut order = orders.get_mut(segment.order).expect("order entity exists");
    let picked_up_at = order.timings.picked_up_at.unwrap_or(now);
    driver.time_spent_on_delivery += now.saturating_sub(picked_up_at);
    order.advance_status(OrderStatus::Delivered);
    order.timings.delivered_at = Some(now);

    telemetry.record_delivered(CompletedOrderRecord {
        order: segment.order,
        driver: Some(driver_entity),
        establishment: order.establishment,
        request_time: order.request_time,
        delivered_at: Some(now),
        final_status: order.status,
        total_distance: driver.distance_travelled,
    });

    schedule_next_leg(driver_entity, &mut driver, &map, &mut clock, &mut orders);
}
