//! Order state machine transitions up to `Ready`: placing,
//! establishment acceptance, preparation, and release to the matching pool.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::{Driver, DriverStatus, Establishment, EstablishmentQueue, Order, OrderStatus, SegmentKind};
use crate::establishment::{accept_order, release_slot, roll_prep_duration, should_release_driver_early, try_start_next};
use crate::rng::SimRng;

fn order_subject(current: &CurrentEvent) -> bevy_ecs::prelude::Entity {
    match current.0.subject {
        Some(EventSubject::Order(order)) => order,
        _ => panic!("expected an Order event subject for {:?}", current.0.kind),
    }
}

pub fn customer_placed_order_system(
    current: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut orders: Query<&mut Order>,
) {
    let order_entity = order_subject(&current);
    let mut order = orders.get_mut(order_entity).expect("order entity exists");
    order.advance_status(OrderStatus::Placed);
    let now = clock.now();
    clock.schedule_at(
        now,
        EventKind::EstablishmentAcceptedOrder,
        Some(EventSubject::Order(order_entity)),
    );
}

pub fn establishment_accepted_system(
    current: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut rng: ResMut<SimRng>,
    mut orders: Query<&mut Order>,
    mut queues: Query<(&Establishment, &mut EstablishmentQueue)>,
) {
    let order_entity = order_subject(&current);
    let establishment_entity = {
        let mut order = orders.get_mut(order_entity).expect("order entity exists");
        order.advance_status(OrderStatus::EstablishmentAccepted);
        order.establishment
    };
    let (establishment, mut queue) = queues
        .get_mut(establishment_entity)
        .expect("establishment entity exists");

    if should_release_driver_early(establishment, &mut rng) {
        clock.push_core_event(order_entity);
    }

    let now = clock.now();
    if let Some(started) = accept_order(&mut queue, establishment, order_entity) {
        debug_assert_eq!(started, order_entity);
        clock.schedule_at(now, EventKind::PreparationStarted, Some(EventSubject::Order(order_entity)));
    }
}

pub fn preparation_started_system(
    current: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut rng: ResMut<SimRng>,
    mut orders: Query<&mut Order>,
    establishments: Query<&Establishment>,
) {
    let order_entity = order_subject(&current);
    let now = clock.now();
    let mut order = orders.get_mut(order_entity).expect("order entity exists");
    order.advance_status(OrderStatus::Preparing);
    let establishment = establishments
        .get(order.establishment)
        .expect("establishment entity exists");
    let duration = roll_prep_duration(establishment, &mut rng).ceil() as u64;
    order.timings.estimated_preparation_duration = Some(duration);
    order.timings.estimated_ready_time = Some(now + duration);
    clock.schedule_at(now + duration, EventKind::OrderReady, Some(EventSubject::Order(order_entity)));
}

pub fn order_ready_system(
    current: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut orders: Query<&mut Order>,
    mut queues: Query<(&Establishment, &mut EstablishmentQueue)>,
    mut drivers: Query<(Entity, &mut Driver)>,
) {
    let order_entity = order_subject(&current);
    let now = clock.now();
    let establishment_entity = {
        let mut order = orders.get_mut(order_entity).expect("order entity exists");
        order.advance_status(OrderStatus::Ready);
        order.timings.time_order_became_ready = Some(now);
        order.establishment
    };

    let (establishment, mut queue) = queues
        .get_mut(establishment_entity)
        .expect("establishment entity exists");
    release_slot(&mut queue);
    if let Some(next_order) = try_start_next(&mut queue, establishment) {
        clock.schedule_at(now, EventKind::PreparationStarted, Some(EventSubject::Order(next_order)));
    }

    if order_is_already_queued_for_dispatch(order_entity, &orders) {
        wake_waiting_driver(order_entity, now, &mut drivers, &mut clock);
    } else {
        clock.push_core_event(order_entity);
    }
}

/// A driver that reached the pickup location before this order actually
/// finished preparing parks in `PickingUpWaiting` instead of collecting it
/// early; once the order's `OrderReady` event lands, fold the elapsed wait
/// into `waiting_time` and let the pickup proceed.
fn wake_waiting_driver(order_entity: Entity, now: u64, drivers: &mut Query<(Entity, &mut Driver)>, clock: &mut SimulationClock) {
    for (driver_entity, mut driver) in drivers.iter_mut() {
        if driver.status != DriverStatus::PickingUpWaiting {
            continue;
        }
        let is_waiting_on_this_order = driver
            .route
            .as_ref()
            .and_then(|r| r.segments.front())
            .is_some_and(|s| s.kind == SegmentKind::Pickup && s.order == order_entity);
        if !is_waiting_on_this_order {
            continue;
        }
        if let Some(since) = driver.waiting_since.take() {
            driver.waiting_time += now.saturating_sub(since);
        }
        driver.status = DriverStatus::PickingUp;
        clock.schedule_at(now, EventKind::DriverPickedUpOrder, Some(EventSubject::Driver(driver_entity)));
        return;
    }
}

/// An order already assigned to a driver (e.g. via the early-release path)
/// shouldn't be pushed onto the core-event queue a second time.
fn order_is_already_queued_for_dispatch(order_entity: bevy_ecs::prelude::Entity, orders: &Query<&mut Order>) -> bool {
    orders
        .get(order_entity)
        .map(|o| o.driver.is_some())
        .unwrap_or(false)
}
