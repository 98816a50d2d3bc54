//! Matching pass: drains the core-event queue of orders waiting for a driver
//! and tries to place each one, either starting a fresh route or splicing
//! into an existing one. Orders that find no feasible driver go back on the
//! queue and wait for the next order-ready or delivery event to retry.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};

use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::cost::CostFunction;
use crate::ecs::{Customer, Driver, Establishment, Order, OrderStatus};
use crate::map::Map;
use crate::matching::{ActiveMatcher, DriverCandidate, OrderRequest};
use crate::reorder::try_insert_order;
use crate::rng::SimRng;

pub fn dispatch_system(
    mut clock: ResMut<SimulationClock>,
    mut rng: ResMut<SimRng>,
    map: Res<Map>,
    cost_fn: Res<CostFunction>,
    matcher: Res<ActiveMatcher>,
    mut orders: Query<&mut Order>,
    customers: Query<&Customer>,
    establishments: Query<&Establishment>,
    mut drivers: Query<(Entity, &mut Driver)>,
) {
    let mut pending = Vec::new();
    while let Some(core_event) = clock.pop_core_event() {
        pending.push(core_event.order);
    }

    let now = clock.now();
    for order_entity in pending {
        let Ok(order) = orders.get(order_entity) else {
            continue;
        };
        if order.status >= OrderStatus::DriverAccepted {
            continue;
        }
        let establishment = establishments
            .get(order.establishment)
            .expect("establishment entity exists");
        let customer = customers.get(order.customer).expect("customer entity exists");
        let request = OrderRequest {
            pickup: establishment.coordinate,
            delivery: customer.coordinate,
            required_capacity: order.required_capacity,
        };

        let candidates: Vec<DriverCandidate> = drivers
            .iter()
            .map(|(entity, driver)| DriverCandidate {
                entity,
                coordinate: driver.coordinate,
                route_tail: driver.route_tail_coordinate(),
                movement_rate: driver.movement_rate,
                spare_capacity: driver
                    .max_capacity
                    .saturating_sub(driver.route.as_ref().map(|r| r.required_capacity()).unwrap_or(0)),
            })
            .collect();

        let chosen = matcher.0.find_match(&request, &candidates, &map, &mut rng);

        let Some(driver_entity) = chosen else {
            clock.push_core_event(order_entity);
            continue;
        };

        let (_, mut driver) = drivers.get_mut(driver_entity).expect("chosen driver exists");
        let was_idle = driver.route.is_none();
        let inserted = try_insert_order(
            &mut driver,
            &map,
            &cost_fn,
            order_entity,
            request.pickup,
            request.delivery,
            request.required_capacity,
        );
        if !inserted {
            clock.push_core_event(order_entity);
            continue;
        }
        driver.accepted_orders.push(order_entity);

        let mut order = orders.get_mut(order_entity).expect("order entity exists");
        order.advance_status(OrderStatus::DriverAccepted);
        order.driver = Some(driver_entity);
        order.timings.driver_accepted_at = Some(now);

        if was_idle {
            clock.schedule_at(now, EventKind::DriverAcceptedRoute, Some(EventSubject::Driver(driver_entity)));
        }
    }
}
