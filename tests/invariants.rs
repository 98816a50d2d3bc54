mod support;

use dispatch_sim::ecs::{Order, OrderStatus};
use dispatch_sim::test_helpers::small_scenario;
use dispatch_sim::telemetry::EventLog;

#[test]
fn delivered_orders_are_never_delivered_before_they_are_picked_up() {
    let world = support::run_to_completion(small_scenario());
    for order in world.iter_entities().filter_map(|e| e.get::<Order>()) {
        if order.status != OrderStatus::Delivered {
            continue;
        }
        let picked_up_at = order
            .timings
            .picked_up_at
            .expect("a delivered order was always picked up first");
        let delivered_at = order.timings.delivered_at.expect("delivered order has a delivery timestamp");
        assert!(
            picked_up_at <= delivered_at,
            "order delivered at {delivered_at} before it was picked up at {picked_up_at}"
        );
    }
}

#[test]
fn every_driver_accepted_order_has_a_driver() {
    let world = support::run_to_completion(small_scenario());
    for entity in world.iter_entities() {
        let Some(order) = entity.get::<Order>() else {
            continue;
        };
        if order.status >= OrderStatus::DriverAccepted {
            assert!(order.driver.is_some(), "order past DriverAccepted has no assigned driver");
        }
    }
}

/// A driver that reaches a pickup location before the establishment has
/// actually finished preparing the order must wait, not collect it early:
/// with every order early-released and prep always slower than travel, every
/// pickup in this scenario goes through the wait state at least once.
#[test]
fn early_released_driver_waits_rather_than_collecting_an_unready_order() {
    let mut params = small_scenario()
        .with_num_drivers(1)
        .with_num_establishments(1)
        .with_time_window(30.0);
    params.establishment.percentage_allocation_driver = 1.0;
    params.establishment.min_prep_time = 50.0;
    params.establishment.max_prep_time = 50.0;
    params.driver.min_speed = 100.0;
    params.driver.max_speed = 100.0;

    let world = support::run_to_completion(params);
    let (_, driver) = support::all_drivers(&world).into_iter().next().expect("one driver");
    assert!(
        driver.waiting_time > 0,
        "a driver arriving long before prep finishes should accumulate waiting_time"
    );
}

#[test]
fn event_log_records_order_lifecycle_milestones() {
    let world = support::run_to_completion(small_scenario());
    let log = world.resource::<EventLog>();
    assert!(log.entries().len() >= log.count(dispatch_sim::clock::EventKind::CustomerPlacedOrder));
}
