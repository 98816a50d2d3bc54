//! Event-driven ECS systems, one family per lifecycle stage, wired together
//! by `run_if` conditions in `runner::simulation_schedule`.
//! No system runs unless the popped event matches its condition — the
//! schedule itself is the event dispatch table.

mod dispatch;
mod generator;
mod movement;
mod order_lifecycle;

pub use dispatch::dispatch_system;
pub use generator::{spawn_order_system, GeneratorState};
pub use movement::{
    driver_accepted_route_system, driver_arrived_delivery_system, driver_arrived_pickup_system,
    driver_delivered_system, driver_picked_up_system,
};
pub use order_lifecycle::{
    customer_placed_order_system, establishment_accepted_system, order_ready_system,
    preparation_started_system,
};

use bevy_ecs::prelude::Res;

use crate::clock::{CurrentEvent, EventKind};

fn is_kind(current: &CurrentEvent, kind: EventKind) -> bool {
    current.0.kind == kind
}

pub fn is_spawn_order(current: Res<CurrentEvent>) -> bool {
    is_kind(&current, EventKind::SpawnOrder)
}
pub fn is_customer_placed_order(current: Res<CurrentEvent>) -> bool {
    is_kind(&current, EventKind::CustomerPlacedOrder)
}
pub fn is_establishment_accepted(current: Res<CurrentEvent>) -> bool {
    is_kind(&current, EventKind::EstablishmentAcceptedOrder)
}
pub fn is_preparation_started(current: Res<CurrentEvent>) -> bool {
    is_kind(&current, EventKind::PreparationStarted)
}
pub fn is_order_ready(current: Res<CurrentEvent>) -> bool {
    is_kind(&current, EventKind::OrderReady)
}
pub fn is_driver_accepted_route(current: Res<CurrentEvent>) -> bool {
    is_kind(&current, EventKind::DriverAcceptedRoute)
}
pub fn is_driver_arrived_pickup(current: Res<CurrentEvent>) -> bool {
    is_kind(&current, EventKind::DriverArrivedPickup)
}
pub fn is_driver_picked_up(current: Res<CurrentEvent>) -> bool {
    is_kind(&current, EventKind::DriverPickedUpOrder)
}
pub fn is_driver_arrived_delivery(current: Res<CurrentEvent>) -> bool {
    is_kind(&current, EventKind::DriverArrivedDelivery)
}
pub fn is_driver_delivered(current: Res<CurrentEvent>) -> bool {
    is_kind(&current, EventKind::DriverDeliveredOrder)
}
pub fn is_reorder_check(current: Res<CurrentEvent>) -> bool {
    is_kind(&current, EventKind::ReorderCheck)
}
/// Any event that can free up driver capacity or add a fresh order to the
/// matching pool triggers a dispatch pass.
pub fn is_dispatch_trigger(current: Res<CurrentEvent>) -> bool {
    matches!(
        current.0.kind,
        EventKind::OrderReady | EventKind::ReorderCheck | EventKind::DriverDeliveredOrder
    )
}
