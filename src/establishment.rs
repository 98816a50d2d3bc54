//! Establishment order queue and production-capacity semaphore.
//!
//! Kept as plain functions over `Establishment`/`EstablishmentQueue`
//! components rather than ECS systems themselves, so the event systems in
//! `systems/` stay thin dispatchers and this logic stays unit-testable
//! without spinning up a `World`.

use bevy_ecs::prelude::Entity;

use crate::distributions::sample_prep_time;
use crate::ecs::{Establishment, EstablishmentQueue};
use crate::rng::SimRng;

/// Queue an accepted order; if a production slot is free, immediately claim
/// it and return the order as ready to start preparing.
pub fn accept_order(queue: &mut EstablishmentQueue, establishment: &Establishment, order: Entity) -> Option<Entity> {
    queue.pending.push_back(order);
    try_start_next(queue, establishment)
}

/// Claim a free production slot for the next queued order, if any and if
/// capacity allows. Call this whenever a slot frees up (an order becomes
/// `Ready`) in addition to right after `accept_order`.
pub fn try_start_next(queue: &mut EstablishmentQueue, establishment: &Establishment) -> Option<Entity> {
    if queue.prep_slots_in_use >= establishment.production_capacity {
        return None;
    }
    let order = queue.pending.pop_front()?;
    queue.prep_slots_in_use += 1;
    Some(order)
}

/// Release a production slot once an order becomes `Ready`.
pub fn release_slot(queue: &mut EstablishmentQueue) {
    queue.prep_slots_in_use = queue.prep_slots_in_use.saturating_sub(1);
}

/// Draw a preparation duration for a freshly-accepted order.
pub fn roll_prep_duration(establishment: &Establishment, rng: &mut SimRng) -> f64 {
    sample_prep_time(
        rng,
        establishment.min_prep_time,
        establishment.max_prep_time,
        establishment.target_prep_rate,
    )
}

/// Whether this order should be handed to the core-event (driver-matching)
/// queue the instant it's accepted, rather than waiting until it's `Ready`.
pub fn should_release_driver_early(establishment: &Establishment, rng: &mut SimRng) -> bool {
    use rand::Rng;
    rng.gen::<f64>() < establishment.percentage_allocation_driver
}
