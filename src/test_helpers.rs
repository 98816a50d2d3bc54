//! Shared builders for unit and integration tests. Gated behind the
//! `test-helpers` feature (on by default) rather than `#[cfg(test)]` alone,
//! so `tests/*.rs` integration tests can use it too.

use bevy_ecs::prelude::{Schedule, World};

use crate::runner::{initialize_simulation, simulation_schedule};
use crate::scenario::ScenarioParams;

/// A small, fast-terminating scenario: one establishment, two drivers, a
/// short time window. Good default for tests that just need *a* world.
pub fn small_scenario() -> ScenarioParams {
    ScenarioParams::default()
        .with_seed(42)
        .with_grid_size(20)
        .with_num_establishments(1)
        .with_num_drivers(2)
        .with_time_window(50.0)
        .with_max_time_step(500)
}

/// Build and initialize a `World` + `Schedule` pair from `params`, ready for
/// `runner::run_next_event`/`run_until_empty`.
pub fn build_world(params: ScenarioParams) -> (World, Schedule) {
    let mut world = World::new();
    initialize_simulation(&mut world, params);
    let schedule = simulation_schedule();
    (world, schedule)
}
