use bevy_ecs::prelude::{Entity, World};

use dispatch_sim::ecs::{Driver, Order, OrderStatus};
use dispatch_sim::runner::run_next_event;
use dispatch_sim::scenario::ScenarioParams;
use dispatch_sim::test_helpers::build_world;

pub fn run_to_completion(params: ScenarioParams) -> World {
    let (mut world, mut schedule) = build_world(params);
    let mut guard = 0;
    while run_next_event(&mut world, &mut schedule).is_some() {
        guard += 1;
        assert!(guard < 500_000, "scenario did not terminate");
    }
    world
}

pub fn all_orders(world: &World) -> Vec<(Entity, OrderStatus)> {
    world
        .iter_entities()
        .filter_map(|e| e.get::<Order>().map(|o| (e.id(), o.status)))
        .collect()
}

pub fn all_drivers(world: &World) -> Vec<(Entity, &Driver)> {
    world
        .iter_entities()
        .filter_map(|e| e.get::<Driver>().map(|d| (e.id(), d)))
        .collect()
}
