//! Simulation schedule assembly and the single-event-step driver loop.
//! No async, no threads: `run_next_event` pops one event off
//! `SimulationClock` and runs exactly the systems gated to match it.

use bevy_ecs::prelude::{Entity, Schedule, World};
use bevy_ecs::schedule::apply_deferred;
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::cost::CostFunction;
use crate::ecs::{Driver, Establishment, EstablishmentQueue};
use crate::map::Map;
use crate::matching::{algorithm_for, ActiveMatcher};
use crate::profiling::EventCounters;
use crate::rng::SimRng;
use crate::scenario::ScenarioParams;
use crate::systems::*;
use crate::telemetry::{EventLog, ReorderLog, SimTelemetry};

/// Build the schedule once; reuse it for every event popped over the life
/// of a run.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((
        spawn_order_system.run_if(is_spawn_order),
        apply_deferred,
        customer_placed_order_system.run_if(is_customer_placed_order),
        establishment_accepted_system.run_if(is_establishment_accepted),
        preparation_started_system.run_if(is_preparation_started),
        order_ready_system.run_if(is_order_ready),
        apply_deferred,
        dispatch_system.run_if(is_dispatch_trigger),
        driver_accepted_route_system.run_if(is_driver_accepted_route),
        driver_arrived_pickup_system.run_if(is_driver_arrived_pickup),
        driver_picked_up_system.run_if(is_driver_picked_up),
        driver_arrived_delivery_system.run_if(is_driver_arrived_delivery),
        driver_delivered_system.run_if(is_driver_delivered),
    ));
    schedule
}

/// Spawn establishments and drivers, insert every resource the systems need,
/// seed `lambda_max`, and schedule the first `SpawnOrder` event.
pub fn initialize_simulation(world: &mut World, params: ScenarioParams) {
    let mut rng = SimRng::new(params.seed);
    let map = Map::new(params.grid_size);

    for _ in 0..params.num_establishments {
        let coordinate = map.random_point(&mut rng);
        world.spawn((
            Establishment {
                coordinate,
                catalog: (0..params.establishment.catalog_size)
                    .map(|id| crate::ecs::CatalogItem { id })
                    .collect(),
                production_capacity: params.establishment.production_capacity,
                operating_radius: params.establishment.operating_radius,
                min_prep_time: params.establishment.min_prep_time,
                max_prep_time: params.establishment.max_prep_time,
                target_prep_rate: params.establishment.target_prep_rate,
                percentage_allocation_driver: params.establishment.percentage_allocation_driver,
            },
            EstablishmentQueue::default(),
        ));
    }

    for _ in 0..params.num_drivers {
        let coordinate = map.random_point(&mut rng);
        let speed = if params.driver.max_speed > params.driver.min_speed {
            use rand::Rng;
            rng.gen_range(params.driver.min_speed..=params.driver.max_speed)
        } else {
            params.driver.min_speed
        };
        world.spawn(Driver::new(
            coordinate,
            speed,
            params.driver.max_capacity,
            params.driver.max_delay_percentage,
        ));
    }

    let lambda_max = params.order_rate.estimate_lambda_max(params.time_window);
    let cost_fn = CostFunction::default();
    let matcher = algorithm_for(params.matching.kind, cost_fn, params.matching.eta_weight);

    let mut clock = SimulationClock::default();
    clock.schedule_at(0, EventKind::SimulationStarted, None);
    let first_arrival = crate::distributions::next_poisson_arrival(
        &mut rng,
        &params.order_rate,
        lambda_max,
        params.time_window,
        0.0,
    );
    let generator_t = first_arrival.unwrap_or(params.time_window);
    if let Some(first_arrival) = first_arrival {
        clock.schedule_at(first_arrival.ceil() as u64, EventKind::SpawnOrder, None);
    }

    world.insert_resource(clock);
    world.insert_resource(rng);
    world.insert_resource(map);
    world.insert_resource(cost_fn);
    world.insert_resource(ActiveMatcher(matcher));
    world.insert_resource(GeneratorState { t: generator_t, lambda_max });
    world.insert_resource(SimTelemetry::default());
    world.insert_resource(EventCounters::default());
    world.insert_resource(EventLog::default());
    world.insert_resource(ReorderLog::default());
    world.insert_resource(params);
}

/// Pop and run exactly one event. Returns `None` once the clock is empty.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> Option<Event> {
    run_next_event_with_hook(world, schedule, |_, _| {})
}

/// As `run_next_event`, but calls `hook(world, &event)` after the event's
/// systems have run, so callers (tests, the agent adapter) can observe
/// side effects without re-deriving them from telemetry.
pub fn run_next_event_with_hook(
    world: &mut World,
    schedule: &mut Schedule,
    mut hook: impl FnMut(&World, &Event),
) -> Option<Event> {
    let event = {
        let mut clock = world.resource_mut::<SimulationClock>();
        clock.pop_next()?
    };
    world.insert_resource(CurrentEvent(event));
    if let Some(mut counters) = world.get_resource_mut::<EventCounters>() {
        counters.record(event.kind);
    }
    if is_loggable_event(event.kind) {
        if let Some(mut log) = world.get_resource_mut::<EventLog>() {
            log.record(event.timestamp, event.kind, event.subject);
        }
    }
    schedule.run(world);
    hook(world, &event);
    Some(event)
}

/// Which event kinds belong in `EventLog`: the order/driver lifecycle
/// milestones telemetry consumers actually want a timeline of. Clock
/// bookkeeping (`SimulationStarted`, `SpawnOrder`) and the two-phase
/// arrived/acted split's "arrived" half are left out as noise; `RouteReordered`
/// is recorded directly at its call site in `movement::try_reorder` since it's
/// never scheduled on the clock heap in the first place.
fn is_loggable_event(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::CustomerPlacedOrder
            | EventKind::EstablishmentAcceptedOrder
            | EventKind::OrderReady
            | EventKind::DriverAcceptedRoute
            | EventKind::DriverPickedUpOrder
            | EventKind::DriverDeliveredOrder
    )
}

/// Run events until the clock is empty or `should_stop` returns `true` after
/// an event. Used by tests driving a scenario to completion.
pub fn run_until<F>(world: &mut World, schedule: &mut Schedule, mut should_stop: F)
where
    F: FnMut(&World, &Event) -> bool,
{
    while let Some(event) = run_next_event(world, schedule) {
        if should_stop(world, &event) {
            break;
        }
    }
}

/// Run until the clock has no more events pending.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule) {
    while run_next_event(world, schedule).is_some() {}
}

/// All drivers currently in the world, for agent observation building.
pub fn driver_entities(world: &mut World) -> Vec<Entity> {
    let mut query = world.query::<(Entity, &Driver)>();
    query.iter(world).map(|(e, _)| e).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioParams;

    #[test]
    fn initialize_spawns_establishments_and_drivers() {
        let mut world = World::new();
        let params = ScenarioParams::default()
            .with_num_establishments(2)
            .with_num_drivers(3)
            .with_seed(1);
        initialize_simulation(&mut world, params);

        let mut establishments = world.query::<&Establishment>();
        assert_eq!(establishments.iter(&world).count(), 2);
        let mut drivers = world.query::<&Driver>();
        assert_eq!(drivers.iter(&world).count(), 3);
    }

    #[test]
    fn run_until_empty_terminates() {
        let mut world = World::new();
        let params = ScenarioParams::default()
            .with_seed(2)
            .with_time_window(20.0)
            .with_num_drivers(2)
            .with_num_establishments(1);
        initialize_simulation(&mut world, params);
        let mut schedule = simulation_schedule();
        let mut steps = 0;
        while run_next_event(&mut world, &mut schedule).is_some() {
            steps += 1;
            assert!(steps < 100_000, "simulation did not terminate");
        }
    }
}
