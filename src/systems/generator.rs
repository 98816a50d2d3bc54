//! The order generator: a non-homogeneous Poisson process over
//! customer-placed orders, each assigned to a uniformly-chosen establishment
//! with its customer positioned in a Gaussian disk around it.

use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut, Resource};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::distributions::{next_poisson_arrival, sample_customer_position};
use crate::ecs::{Customer, Establishment, Order, OrderTimings};
use crate::map::Map;
use crate::rng::SimRng;
use crate::scenario::ScenarioParams;
use crate::telemetry::SimTelemetry;

/// Cursor state for the Poisson thinning loop. `lambda_max` is
/// estimated once at `initialize_simulation` time.
#[derive(Debug, Resource)]
pub struct GeneratorState {
    pub t: f64,
    pub lambda_max: f64,
}

pub fn spawn_order_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    mut rng: ResMut<SimRng>,
    mut telemetry: ResMut<SimTelemetry>,
    mut generator: ResMut<GeneratorState>,
    params: Res<ScenarioParams>,
    map: Res<Map>,
    establishments: Query<(Entity, &Establishment)>,
) {
    let now = clock.now();
    let targets: Vec<(Entity, &Establishment)> = establishments.iter().collect();
    if targets.is_empty() {
        return;
    }
    let (establishment_entity, establishment) = targets[rng.gen_range(0..targets.len())];

    let customer_position =
        sample_customer_position(&mut rng, &map, establishment.coordinate, establishment.operating_radius);
    let customer = commands.spawn(Customer {
        coordinate: customer_position,
    }).id();

    let item_count = establishment.catalog.len().min(2);
    let items = establishment
        .catalog
        .choose_multiple(&mut rng.0, item_count)
        .map(|item| item.id)
        .collect();

    let order = commands
        .spawn(Order {
            customer,
            establishment: establishment_entity,
            request_time: now,
            items,
            required_capacity: 1,
            status: crate::ecs::OrderStatus::Created,
            driver: None,
            pickup_segment_id: None,
            delivery_segment_id: None,
            timings: OrderTimings::default(),
        })
        .id();
    telemetry.record_generated();
    clock.schedule_at(now, EventKind::CustomerPlacedOrder, Some(EventSubject::Order(order)));

    if let Some(next_t) = next_poisson_arrival(
        &mut rng,
        &params.order_rate,
        generator.lambda_max,
        params.time_window,
        generator.t,
    ) {
        generator.t = next_t;
        clock.schedule_at(next_t.ceil() as u64, EventKind::SpawnOrder, None);
    }
}
