//! Gym-like `reset`/`step` adapter over the event kernel.
//!
//! Unlike a free-running scenario (driven end to end by `runner::run_until_empty`
//! with the configured `MatchingAlgorithm`), an `AgentEnv` pauses at every
//! order that needs a driver and hands the decision to the caller: `step`
//! takes a driver index instead of letting `dispatch_system` pick one.

use bevy_ecs::prelude::{Entity, Schedule, World};
use bevy_ecs::schedule::apply_deferred;
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::SimulationClock;
use crate::cost::CostFunction;
use crate::ecs::{Customer, Driver, Establishment, Order, OrderStatus};
use crate::errors::StepError;
use crate::map::{Coordinate, Map};
use crate::profiling::EventCounters;
use crate::reorder::try_insert_order;
use crate::runner::run_next_event_with_hook;
use crate::scenario::{RewardObjective, ScenarioParams};
use crate::systems::{
    customer_placed_order_system, driver_accepted_route_system, driver_arrived_delivery_system,
    driver_arrived_pickup_system, driver_delivered_system, driver_picked_up_system,
    establishment_accepted_system, is_customer_placed_order, is_driver_accepted_route,
    is_driver_arrived_delivery, is_driver_arrived_pickup, is_driver_delivered, is_driver_picked_up,
    is_establishment_accepted, is_order_ready, is_preparation_started, is_spawn_order,
    order_ready_system, preparation_started_system, spawn_order_system,
};
use crate::telemetry::SimTelemetry;

/// What the agent sees before deciding which driver takes the pending order.
#[derive(Debug, Clone)]
pub struct Observation {
    pub time: u64,
    pub pending_order_pickup: Coordinate,
    pub pending_order_delivery: Coordinate,
    pub pending_order_required_capacity: u32,
    pub driver_positions: Vec<Coordinate>,
    pub driver_spare_capacity: Vec<u32>,
    pub orders_generated: u64,
    pub orders_delivered: u64,
}

#[derive(Debug, Clone, Default)]
pub struct StepInfo {
    pub event_counts_total: u64,
    pub orders_delivered: u64,
    pub orders_abandoned: u64,
    pub assignment_accepted: bool,
}

pub struct AgentEnv {
    params: ScenarioParams,
    world: Option<World>,
    schedule: Schedule,
    pending_order: Option<Entity>,
    step_count: u64,
}

impl AgentEnv {
    pub fn new(params: ScenarioParams) -> Self {
        Self {
            params,
            world: None,
            schedule: decision_schedule(),
            pending_order: None,
            step_count: 0,
        }
    }

    /// Rebuild the world from scratch (optionally re-seeding), advance to
    /// the first decision point, and return the initial observation.
    pub fn reset(&mut self, seed: Option<u64>) -> (Observation, StepInfo) {
        let mut params = self.params.clone();
        if let Some(seed) = seed {
            params.seed = Some(seed);
        }
        let mut world = World::new();
        crate::runner::initialize_simulation(&mut world, params);
        self.world = Some(world);
        self.step_count = 0;
        self.pending_order = None;
        let info = self.advance_to_decision_point();
        (self.observe(), info)
    }

    /// Assign the currently-pending order to `driver_index`-th driver
    /// (stable entity order), then advance to the next decision point or
    /// episode end.
    pub fn step(&mut self, driver_index: usize) -> Result<(Observation, f64, bool, bool, StepInfo), StepError> {
        let world = self.world.as_mut().ok_or(StepError::NotReset)?;
        let drivers = driver_entities_sorted(world);
        if driver_index >= drivers.len() {
            return Err(StepError::ActionOutOfRange {
                action: driver_index,
                num_drivers: drivers.len(),
            });
        }
        let driver_entity = drivers[driver_index];
        let order_entity = self.pending_order.take();

        let mut assignment_accepted = false;
        if let Some(order_entity) = order_entity {
            assignment_accepted = assign_order_to_driver(world, order_entity, driver_entity);
            if !assignment_accepted {
                world.resource_mut::<SimulationClock>().push_core_event(order_entity);
            }
        }

        self.step_count += 1;
        let mut info = self.advance_to_decision_point();
        info.assignment_accepted = assignment_accepted;

        let clock_empty = self.world.as_ref().unwrap().resource::<SimulationClock>().is_empty();
        let truncated = self.step_count >= self.params.max_time_step && !clock_empty;
        let terminated = clock_empty && self.pending_order.is_none();

        let reward = self.compute_reward(terminated, truncated);
        self.reset_distance_delta();
        Ok((self.observe(), reward, terminated, truncated, info))
    }

    /// Zero every driver's per-step distance-delta counter (reward
    /// objectives 4/8/9/10 read the delta accrued since the last call).
    fn reset_distance_delta(&mut self) {
        let world = self.world.as_mut().expect("reset() called before step()");
        let mut query = world.query::<&mut Driver>();
        for mut driver in query.iter_mut(world) {
            driver.distance_travelled_delta = 0.0;
        }
    }

    /// Run events until a core event surfaces a pending order, the clock
    /// empties, or the step budget is exhausted.
    fn advance_to_decision_point(&mut self) -> StepInfo {
        let world = self.world.as_mut().expect("reset() called before step()");
        let mut info = StepInfo::default();
        loop {
            if let Some(order) = world.resource_mut::<SimulationClock>().pop_core_event() {
                self.pending_order = Some(order.order);
                break;
            }
            if world.resource::<SimulationClock>().is_empty() {
                break;
            }
            if self.step_count >= self.params.max_time_step {
                break;
            }
            let popped = run_next_event_with_hook(world, &mut self.schedule, |_, _| {});
            if popped.is_none() {
                break;
            }
        }
        info.event_counts_total = world.resource::<EventCounters>().total();
        let telemetry = world.resource::<SimTelemetry>();
        info.orders_delivered = telemetry.orders_delivered;
        info.orders_abandoned = telemetry.orders_abandoned;
        info
    }

    fn observe(&self) -> Observation {
        let world = self.world.as_ref().expect("reset() called before step()");
        let map = world.resource::<Map>();
        let telemetry = world.resource::<SimTelemetry>();
        let drivers = driver_entities_sorted(world);
        let driver_positions: Vec<Coordinate> = drivers
            .iter()
            .map(|&e| world.get::<Driver>(e).expect("driver exists").coordinate)
            .collect();
        let driver_spare_capacity: Vec<u32> = drivers
            .iter()
            .map(|&e| {
                let driver = world.get::<Driver>(e).expect("driver exists");
                driver
                    .max_capacity
                    .saturating_sub(driver.route.as_ref().map(|r| r.required_capacity()).unwrap_or(0))
            })
            .collect();

        let (pickup, delivery, capacity) = match self.pending_order {
            Some(order_entity) => {
                let order = world.get::<Order>(order_entity).expect("order exists");
                let establishment = world
                    .get::<Establishment>(order.establishment)
                    .expect("establishment exists");
                let customer = world.get::<Customer>(order.customer).expect("customer exists");
                (establishment.coordinate, customer.coordinate, order.required_capacity)
            }
            None => (Coordinate::new(0, 0), Coordinate::new(0, 0), 0),
        };

        Observation {
            time: world.resource::<SimulationClock>().now(),
            pending_order_pickup: pickup,
            pending_order_delivery: delivery,
            pending_order_required_capacity: capacity,
            driver_positions,
            driver_spare_capacity,
            orders_generated: telemetry.orders_generated,
            orders_delivered: telemetry.orders_delivered,
        }
    }

    /// Reward for the objective selected by the scenario, following the
    /// ten-objective family: 1-4 are per-step sums over every driver
    /// (busy time, remaining distance, time spent on delivery, distance
    /// delta), 5-8 are the same four bodies but only paid at episode end,
    /// and 9/10 add a late-order penalty to objectives 3 and 7
    /// respectively. Truncation with undelivered orders additionally docks
    /// every objective `-10000` per undelivered order, plus `-2*max_distance`
    /// per undelivered order for the distance-based objectives (2/4/6/8).
    fn compute_reward(&self, terminated: bool, truncated: bool) -> f64 {
        let world = self.world.as_ref().expect("reset() called before step()");
        let telemetry = world.resource::<SimTelemetry>();
        let map = world.resource::<Map>();
        let drivers = driver_entities_sorted(world);

        let total_busy_time: u64 = drivers
            .iter()
            .map(|&e| world.get::<Driver>(e).expect("driver exists").estimate_total_busy_time(map))
            .sum();
        let total_remaining_distance: f64 = drivers
            .iter()
            .map(|&e| world.get::<Driver>(e).expect("driver exists").total_remaining_distance(map))
            .sum();
        let total_time_on_delivery: u64 = drivers
            .iter()
            .map(|&e| world.get::<Driver>(e).expect("driver exists").time_spent_on_delivery)
            .sum();
        let total_distance_delta: f64 = drivers
            .iter()
            .map(|&e| world.get::<Driver>(e).expect("driver exists").distance_travelled_delta)
            .sum();

        let episode_ending = terminated || truncated;
        let undelivered = telemetry
            .orders_generated
            .saturating_sub(telemetry.orders_delivered);

        let objective: RewardObjective = self.params.reward_objective;
        let mut reward = match objective {
            1 => -(total_busy_time as f64),
            2 => -total_remaining_distance,
            3 => -(total_time_on_delivery as f64),
            4 => -total_distance_delta,
            5 => episodic_or_zero(episode_ending, -(total_busy_time as f64)),
            6 => episodic_or_zero(episode_ending, -total_remaining_distance),
            7 => episodic_or_zero(episode_ending, -(total_time_on_delivery as f64)),
            8 => episodic_or_zero(episode_ending, -total_distance_delta),
            9 => -(total_time_on_delivery as f64) - late_order_penalty(truncated, undelivered),
            10 => episodic_or_zero(episode_ending, -(total_time_on_delivery as f64)) - late_order_penalty(truncated, undelivered),
            _ => -(total_distance_delta + total_busy_time as f64),
        };

        if truncated && undelivered > 0 {
            reward -= 10_000.0 * undelivered as f64;
            if matches!(objective, 2 | 4 | 6 | 8) {
                reward -= 2.0 * map.max_distance() * undelivered as f64;
            }
        }
        reward
    }
}

fn episodic_or_zero(episode_ending: bool, value: f64) -> f64 {
    if episode_ending {
        value
    } else {
        0.0
    }
}

/// The `5x` per-undelivered-order penalty objectives 9 and 10 add on top of
/// their base body whenever the episode ends in truncation.
fn late_order_penalty(truncated: bool, undelivered: u64) -> f64 {
    if truncated {
        5.0 * undelivered as f64
    } else {
        0.0
    }
}

fn driver_entities_sorted(world: &World) -> Vec<Entity> {
    let mut entities: Vec<Entity> = world
        .iter_entities()
        .filter(|e| e.contains::<Driver>())
        .map(|e| e.id())
        .collect();
    entities.sort_by_key(|e| e.index());
    entities
}

/// Try to splice `order` into `driver`'s route; on success, advance the
/// order to `DriverAccepted` and record timings (mirrors `dispatch_system`'s
/// assignment path, minus the `MatchingAlgorithm` lookup).
fn assign_order_to_driver(world: &mut World, order_entity: Entity, driver_entity: Entity) -> bool {
    let now = world.resource::<SimulationClock>().now();
    let map = *world.resource::<Map>();
    let cost_fn = *world.resource::<CostFunction>();

    let (pickup, delivery, required_capacity) = {
        let order = world.get::<Order>(order_entity).expect("order exists");
        let establishment = world
            .get::<Establishment>(order.establishment)
            .expect("establishment exists");
        let customer = world.get::<Customer>(order.customer).expect("customer exists");
        (establishment.coordinate, customer.coordinate, order.required_capacity)
    };

    let was_idle = {
        let mut driver = world.get_mut::<Driver>(driver_entity).expect("driver exists");
        let was_idle = driver.route.is_none();
        let inserted = try_insert_order(
            &mut driver,
            &map,
            &cost_fn,
            order_entity,
            pickup,
            delivery,
            required_capacity,
        );
        if !inserted {
            return false;
        }
        driver.accepted_orders.push(order_entity);
        was_idle
    };

    {
        let mut order = world.get_mut::<Order>(order_entity).expect("order exists");
        order.advance_status(OrderStatus::DriverAccepted);
        order.driver = Some(driver_entity);
        order.timings.driver_accepted_at = Some(now);
    }

    if was_idle {
        let mut clock = world.resource_mut::<SimulationClock>();
        clock.schedule_at(
            now,
            crate::clock::EventKind::DriverAcceptedRoute,
            Some(crate::clock::EventSubject::Driver(driver_entity)),
        );
    }
    true
}

/// The same schedule as `runner::simulation_schedule` minus `dispatch_system`:
/// the agent makes every matching decision instead of the built-in matcher.
fn decision_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((
        spawn_order_system.run_if(is_spawn_order),
        apply_deferred,
        customer_placed_order_system.run_if(is_customer_placed_order),
        establishment_accepted_system.run_if(is_establishment_accepted),
        preparation_started_system.run_if(is_preparation_started),
        order_ready_system.run_if(is_order_ready),
        apply_deferred,
        driver_accepted_route_system.run_if(is_driver_accepted_route),
        driver_arrived_pickup_system.run_if(is_driver_arrived_pickup),
        driver_picked_up_system.run_if(is_driver_picked_up),
        driver_arrived_delivery_system.run_if(is_driver_arrived_delivery),
        driver_delivered_system.run_if(is_driver_delivered),
    ));
    schedule
}
