//! Performance benchmarks using Criterion.rs.

use bevy_ecs::prelude::World;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dispatch_sim::runner::{initialize_simulation, run_until_empty, simulation_schedule};
use dispatch_sim::scenario::ScenarioParams;

fn bench_simulation_run(c: &mut Criterion) {
    let scenarios = vec![("small", 3, 4), ("medium", 10, 20), ("large", 20, 50)];

    let mut group = c.benchmark_group("simulation_run");
    for (name, establishments, drivers) in scenarios {
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &(establishments, drivers),
            |b, &(establishments, drivers)| {
                b.iter(|| {
                    let mut world = World::new();
                    let params = ScenarioParams::default()
                        .with_seed(42)
                        .with_num_establishments(establishments)
                        .with_num_drivers(drivers)
                        .with_time_window(200.0)
                        .with_max_time_step(1_000);
                    initialize_simulation(&mut world, params);
                    let mut schedule = simulation_schedule();
                    black_box(run_until_empty(&mut world, &mut schedule));
                });
            },
        );
    }
    group.finish();
}

fn bench_matching_algorithms(c: &mut Criterion) {
    use dispatch_sim::cost::CostFunction;
    use dispatch_sim::map::{Coordinate, Map};
    use dispatch_sim::matching::{
        CostBasedMatching, DriverCandidate, MatchingAlgorithm, NearestMatching, OrderRequest,
        RandomMatching,
    };
    use dispatch_sim::rng::SimRng;
    use bevy_ecs::prelude::Entity;

    let map = Map::new(50);
    let order = OrderRequest {
        pickup: Coordinate::new(25, 25),
        delivery: Coordinate::new(40, 10),
        required_capacity: 1,
    };
    let candidates: Vec<DriverCandidate> = (0..100)
        .map(|i| DriverCandidate {
            entity: Entity::from_raw(i),
            route_tail: Coordinate::new(i as i32 % 50, (i as i32 * 7) % 50),
            movement_rate: 1.0,
            spare_capacity: 2,
        })
        .collect();

    let mut group = c.benchmark_group("matching_algorithms");

    let random = RandomMatching;
    group.bench_function("random_100_drivers", |b| {
        let mut rng = SimRng::new(Some(1));
        b.iter(|| black_box(random.find_match(&order, &candidates, &map, &mut rng)));
    });

    let nearest = NearestMatching;
    group.bench_function("nearest_100_drivers", |b| {
        let mut rng = SimRng::new(Some(1));
        b.iter(|| black_box(nearest.find_match(&order, &candidates, &map, &mut rng)));
    });

    let cost_based = CostBasedMatching::new(CostFunction::default(), 1.0);
    group.bench_function("cost_based_100_drivers", |b| {
        let mut rng = SimRng::new(Some(1));
        b.iter(|| black_box(cost_based.find_match(&order, &candidates, &map, &mut rng)));
    });

    group.finish();
}

criterion_group!(benches, bench_simulation_run, bench_matching_algorithms);
criterion_main!(benches);
