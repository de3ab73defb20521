//! Compare sequential and parallel battle statistics, and one fixed-size
//! optimizer run per worker count.
//!
//! Run with: `cargo bench --bench optimizer_parallel`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fleetforge::combat::{
    simulate_battle, simulate_battle_parallel, Coordinate, Fleet, Rng, Role, TechLevels,
    UnitCounts, UnitKind,
};
use fleetforge::data::ItemCatalog;
use fleetforge::optimizer::{find_cheapest_winner, OptimizeRequest};
use fleetforge::parallel::WorkerPool;

fn fleet(catalog: &ItemCatalog, role: Role, at: Coordinate, units: &[(UnitKind, u32)]) -> Fleet {
    let mut fleet = Fleet::new(role, TechLevels::default(), catalog);
    fleet.set_coordinate(Some(at));
    let mut counts = UnitCounts::default();
    for &(kind, n) in units {
        counts[kind] = n;
    }
    fleet.set_initial(counts);
    fleet
}

fn bench_statistics_sequential_vs_parallel(c: &mut Criterion) {
    let catalog = ItemCatalog::standard();
    let attacker = fleet(
        &catalog,
        Role::Attacker,
        Coordinate::new(1, 10, 4),
        &[(UnitKind::Cruiser, 200), (UnitKind::LightFighter, 600)],
    );
    let defender = fleet(
        &catalog,
        Role::Defender,
        Coordinate::new(1, 12, 8),
        &[(UnitKind::RocketLauncher, 800), (UnitKind::HeavyLaser, 100)],
    );
    let runs = 200;
    let pool = WorkerPool::new(0).expect("worker pool");

    let mut group = c.benchmark_group("statistics");
    group.sample_size(20);
    group.measurement_time(std::time::Duration::from_secs(10));

    group.bench_function("sequential", |b| {
        b.iter(|| {
            let mut rng = Rng::new(42);
            black_box(simulate_battle(&attacker, &defender, &catalog, runs, &mut rng))
        });
    });

    group.bench_function("parallel", |b| {
        b.iter(|| {
            black_box(simulate_battle_parallel(
                &attacker, &defender, &catalog, runs, 42, &pool,
            ))
        });
    });

    group.finish();
}

fn bench_optimizer_workers(c: &mut Criterion) {
    let catalog = Arc::new(ItemCatalog::standard());
    let defender = fleet(
        &catalog,
        Role::Defender,
        Coordinate::new(3, 200, 5),
        &[(UnitKind::RocketLauncher, 150), (UnitKind::LightLaser, 40)],
    );
    let mut attacker = Fleet::new(Role::Attacker, TechLevels::default(), &catalog);
    attacker.set_coordinate(Some(Coordinate::new(3, 204, 9)));

    let mut group = c.benchmark_group("optimizer");
    group.sample_size(10);

    for workers in [1, 4] {
        group.bench_function(format!("workers_{workers}"), |b| {
            b.iter(|| {
                let mut request =
                    OptimizeRequest::new(attacker.clone(), defender.clone(), Role::Attacker);
                request.workers = workers;
                request.population = Some(64);
                request.max_eras = Some(5);
                request.seed = Some(9);
                black_box(find_cheapest_winner(request, Arc::clone(&catalog), None))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_statistics_sequential_vs_parallel, bench_optimizer_workers);
criterion_main!(benches);
