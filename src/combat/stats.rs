//! Repeated-battle statistics: averages, extremes and victory counts over N
//! independent battles between the same two fleets.

use rayon::prelude::*;
use serde::Serialize;

use crate::combat::engine::CombatEngine;
use crate::combat::fleet::{Fleet, Role};
use crate::combat::rng::Rng;
use crate::combat::travel::{distance, flight_time, Flight};
use crate::combat::unit::{PerUnit, UnitCounts, UnitKind};
use crate::data::catalog::ItemCatalog;
use crate::error::CoordinateError;
use crate::parallel::{batch_ranges, WorkerPool};

/// Share of destroyed ship metal and crystal left as debris.
pub const DEBRIS_RATIO: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResourceLoss {
    pub metal: f64,
    pub crystal: f64,
    pub deuterium: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SideReport {
    pub role: Role,
    pub victories: u32,
    pub average_survivors: PerUnit<f64>,
    pub average_loss: ResourceLoss,
    /// Survivors of the run that kept the most fleet value.
    pub best: UnitCounts,
    /// Survivors of the run that kept the least fleet value.
    pub worst: UnitCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Debris {
    pub metal: f64,
    pub crystal: f64,
    pub recyclers: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub runs: u32,
    pub draws: u32,
    pub average_rounds: f64,
    pub attacker: SideReport,
    pub defender: SideReport,
    pub debris: Debris,
    pub distance: u32,
    pub flight: Flight,
}

#[derive(Debug, Clone)]
struct SideTally {
    victories: u32,
    survivors: PerUnit<u64>,
    lost: [u64; 3],
    debris: [u64; 2],
    best_value: f64,
    best: UnitCounts,
    worst_value: f64,
    worst: UnitCounts,
}

impl SideTally {
    fn new() -> Self {
        Self {
            victories: 0,
            survivors: PerUnit::default(),
            lost: [0; 3],
            debris: [0; 2],
            best_value: f64::MIN,
            best: UnitCounts::default(),
            worst_value: f64::MAX,
            worst: UnitCounts::default(),
        }
    }

    fn record(&mut self, fleet: &Fleet) {
        let mut value = 0.0;
        for (kind, &alive) in fleet.current().iter() {
            if !fleet.counts_toward_units(kind) {
                continue;
            }
            let stats = fleet.stats(kind);
            let gone = u64::from(fleet.initial()[kind] - alive);
            self.lost[0] += gone * u64::from(stats.metal);
            self.lost[1] += gone * u64::from(stats.crystal);
            self.lost[2] += gone * u64::from(stats.deuterium);
            if kind.is_ship() {
                self.debris[0] += gone * u64::from(stats.metal);
                self.debris[1] += gone * u64::from(stats.crystal);
            }
            self.survivors[kind] += u64::from(alive);
            value += f64::from(alive) * f64::from(stats.price);
        }
        if value >= self.best_value {
            self.best_value = value;
            self.best = *fleet.current();
        }
        if value <= self.worst_value {
            self.worst_value = value;
            self.worst = *fleet.current();
        }
    }

    /// Fold a later batch into this one; ties go to the later batch.
    fn merge(&mut self, later: SideTally) {
        self.victories += later.victories;
        for (kind, total) in self.survivors.iter_mut() {
            *total += later.survivors[kind];
        }
        for (mine, theirs) in self.lost.iter_mut().zip(later.lost) {
            *mine += theirs;
        }
        for (mine, theirs) in self.debris.iter_mut().zip(later.debris) {
            *mine += theirs;
        }
        if later.best_value >= self.best_value {
            self.best_value = later.best_value;
            self.best = later.best;
        }
        if later.worst_value <= self.worst_value {
            self.worst_value = later.worst_value;
            self.worst = later.worst;
        }
    }

    fn report(&self, role: Role, runs: u32) -> SideReport {
        let per_run = |total: u64| total as f64 / f64::from(runs.max(1));
        let mut average_survivors = PerUnit::<f64>::default();
        for (kind, average) in average_survivors.iter_mut() {
            *average = per_run(self.survivors[kind]);
        }
        SideReport {
            role,
            victories: self.victories,
            average_survivors,
            average_loss: ResourceLoss {
                metal: per_run(self.lost[0]),
                crystal: per_run(self.lost[1]),
                deuterium: per_run(self.lost[2]),
            },
            best: self.best,
            worst: self.worst,
        }
    }
}

#[derive(Debug, Clone)]
struct Tally {
    runs: u32,
    rounds: u64,
    attacker: SideTally,
    defender: SideTally,
}

impl Tally {
    fn new() -> Self {
        Self {
            runs: 0,
            rounds: 0,
            attacker: SideTally::new(),
            defender: SideTally::new(),
        }
    }

    fn merge(mut self, later: Tally) -> Tally {
        self.runs += later.runs;
        self.rounds += later.rounds;
        self.attacker.merge(later.attacker);
        self.defender.merge(later.defender);
        self
    }
}

fn run_batch(
    attacker: &Fleet,
    defender: &Fleet,
    engine: CombatEngine<'_>,
    runs: usize,
    rng: &mut Rng,
) -> Tally {
    let mut attacker = attacker.clone();
    let mut defender = defender.clone();
    let mut tally = Tally::new();
    for _ in 0..runs {
        tally.rounds += u64::from(engine.resolve(&mut attacker, &mut defender, rng));
        tally.runs += 1;
        if attacker.surviving_count() == 0 {
            tally.defender.victories += 1;
        } else if defender.surviving_count() == 0 {
            tally.attacker.victories += 1;
        }
        tally.attacker.record(&attacker);
        tally.defender.record(&defender);
    }
    tally
}

fn battle_distance(attacker: &Fleet, defender: &Fleet) -> Result<u32, CoordinateError> {
    let from = attacker
        .coordinate()
        .ok_or(CoordinateError::Missing(Role::Attacker.as_str()))?;
    let to = defender
        .coordinate()
        .ok_or(CoordinateError::Missing(Role::Defender.as_str()))?;
    Ok(distance(from, to))
}

fn finish(
    tally: Tally,
    attacker: &Fleet,
    distance: u32,
    recycler_capacity: u32,
) -> StatisticsReport {
    let runs = tally.runs;
    let attacker_report = tally.attacker.report(Role::Attacker, runs);
    let defender_report = tally.defender.report(Role::Defender, runs);
    let debris_total = |index: usize| {
        (tally.attacker.debris[index] + tally.defender.debris[index]) as f64 * DEBRIS_RATIO
            / f64::from(runs.max(1))
    };
    let metal = debris_total(0);
    let crystal = debris_total(1);
    StatisticsReport {
        runs,
        draws: runs - attacker_report.victories - defender_report.victories,
        average_rounds: tally.rounds as f64 / f64::from(runs.max(1)),
        attacker: attacker_report,
        defender: defender_report,
        debris: Debris {
            metal,
            crystal,
            recyclers: (metal + crystal) / f64::from(recycler_capacity.max(1)),
        },
        distance,
        flight: flight_time(attacker, distance),
    }
}

/// Fight `runs` battles from the fleets' configured state and aggregate the
/// outcomes. Both fleets need a coordinate for the flight estimate.
pub fn simulate_battle(
    attacker: &Fleet,
    defender: &Fleet,
    catalog: &ItemCatalog,
    runs: u32,
    rng: &mut Rng,
) -> Result<StatisticsReport, CoordinateError> {
    let distance = battle_distance(attacker, defender)?;
    let engine = CombatEngine::new(catalog);
    let tally = run_batch(attacker, defender, engine, runs as usize, rng);
    let capacity = catalog.stats_for(UnitKind::Recycler).capacity;
    Ok(finish(tally, attacker, distance, capacity))
}

/// Same as [`simulate_battle`], with runs split into one batch per worker.
/// Batch `i` draws from stream `i` of `seed`, so the report depends only on
/// the seed and the worker count.
pub fn simulate_battle_parallel(
    attacker: &Fleet,
    defender: &Fleet,
    catalog: &ItemCatalog,
    runs: u32,
    seed: u64,
    pool: &WorkerPool,
) -> Result<StatisticsReport, CoordinateError> {
    let distance = battle_distance(attacker, defender)?;
    let engine = CombatEngine::new(catalog);
    let ranges = batch_ranges(runs as usize, pool.workers());
    let tallies: Vec<Tally> = pool.install(|| {
        ranges
            .par_iter()
            .enumerate()
            .map(|(batch, &(start, end))| {
                let mut rng = Rng::fork(seed, batch as u64);
                run_batch(attacker, defender, engine, end - start, &mut rng)
            })
            .collect()
    });
    let tally = tallies.into_iter().fold(Tally::new(), Tally::merge);
    let capacity = catalog.stats_for(UnitKind::Recycler).capacity;
    Ok(finish(tally, attacker, distance, capacity))
}
