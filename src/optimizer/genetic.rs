//! Generic genetic search over a pluggable chromosome.
//!
//! One controlling thread extracts individuals from the past population,
//! breeds them and hands fitness evaluation to a [`WorkerPool`]. Workers
//! insert evaluated individuals into the future population only, so the
//! population being drained is never touched concurrently. Every era ends
//! with a drain, then the two populations swap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::combat::rng::{entropy_seed, Rng};
use crate::optimizer::population::{Individual, Population};
use crate::parallel::WorkerPool;

/// Operations the engine needs from a chromosome type.
///
/// `fitness` runs on worker threads with that worker's generator; the rest
/// run on the controlling thread. `on_new_best` runs under the best-score
/// lock, so calls are serialized and arrive in improving order.
pub trait GeneticProblem: Send + Sync + 'static {
    type Chromosome: Clone + Send + 'static;

    fn allocate(&self) -> Self::Chromosome;

    fn randomize(&self, chromosome: &mut Self::Chromosome, rng: &mut Rng);

    /// Higher is better. Infeasible chromosomes score `f32::MIN`.
    fn fitness(&self, chromosome: &mut Self::Chromosome, rng: &mut Rng) -> f32;

    /// Blend `father` into `mother`.
    fn crossover(
        &self,
        p: f32,
        father: &Self::Chromosome,
        mother: &mut Self::Chromosome,
        rng: &mut Rng,
    );

    fn mutate(&self, p: f32, chromosome: &mut Self::Chromosome, rng: &mut Rng);

    fn on_new_best(&self, chromosome: &Self::Chromosome, score: f32, elapsed: Duration);
}

#[derive(Debug, Clone)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub max_eras: u64,
    pub crossover_p: f32,
    pub mutation_p: f32,
    /// Worker threads; 0 means one per core.
    pub workers: usize,
    /// Stop when no new best score appears for this long.
    pub inactivity_timeout: Option<Duration>,
    /// Stop this long after the run starts.
    pub fixed_timeout: Option<Duration>,
    pub seed: Option<u64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 256,
            max_eras: 100_000,
            crossover_p: 0.95,
            mutation_p: 0.5,
            workers: 1,
            inactivity_timeout: None,
            fixed_timeout: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    MaxEras,
    Inactivity,
    Deadline,
    /// Fewer than two individuals survived seeding.
    PopulationTooSmall,
}

#[derive(Debug, Clone)]
pub struct GeneticOutcome<C> {
    pub best_score: f32,
    pub best: Option<C>,
    pub eras: u64,
    pub evaluations: u64,
    pub termination: Termination,
    pub elapsed: Duration,
}

struct BestRecord<C> {
    score: f32,
    improved_at: Instant,
    chromosome: Option<C>,
}

struct Shared<P: GeneticProblem> {
    problem: P,
    started: Instant,
    best: Mutex<BestRecord<P::Chromosome>>,
    worker_rngs: Vec<Mutex<Rng>>,
    evaluations: AtomicU64,
}

impl<P: GeneticProblem> Shared<P> {
    fn evaluate(&self, individual: &mut Individual<P::Chromosome>, worker: usize) {
        let slot = worker % self.worker_rngs.len();
        let mut rng = self.worker_rngs[slot].lock();
        individual.score = self.problem.fitness(&mut individual.chromosome, &mut rng);
        individual.fresh = false;
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    fn offer(&self, individual: &Individual<P::Chromosome>) {
        let mut best = self.best.lock();
        if individual.score > best.score {
            best.score = individual.score;
            best.improved_at = Instant::now();
            best.chromosome = Some(individual.chromosome.clone());
            self.problem
                .on_new_best(&individual.chromosome, individual.score, self.started.elapsed());
        }
    }
}

type SharedPopulation<C> = Arc<Mutex<Population<C>>>;

pub struct GeneticAlgorithm<P: GeneticProblem> {
    config: GeneticConfig,
    shared: Arc<Shared<P>>,
    pool: WorkerPool,
    rng: Rng,
    seed: u64,
}

impl<P: GeneticProblem> GeneticAlgorithm<P> {
    pub fn new(problem: P, config: GeneticConfig) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = WorkerPool::new(config.workers)?;
        let seed = config.seed.unwrap_or_else(entropy_seed);
        let worker_rngs = (0..pool.workers())
            .map(|worker| Mutex::new(Rng::fork(seed, worker as u64 + 1)))
            .collect();
        let started = Instant::now();
        let shared = Arc::new(Shared {
            problem,
            started,
            best: Mutex::new(BestRecord {
                score: f32::MIN,
                improved_at: started,
                chromosome: None,
            }),
            worker_rngs,
            evaluations: AtomicU64::new(0),
        });
        Ok(Self {
            config,
            shared,
            pool,
            rng: Rng::fork(seed, 0),
            seed,
        })
    }

    pub fn problem(&self) -> &P {
        &self.shared.problem
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn best_score(&self) -> f32 {
        self.shared.best.lock().score
    }

    /// Queue `individual` for evaluation; the worker inserts it into
    /// `destination` once scored.
    fn submit(
        &self,
        mut individual: Individual<P::Chromosome>,
        destination: &SharedPopulation<P::Chromosome>,
    ) {
        let shared = Arc::clone(&self.shared);
        let destination = Arc::clone(destination);
        self.pool.submit(move |worker| {
            shared.evaluate(&mut individual, worker);
            shared.offer(&individual);
            destination.lock().insert(individual);
        });
    }

    fn expired(&self) -> Option<Termination> {
        let now = Instant::now();
        if let Some(limit) = self.config.fixed_timeout {
            if now.duration_since(self.shared.started) >= limit {
                return Some(Termination::Deadline);
            }
        }
        if let Some(limit) = self.config.inactivity_timeout {
            let improved_at = self.shared.best.lock().improved_at;
            if now.duration_since(improved_at) >= limit {
                return Some(Termination::Inactivity);
            }
        }
        None
    }

    /// Run to termination. In-flight evaluations always finish first.
    pub fn run(mut self) -> GeneticOutcome<P::Chromosome> {
        let size = self.config.population_size;
        info!(
            population = size,
            workers = self.pool.workers(),
            seed = self.seed,
            started_at = %chrono::Utc::now().to_rfc2822(),
            "genetic search starting"
        );

        let mut past: SharedPopulation<P::Chromosome> =
            Arc::new(Mutex::new(Population::with_capacity(size)));
        let mut future: SharedPopulation<P::Chromosome> =
            Arc::new(Mutex::new(Population::with_capacity(size)));

        let mut termination = None;
        for seeded in 0..size {
            if let Some(reason) = self.expired() {
                debug!(seeded, ?reason, "seeding cut short");
                termination = Some(reason);
                break;
            }
            let mut chromosome = self.shared.problem.allocate();
            self.shared.problem.randomize(&mut chromosome, &mut self.rng);
            self.submit(Individual::new(chromosome), &past);
        }
        self.pool.drain();
        debug!(population = past.lock().len(), best = self.best_score(), "population seeded");

        let mut eras = 0;
        while termination.is_none() {
            if eras >= self.config.max_eras {
                termination = Some(Termination::MaxEras);
                break;
            }
            if past.lock().len() < 2 {
                termination = Some(Termination::PopulationTooSmall);
                break;
            }
            termination = self.run_era(&past, &future);
            self.pool.drain();
            std::mem::swap(&mut past, &mut future);
            eras += 1;
            debug!(era = eras, best = self.best_score(), "era complete");
        }
        self.pool.drain();

        let termination = termination.unwrap_or(Termination::MaxEras);
        let best = self.shared.best.lock();
        let outcome = GeneticOutcome {
            best_score: best.score,
            best: best.chromosome.clone(),
            eras,
            evaluations: self.shared.evaluations.load(Ordering::Relaxed),
            termination,
            elapsed: self.shared.started.elapsed(),
        };
        info!(
            eras,
            evaluations = outcome.evaluations,
            best = outcome.best_score,
            ?termination,
            finished_at = %chrono::Utc::now().to_rfc2822(),
            "genetic search finished"
        );
        outcome
    }

    /// Breed the past population into the future one. Returns the reason to
    /// stop if a deadline expired partway.
    fn run_era(
        &mut self,
        past: &SharedPopulation<P::Chromosome>,
        future: &SharedPopulation<P::Chromosome>,
    ) -> Option<Termination> {
        let mut stop = None;
        let mut past_guard = past.lock();
        while past_guard.len() > 1 {
            if let Some(reason) = self.expired() {
                stop = Some(reason);
                break;
            }
            let Some(father) = past_guard.extract() else {
                break;
            };
            if father.fresh {
                self.submit(father, future);
                continue;
            }

            let len = past_guard.len();
            let start = self.rng.below(len as u32) as usize;
            let mother = (0..len)
                .map(|offset| (start + offset) % len)
                .find(|&index| past_guard.get(index).is_some_and(|m| !m.fresh));

            let Some(mother) = mother.and_then(|index| past_guard.get_mut(index)) else {
                // Everyone left was bred this era: carry them over for scoring.
                future.lock().insert(father);
                let leftovers: Vec<_> = past_guard.drain().collect();
                for individual in leftovers {
                    self.submit(individual, future);
                }
                break;
            };

            let problem = &self.shared.problem;
            problem.crossover(
                self.config.crossover_p,
                &father.chromosome,
                &mut mother.chromosome,
                &mut self.rng,
            );
            if self.config.mutation_p > self.rng.next_f32() {
                problem.mutate(self.config.mutation_p, &mut mother.chromosome, &mut self.rng);
            }
            mother.fresh = true;
            future.lock().insert(father);
        }

        if let Some(last) = past_guard.extract() {
            if last.fresh {
                self.submit(last, future);
            } else {
                future.lock().insert(last);
            }
        }
        stop
    }
}
