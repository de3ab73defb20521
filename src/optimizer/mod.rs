pub mod fleet_search;
pub mod genetic;
pub mod population;
pub mod sizing;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::combat::fleet::{Fleet, Role};
use crate::combat::travel::distance;
use crate::config::{SCRIPT_FIXED_TIMEOUT, SCRIPT_INACTIVITY_TIMEOUT};
use crate::data::catalog::ItemCatalog;
use crate::error::{CoordinateError, OptimizerError};
use crate::optimizer::fleet_search::{
    BestCandidate, BestSink, FleetSearch, FleetSearchParams, ScoringFlags, SearchMode,
};
use crate::optimizer::genetic::{GeneticAlgorithm, GeneticConfig, Termination};

/// Score of an infeasible candidate. Sorts below every real score.
pub const REJECTED: f32 = f32::MIN;

/// One cheapest-winner search: both sides, which one to guess and how.
#[derive(Debug, Clone)]
pub struct OptimizeRequest {
    pub attacker: Fleet,
    pub defender: Fleet,
    /// The side whose composition is searched for. Its configured counts
    /// are the known repartition the search starts from.
    pub guess: Role,
    pub mode: SearchMode,
    pub flags: ScoringFlags,
    pub inactivity_timeout: Option<Duration>,
    pub fixed_timeout: Option<Duration>,
    /// Seconds; zero for no limit.
    pub max_flight_time: u32,
    /// Seconds; zero for a single wave.
    pub wave_time: u32,
    /// Zero means one per core.
    pub workers: usize,
    pub population: Option<usize>,
    pub max_eras: Option<u64>,
    pub seed: Option<u64>,
}

impl OptimizeRequest {
    pub fn new(attacker: Fleet, defender: Fleet, guess: Role) -> Self {
        Self {
            attacker,
            defender,
            guess,
            mode: SearchMode::default(),
            flags: ScoringFlags::default(),
            inactivity_timeout: None,
            fixed_timeout: None,
            max_flight_time: 0,
            wave_time: 0,
            workers: 0,
            population: None,
            max_eras: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub guess: Role,
    pub mode: SearchMode,
    pub seed: u64,
    pub population: usize,
    pub eras: u64,
    pub evaluations: u64,
    pub termination: Termination,
    pub elapsed_secs: f64,
    /// `None` when no candidate ever won.
    pub best: Option<BestCandidate>,
}

/// Search for the cheapest composition of `request.guess` that beats the
/// other side. Every improvement is forwarded to `on_new_best` as it is
/// found.
pub fn find_cheapest_winner(
    request: OptimizeRequest,
    catalog: Arc<ItemCatalog>,
    on_new_best: Option<BestSink>,
) -> Result<SearchReport, OptimizerError> {
    let OptimizeRequest {
        attacker,
        defender,
        guess,
        mode,
        flags,
        mut inactivity_timeout,
        mut fixed_timeout,
        max_flight_time,
        wave_time,
        workers,
        population,
        max_eras,
        seed,
    } = request;
    if attacker.role() != Role::Attacker || defender.role() != Role::Defender {
        return Err(OptimizerError::RoleMismatch);
    }

    let travel = match (attacker.coordinate(), defender.coordinate()) {
        (Some(from), Some(to)) => distance(from, to),
        (None, _) if guess == Role::Attacker => {
            return Err(CoordinateError::Missing("attacker").into())
        }
        (_, None) if guess == Role::Attacker => {
            return Err(CoordinateError::Missing("defender").into())
        }
        _ => 0,
    };

    if mode == SearchMode::Script {
        inactivity_timeout.get_or_insert(SCRIPT_INACTIVITY_TIMEOUT);
        fixed_timeout.get_or_insert(SCRIPT_FIXED_TIMEOUT);
    }

    let (guessed, opponent) = match guess {
        Role::Attacker => (attacker, defender),
        Role::Defender => (defender, attacker),
    };
    let params = FleetSearchParams {
        mode,
        flags,
        distance: travel,
        max_flight_time,
        wave_time,
    };
    let latest: Arc<Mutex<Option<BestCandidate>>> = Arc::new(Mutex::new(None));
    let record = Arc::clone(&latest);
    let search = FleetSearch::new(&guessed, opponent, catalog, params).with_sink(Box::new(
        move |candidate: &BestCandidate| {
            if let Some(sink) = &on_new_best {
                sink(candidate);
            }
            *record.lock() = Some(candidate.clone());
        },
    ));
    let budget = *search.budget();
    debug!(
        %guess,
        mode = mode.as_str(),
        forbidden = ?search.forbidden(),
        max_units = budget.max_units,
        max_price = budget.max_price,
        distance = travel,
        "search budget"
    );

    let population = sizing::population_size(population, search.individual_bytes())?;
    let defaults = GeneticConfig::default();
    let config = GeneticConfig {
        population_size: population,
        max_eras: max_eras.unwrap_or(defaults.max_eras),
        workers,
        inactivity_timeout,
        fixed_timeout,
        seed,
        ..defaults
    };

    let ga = GeneticAlgorithm::new(search, config)?;
    let seed = ga.seed();
    let outcome = ga.run();
    let best = latest.lock().take();

    info!(
        %guess,
        termination = ?outcome.termination,
        best = outcome.best_score,
        "cheapest winner search done"
    );
    Ok(SearchReport {
        guess,
        mode,
        seed,
        population,
        eras: outcome.eras,
        evaluations: outcome.evaluations,
        termination: outcome.termination,
        elapsed_secs: outcome.elapsed.as_secs_f64(),
        best,
    })
}
