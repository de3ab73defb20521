use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::combat::fleet::Role;
use crate::combat::rng::{entropy_seed, Rng};
use crate::combat::stats::{simulate_battle, simulate_battle_parallel};
use crate::combat::travel::distance_between;
use crate::config::{CATALOG_ENV, DEFAULT_RUNS, WORKERS_ENV};
use crate::data::catalog::ItemCatalog;
use crate::data::fleet_spec::FleetSpec;
use crate::error::{ConfigError, CoordinateError, OptimizerError};
use crate::optimizer::fleet_search::{ScoringFlags, SearchMode};
use crate::optimizer::{find_cheapest_winner, OptimizeRequest};
use crate::parallel::WorkerPool;

#[derive(Debug, Parser)]
#[command(name = "fleetforge", version)]
#[command(about = "Space combat simulator and cheapest-winning-fleet search")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fight repeated battles and print averaged statistics
    Simulate(SimulateArgs),
    /// Search for the cheapest fleet that wins against the other side
    Optimize(OptimizeArgs),
    /// Distance between two positions (galaxy:system:planet)
    Distance { from: String, to: String },
}

#[derive(Debug, Args)]
pub struct SideArgs {
    /// weapons,shielding,armour,combustion,impulse,hyperspace[,coord,counts...]
    #[arg(long)]
    pub attacker: String,

    /// weapons,shielding,armour[,coord,metal,crystal,deuterium,counts...[,interceptors]]
    #[arg(long)]
    pub defender: String,

    /// Item catalog (JSON or YAML) replacing the built-in one
    #[arg(long, env = CATALOG_ENV)]
    pub catalog: Option<PathBuf>,

    /// Worker threads; 0 means one per core
    #[arg(long, env = WORKERS_ENV)]
    pub workers: Option<usize>,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub sides: SideArgs,

    /// Number of battles to fight
    #[arg(long, default_value_t = DEFAULT_RUNS)]
    pub runs: u32,
}

#[derive(Debug, Args)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub sides: SideArgs,

    /// Side whose composition is searched for
    #[arg(long, value_parser = parse_role)]
    pub guess: Role,

    /// full, def, script, no-missile or normal
    #[arg(long, default_value = "normal")]
    pub mode: SearchMode,

    #[arg(long)]
    pub no_loss: bool,

    #[arg(long)]
    pub no_recycling: bool,

    #[arg(long)]
    pub no_invest: bool,

    #[arg(long)]
    pub strict_profit: bool,

    /// Stop after this many seconds without a better fleet
    #[arg(long)]
    pub inactivity_timeout: Option<u64>,

    /// Stop after this many seconds in total
    #[arg(long)]
    pub fixed_timeout: Option<u64>,

    /// Longest acceptable one-way flight in seconds
    #[arg(long, default_value_t = 0)]
    pub flight_time: u32,

    /// Seconds between two attack waves
    #[arg(long, default_value_t = 0)]
    pub wave_time: u32,

    #[arg(long)]
    pub population: Option<usize>,

    #[arg(long)]
    pub max_eras: Option<u64>,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    match raw.to_ascii_lowercase().as_str() {
        "attacker" | "atk" => Ok(Role::Attacker),
        "defender" | "def" => Ok(Role::Defender),
        other => Err(format!("unknown side '{other}' (expected attacker or defender)")),
    }
}

#[derive(Debug, Error)]
enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Coordinate(#[from] CoordinateError),
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to serialize result: {0}")]
    Json(#[from] serde_json::Error),
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the `info`
/// default. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };
    init_tracing();

    let result = match cli.command {
        Command::Simulate(args) => handle_simulate(args),
        Command::Optimize(args) => handle_optimize(args),
        Command::Distance { from, to } => handle_distance(&from, &to),
    };
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

fn emit<T: Serialize>(value: &T) -> Result<(), CommandError> {
    let payload = serde_json::to_string_pretty(value)?;
    println!("{payload}");
    Ok(())
}

fn load_catalog(path: Option<&PathBuf>) -> Result<ItemCatalog, ConfigError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading item catalog");
            ItemCatalog::load(path)
        }
        None => Ok(ItemCatalog::standard()),
    }
}

fn handle_simulate(args: SimulateArgs) -> Result<(), CommandError> {
    let sides = &args.sides;
    let catalog = load_catalog(sides.catalog.as_ref())?;
    let attacker = FleetSpec::parse(Role::Attacker, &sides.attacker)?.build(&catalog);
    let defender = FleetSpec::parse(Role::Defender, &sides.defender)?.build(&catalog);
    let seed = sides.seed.unwrap_or_else(entropy_seed);

    let report = match sides.workers.unwrap_or(1) {
        1 => simulate_battle(&attacker, &defender, &catalog, args.runs, &mut Rng::new(seed))?,
        workers => {
            let pool = WorkerPool::new(workers)?;
            simulate_battle_parallel(&attacker, &defender, &catalog, args.runs, seed, &pool)?
        }
    };
    emit(&report)
}

fn handle_optimize(args: OptimizeArgs) -> Result<(), CommandError> {
    let sides = &args.sides;
    let catalog = Arc::new(load_catalog(sides.catalog.as_ref())?);
    let attacker = FleetSpec::parse(Role::Attacker, &sides.attacker)?.build(&catalog);
    let defender = FleetSpec::parse(Role::Defender, &sides.defender)?.build(&catalog);

    let mut request = OptimizeRequest::new(attacker, defender, args.guess);
    request.mode = args.mode;
    request.flags = ScoringFlags {
        no_loss: args.no_loss,
        no_recycling: args.no_recycling,
        no_invest: args.no_invest,
        strict_profit: args.strict_profit,
    };
    request.inactivity_timeout = args.inactivity_timeout.map(Duration::from_secs);
    request.fixed_timeout = args.fixed_timeout.map(Duration::from_secs);
    request.max_flight_time = args.flight_time;
    request.wave_time = args.wave_time;
    request.workers = sides.workers.unwrap_or(0);
    request.population = args.population;
    request.max_eras = args.max_eras;
    request.seed = sides.seed;

    let report = find_cheapest_winner(request, catalog, None)?;
    emit(&report)
}

#[derive(Serialize)]
struct DistanceReport<'a> {
    from: &'a str,
    to: &'a str,
    distance: u32,
}

fn handle_distance(from: &str, to: &str) -> Result<(), CommandError> {
    let distance = distance_between(from, to)?;
    emit(&DistanceReport { from, to, distance })
}
