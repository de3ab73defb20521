//! Population sizing against available memory.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::OptimizerError;

pub const MAX_POPULATION: usize = 256;

/// Kept free for everything else the process allocates.
const MEMORY_RESERVE_BYTES: u64 = 5 * 1024 * 1024;

const MEMINFO: &str = "/proc/meminfo";

/// Read `MemAvailable` from a meminfo-formatted file, in bytes.
pub fn available_memory(path: impl AsRef<Path>) -> Option<u64> {
    let text = std::fs::read_to_string(path).ok()?;
    text.lines().find_map(|line| {
        let rest = line.strip_prefix("MemAvailable:")?;
        let kib: u64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
        Some(kib * 1024)
    })
}

/// How many individuals of `individual_bytes` fit in `available` bytes,
/// capped at [`MAX_POPULATION`]. Three or fewer cannot breed.
pub fn fit_population(available: u64, individual_bytes: u64) -> Result<usize, OptimizerError> {
    let usable = available.saturating_sub(MEMORY_RESERVE_BYTES);
    let fits = usable / individual_bytes.max(1);
    let population = fits.min(MAX_POPULATION as u64) as usize;
    if population <= 3 {
        return Err(OptimizerError::ResourceExhaustion {
            available_bytes: usable,
            individual_bytes,
            population,
        });
    }
    Ok(population)
}

/// Population size for this host: the requested size when given, otherwise
/// whatever fits in memory.
pub fn population_size(requested: Option<usize>, individual_bytes: u64) -> Result<usize, OptimizerError> {
    if let Some(size) = requested {
        return Ok(size);
    }
    let Some(available) = available_memory(MEMINFO) else {
        warn!(path = MEMINFO, "available memory unknown, using the default population");
        return Ok(MAX_POPULATION);
    };
    let population = fit_population(available, individual_bytes)?;
    debug!(available, individual_bytes, population, "population sized");
    Ok(population)
}
