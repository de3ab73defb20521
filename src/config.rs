//! Process-level settings: environment variable names and defaults shared by
//! the CLI and the optimizer.

use std::time::Duration;

/// Path of a JSON or YAML item catalog replacing the built-in one.
pub const CATALOG_ENV: &str = "FLEETFORGE_CATALOG";

/// Worker thread count; 0 means one per core.
pub const WORKERS_ENV: &str = "FLEETFORGE_WORKERS";

pub const DEFAULT_RUNS: u32 = 100;

/// Script-mode searches stop after this long without improvement...
pub const SCRIPT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);

/// ...or this long after they start, whichever comes first.
pub const SCRIPT_FIXED_TIMEOUT: Duration = Duration::from_secs(120);
