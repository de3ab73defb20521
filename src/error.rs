//! Error types for fleet configuration, coordinates and optimizer runs.
//!
//! Infeasible candidates are not errors: the fitness function scores them
//! with [`crate::optimizer::REJECTED`] and selection drops them.

use thiserror::Error;

/// Malformed input rejected before it reaches the combat or genetic engines.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid item catalog '{path}': {message}")]
    Catalog { path: String, message: String },

    #[error("{role} fleet: expected at least {expected} fields, found {found}")]
    MissingFields {
        role: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{role} fleet: too many fields ({found}, at most {max})")]
    TooManyFields {
        role: &'static str,
        found: usize,
        max: usize,
    },

    #[error("{role} fleet: field {field} '{value}' is not a valid {what}")]
    InvalidNumber {
        role: &'static str,
        field: usize,
        value: String,
        what: &'static str,
    },

    #[error("attacker fleet cannot carry solar satellites")]
    AttackerSatellites,

    #[error(transparent)]
    Coordinate(#[from] CoordinateError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    #[error("cannot parse coordinate '{0}', expected galaxy:system:planet")]
    Malformed(String),

    #[error("{0} fleet has no coordinate")]
    Missing(&'static str),
}

/// Fatal failures of a search run. Raised before any era executes.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("not enough memory for a population: {available_bytes} bytes fit {population} individuals of {individual_bytes} bytes")]
    ResourceExhaustion {
        available_bytes: u64,
        individual_bytes: u64,
        population: usize,
    },

    #[error("guessed fleet and known fleet must have opposite roles")]
    RoleMismatch,

    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Coordinate(#[from] CoordinateError),
}
