//! Coordinates, travel distance and flight cost.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::combat::fleet::Fleet;
use crate::combat::unit::UnitKind;
use crate::error::CoordinateError;

const GALAXY_DISTANCE: u32 = 20_000;
const SYSTEM_DISTANCE: u32 = 95;
const SYSTEM_BASE: u32 = 2_700;
const PLANET_DISTANCE: u32 = 5;
const PLANET_BASE: u32 = 1_000;
const SAME_PLANET: u32 = 5;

const GAME_SPEED_FACTOR: f64 = 35_000.0;

/// A `galaxy:system:planet` position. Brackets are accepted when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub galaxy: u16,
    pub system: u16,
    pub planet: u16,
}

impl Coordinate {
    pub const fn new(galaxy: u16, system: u16, planet: u16) -> Self {
        Self {
            galaxy,
            system,
            planet,
        }
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || CoordinateError::Malformed(raw.to_string());
        let trimmed = raw.trim();
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(trimmed);
        let mut parts = inner.split(':').map(|part| part.trim().parse::<u16>());
        let (Some(Ok(galaxy)), Some(Ok(system)), Some(Ok(planet)), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        Ok(Self::new(galaxy, system, planet))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.galaxy, self.system, self.planet)
    }
}

/// Travel distance between two positions.
///
/// ```
/// # use fleetforge::combat::{distance, Coordinate};
/// let a: Coordinate = "3:432:9".parse().unwrap();
/// let b: Coordinate = "3:411:12".parse().unwrap();
/// assert_eq!(distance(a, b), 4695);
/// ```
pub fn distance(a: Coordinate, b: Coordinate) -> u32 {
    if a.galaxy != b.galaxy {
        u32::from(a.galaxy.abs_diff(b.galaxy)) * GALAXY_DISTANCE
    } else if a.system != b.system {
        u32::from(a.system.abs_diff(b.system)) * SYSTEM_DISTANCE + SYSTEM_BASE
    } else if a.planet != b.planet {
        u32::from(a.planet.abs_diff(b.planet)) * PLANET_DISTANCE + PLANET_BASE
    } else {
        SAME_PLANET
    }
}

/// Parse both positions and return their distance.
pub fn distance_between(a: &str, b: &str) -> Result<u32, CoordinateError> {
    Ok(distance(a.parse()?, b.parse()?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Flight {
    pub fuel: u32,
    pub seconds: u32,
}

/// Fuel and one-way flight time of every ship in `fleet.initial()`. The
/// slowest ship sets the pace; faster ships burn less to keep formation.
pub fn flight_time(fleet: &Fleet, distance: u32) -> Flight {
    let initial = fleet.initial();
    let ships = || {
        UnitKind::SHIPS
            .map(|index| UnitKind::ALL[index])
            .filter(|&kind| initial[kind] > 0)
    };
    let slowest = ships()
        .map(|kind| fleet.stats(kind).speed)
        .min()
        .unwrap_or(1_000_000_000);

    let distance = f64::from(distance);
    let duration = (GAME_SPEED_FACTOR / 10.0 * (distance * 10.0 / f64::from(slowest)).sqrt()
        + 10.0) as f32;

    let fuel: f64 = ships()
        .map(|kind| {
            let stats = fleet.stats(kind);
            let speed = GAME_SPEED_FACTOR / (f64::from(duration) - 10.0)
                * (distance * 10.0 / f64::from(stats.speed)).sqrt();
            f64::from(initial[kind]) * f64::from(stats.fuel) * distance / GAME_SPEED_FACTOR
                * (speed / 10.0 + 1.0).powi(2)
        })
        .sum();

    Flight {
        fuel: fuel as u32,
        seconds: duration as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_bracketed() {
        let plain: Coordinate = "3:432:9".parse().expect("plain");
        let bracketed: Coordinate = "[3:432:9]".parse().expect("bracketed");
        assert_eq!(plain, bracketed);
        assert_eq!(plain.to_string(), "3:432:9");
    }

    #[test]
    fn rejects_malformed() {
        for raw in ["", "3:432", "3:432:9:1", "a:b:c", "[3:432:9", "3::9"] {
            assert!(raw.parse::<Coordinate>().is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn same_position_is_five() {
        assert_eq!(distance_between("1:1:1", "1:1:1"), Ok(5));
    }
}
