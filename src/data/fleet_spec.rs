//! Comma-separated fleet specifications.
//!
//! Attacker: `weapons,shielding,armour,combustion,impulse,hyperspace[,coord,counts...]`
//! Defender: `weapons,shielding,armour[,coord,metal,crystal,deuterium,counts...[,interceptors]]`
//!
//! Counts follow [`UnitKind`] order; missing trailing counts are zero. An
//! attacker's defense-slot counts are missiles aimed at that defense. A spec
//! with only technology levels describes a side whose composition is unknown.

use serde::{Deserialize, Serialize};

use crate::combat::fleet::{Fleet, Resources, Role, TechLevels};
use crate::combat::travel::Coordinate;
use crate::combat::unit::{UnitCounts, UnitKind, UNIT_KIND_COUNT};
use crate::data::catalog::ItemCatalog;
use crate::error::ConfigError;

const ATTACKER_TECH_FIELDS: usize = 6;
const DEFENDER_TECH_FIELDS: usize = 3;
const DEFENDER_RESOURCE_FIELDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSpec {
    pub role: Role,
    pub tech: TechLevels,
    pub coordinate: Option<Coordinate>,
    pub resources: Resources,
    pub units: UnitCounts,
    pub interceptors: u32,
}

struct Fields<'a> {
    role: &'static str,
    values: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    fn number<T: std::str::FromStr>(&self, field: usize, what: &'static str) -> Result<T, ConfigError> {
        let value = self.values[field];
        value.parse().map_err(|_| ConfigError::InvalidNumber {
            role: self.role,
            field: field + 1,
            value: value.to_string(),
            what,
        })
    }

    fn tech(&self, field: usize) -> Result<u8, ConfigError> {
        self.number(field, "technology level (0-255)")
    }

    fn counts(&self, start: usize, end: usize) -> Result<UnitCounts, ConfigError> {
        let mut units = UnitCounts::default();
        for (offset, field) in (start..end).enumerate() {
            units.0[offset] = self.number(field, "unit count")?;
        }
        Ok(units)
    }
}

impl FleetSpec {
    pub fn parse(role: Role, raw: &str) -> Result<Self, ConfigError> {
        let fields = Fields {
            role: role.as_str(),
            values: raw.trim().split(',').map(str::trim).collect(),
        };
        match role {
            Role::Attacker => Self::parse_attacker(&fields),
            Role::Defender => Self::parse_defender(&fields),
        }
    }

    fn parse_attacker(fields: &Fields<'_>) -> Result<Self, ConfigError> {
        let found = fields.values.len();
        let max = ATTACKER_TECH_FIELDS + 1 + UNIT_KIND_COUNT;
        if found < ATTACKER_TECH_FIELDS {
            return Err(ConfigError::MissingFields {
                role: fields.role,
                expected: ATTACKER_TECH_FIELDS,
                found,
            });
        }
        if found > max {
            return Err(ConfigError::TooManyFields {
                role: fields.role,
                found,
                max,
            });
        }

        let tech = TechLevels {
            weapons: fields.tech(0)?,
            shielding: fields.tech(1)?,
            armour: fields.tech(2)?,
            combustion: fields.tech(3)?,
            impulse: fields.tech(4)?,
            hyperspace: fields.tech(5)?,
        };
        let mut spec = Self {
            role: Role::Attacker,
            tech,
            coordinate: None,
            resources: Resources::default(),
            units: UnitCounts::default(),
            interceptors: 0,
        };
        if found > ATTACKER_TECH_FIELDS {
            spec.coordinate = Some(fields.values[ATTACKER_TECH_FIELDS].parse()?);
            spec.units = fields.counts(ATTACKER_TECH_FIELDS + 1, found)?;
        }
        if spec.units[UnitKind::SolarSatellite] > 0 {
            return Err(ConfigError::AttackerSatellites);
        }
        Ok(spec)
    }

    fn parse_defender(fields: &Fields<'_>) -> Result<Self, ConfigError> {
        let found = fields.values.len();
        let counts_start = DEFENDER_TECH_FIELDS + 1 + DEFENDER_RESOURCE_FIELDS;
        let max = counts_start + UNIT_KIND_COUNT + 1;
        let expected = if found > DEFENDER_TECH_FIELDS {
            counts_start
        } else {
            DEFENDER_TECH_FIELDS
        };
        if found < expected {
            return Err(ConfigError::MissingFields {
                role: fields.role,
                expected,
                found,
            });
        }
        if found > max {
            return Err(ConfigError::TooManyFields {
                role: fields.role,
                found,
                max,
            });
        }

        let tech = TechLevels {
            weapons: fields.tech(0)?,
            shielding: fields.tech(1)?,
            armour: fields.tech(2)?,
            ..TechLevels::default()
        };
        let mut spec = Self {
            role: Role::Defender,
            tech,
            coordinate: None,
            resources: Resources::default(),
            units: UnitCounts::default(),
            interceptors: 0,
        };
        if found > DEFENDER_TECH_FIELDS {
            spec.coordinate = Some(fields.values[DEFENDER_TECH_FIELDS].parse()?);
            spec.resources = Resources {
                metal: fields.number(DEFENDER_TECH_FIELDS + 1, "resource amount")?,
                crystal: fields.number(DEFENDER_TECH_FIELDS + 2, "resource amount")?,
                deuterium: fields.number(DEFENDER_TECH_FIELDS + 3, "resource amount")?,
            };
            let counts_end = found.min(counts_start + UNIT_KIND_COUNT);
            spec.units = fields.counts(counts_start, counts_end)?;
            if found == max {
                spec.interceptors = fields.number(max - 1, "interceptor count")?;
            }
        }
        Ok(spec)
    }

    /// Only technology is known; the composition is to be searched for.
    pub fn is_unknown_composition(&self) -> bool {
        self.units.is_empty()
    }

    pub fn build(&self, catalog: &ItemCatalog) -> Fleet {
        let mut fleet = Fleet::new(self.role, self.tech, catalog);
        fleet.set_coordinate(self.coordinate);
        fleet.set_resources(self.resources);
        fleet.set_interceptors(self.interceptors);
        fleet.set_initial(self.units);
        fleet
    }
}
