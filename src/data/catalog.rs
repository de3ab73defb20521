//! Base unit statistics and the rapid-fire table, before technology scaling.
//!
//! [`ItemCatalog::standard`] carries the stock values. [`ItemCatalog::load`]
//! reads an override file in JSON or YAML (picked by extension):
//!
//! ```yaml
//! items:
//!   small_cargo: { shield: 10, attack: 5, structure: 4000, capacity: 5000,
//!                  speed: 10000, metal: 2000, crystal: 2000, deuterium: 0, fuel: 20 }
//!   # ... every kind must be present
//! rapid_fire:
//!   cruiser: { light_fighter: 3, rocket_launcher: 10 }
//! ```
//!
//! Rapid-fire entries are shot counts; they are stored as per-10000 thresholds.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combat::unit::{PerUnit, UnitKind, UNIT_KIND_COUNT};
use crate::error::ConfigError;

/// Deuterium counts double when pricing a unit.
pub const DEUTERIUM_WEIGHT: u32 = 2;

pub const MISSILE_METAL: u32 = 12_500;
pub const MISSILE_CRYSTAL: u32 = 2_500;
pub const MISSILE_DEUTERIUM: u32 = 10_000;

/// Damage dealt by one interplanetary missile before weapons technology.
pub const MISSILE_DAMAGE: f32 = 12_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemStats {
    pub shield: f32,
    pub attack: f32,
    pub structure: u32,
    pub capacity: u32,
    pub speed: u32,
    pub metal: u32,
    pub crystal: u32,
    pub deuterium: u32,
    pub fuel: u32,
}

impl ItemStats {
    pub const fn price(&self) -> u32 {
        self.metal + self.crystal + DEUTERIUM_WEIGHT * self.deuterium
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemCatalog {
    items: PerUnit<ItemStats>,
    rapid_fire: [[u16; UNIT_KIND_COUNT]; UNIT_KIND_COUNT],
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    items: BTreeMap<UnitKind, ItemStats>,
    #[serde(default)]
    rapid_fire: BTreeMap<UnitKind, BTreeMap<UnitKind, u32>>,
}

const fn item(
    shield: f32,
    attack: f32,
    structure: u32,
    capacity: u32,
    speed: u32,
    metal: u32,
    crystal: u32,
    deuterium: u32,
    fuel: u32,
) -> ItemStats {
    ItemStats {
        shield,
        attack,
        structure,
        capacity,
        speed,
        metal,
        crystal,
        deuterium,
        fuel,
    }
}

const STANDARD_ITEMS: [ItemStats; UNIT_KIND_COUNT] = [
    item(10.0, 5.0, 4_000, 5_000, 10_000, 2_000, 2_000, 0, 20),
    item(25.0, 5.0, 12_000, 25_000, 7_500, 6_000, 6_000, 0, 50),
    item(10.0, 50.0, 4_000, 50, 12_500, 3_000, 1_000, 0, 20),
    item(25.0, 150.0, 10_000, 100, 10_000, 6_000, 4_000, 0, 75),
    item(50.0, 400.0, 27_000, 800, 15_000, 20_000, 7_000, 2_000, 300),
    item(200.0, 1_000.0, 60_000, 1_500, 10_000, 45_000, 15_000, 0, 500),
    item(100.0, 50.0, 30_000, 7_500, 2_500, 10_000, 20_000, 10_000, 1_000),
    item(10.0, 1.0, 16_000, 20_000, 2_000, 10_000, 6_000, 2_000, 300),
    item(0.0, 0.0, 4_000, 5, 100_000_000, 0, 1_000, 0, 1),
    item(500.0, 1_000.0, 75_000, 500, 5_000, 50_000, 25_000, 15_000, 1_000),
    item(1.0, 1.0, 2_000, 0, 0, 0, 2_000, 500, 0),
    item(500.0, 2_000.0, 110_000, 2_000, 5_000, 60_000, 50_000, 15_000, 1_000),
    item(
        50_000.0, 200_000.0, 9_000_000, 1_000_000, 100, 5_000_000, 4_000_000, 1_000_000, 1,
    ),
    item(400.0, 700.0, 70_000, 750, 10_000, 30_000, 40_000, 15_000, 250),
    item(20.0, 80.0, 2_000, 0, 0, 2_000, 0, 0, 0),
    item(25.0, 100.0, 2_000, 0, 0, 1_500, 500, 0, 0),
    item(100.0, 250.0, 8_000, 0, 0, 6_000, 2_000, 0, 0),
    item(200.0, 1_100.0, 35_000, 0, 0, 20_000, 15_000, 2_000, 0),
    item(500.0, 150.0, 8_000, 0, 0, 2_000, 6_000, 0, 0),
    item(300.0, 3_000.0, 100_000, 0, 0, 50_000, 50_000, 30_000, 0),
    item(2_000.0, 1.0, 20_000, 0, 0, 10_000, 10_000, 0, 0),
    item(10_000.0, 1.0, 100_000, 0, 0, 50_000, 50_000, 0, 0),
];

/// Stock rapid-fire shot counts as (attacker, defender, shots).
const STANDARD_RAPID_FIRE: &[(UnitKind, UnitKind, u32)] = {
    use UnitKind::*;
    &[
        (SmallCargo, EspionageProbe, 5),
        (SmallCargo, SolarSatellite, 5),
        (LargeCargo, EspionageProbe, 5),
        (LargeCargo, SolarSatellite, 5),
        (LightFighter, EspionageProbe, 5),
        (LightFighter, SolarSatellite, 5),
        (HeavyFighter, SmallCargo, 3),
        (HeavyFighter, EspionageProbe, 5),
        (HeavyFighter, SolarSatellite, 5),
        (Cruiser, LightFighter, 3),
        (Cruiser, EspionageProbe, 5),
        (Cruiser, SolarSatellite, 5),
        (Cruiser, RocketLauncher, 10),
        (Battleship, EspionageProbe, 5),
        (Battleship, SolarSatellite, 5),
        (ColonyShip, EspionageProbe, 5),
        (ColonyShip, SolarSatellite, 5),
        (Recycler, EspionageProbe, 5),
        (Recycler, SolarSatellite, 5),
        (Bomber, EspionageProbe, 5),
        (Bomber, SolarSatellite, 5),
        (Bomber, RocketLauncher, 20),
        (Bomber, LightLaser, 20),
        (Bomber, HeavyLaser, 10),
        (Bomber, IonCannon, 10),
        (Destroyer, EspionageProbe, 5),
        (Destroyer, SolarSatellite, 5),
        (Destroyer, Battlecruiser, 2),
        (Destroyer, LightLaser, 10),
        (Deathstar, SmallCargo, 250),
        (Deathstar, LargeCargo, 250),
        (Deathstar, LightFighter, 200),
        (Deathstar, HeavyFighter, 100),
        (Deathstar, Cruiser, 33),
        (Deathstar, Battleship, 30),
        (Deathstar, ColonyShip, 250),
        (Deathstar, Recycler, 250),
        (Deathstar, EspionageProbe, 1_250),
        (Deathstar, Bomber, 25),
        (Deathstar, SolarSatellite, 1_250),
        (Deathstar, Destroyer, 5),
        (Deathstar, Battlecruiser, 15),
        (Deathstar, RocketLauncher, 200),
        (Deathstar, LightLaser, 200),
        (Deathstar, HeavyLaser, 100),
        (Deathstar, GaussCannon, 50),
        (Deathstar, IonCannon, 100),
        (Battlecruiser, SmallCargo, 3),
        (Battlecruiser, LargeCargo, 3),
        (Battlecruiser, HeavyFighter, 4),
        (Battlecruiser, Cruiser, 4),
        (Battlecruiser, Battleship, 7),
        (Battlecruiser, EspionageProbe, 5),
        (Battlecruiser, SolarSatellite, 5),
        (Battlecruiser, Battlecruiser, 2),
        (Battlecruiser, LightLaser, 10),
    ]
};

/// Per-10000 threshold for a shot count: the streak goes on while a draw in
/// `[0, 10000)` lands at or above it.
fn threshold_for_shots(shots: u32) -> u16 {
    match shots {
        0 | 1 => 0,
        shots => (10_000 / shots) as u16,
    }
}

impl ItemCatalog {
    pub fn standard() -> Self {
        let mut catalog = Self {
            items: PerUnit(STANDARD_ITEMS),
            rapid_fire: [[0u16; UNIT_KIND_COUNT]; UNIT_KIND_COUNT],
        };
        for &(attacker, defender, shots) in STANDARD_RAPID_FIRE {
            catalog.set_rapid_fire(attacker, defender, shots);
        }
        catalog
    }

    /// Load a catalog from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let file: CatalogFile = if is_yaml {
            serde_yaml::from_str(&raw).map_err(|err| ConfigError::Catalog {
                path: display.clone(),
                message: err.to_string(),
            })?
        } else {
            serde_json::from_str(&raw).map_err(|err| ConfigError::Catalog {
                path: display.clone(),
                message: err.to_string(),
            })?
        };
        Self::from_file(file).map_err(|message| ConfigError::Catalog {
            path: display,
            message,
        })
    }

    fn from_file(file: CatalogFile) -> Result<Self, String> {
        let mut items = PerUnit(STANDARD_ITEMS);
        for kind in UnitKind::ALL {
            match file.items.get(&kind) {
                Some(stats) => items[kind] = *stats,
                None => return Err(format!("missing item '{}'", kind.code())),
            }
        }
        let mut catalog = Self {
            items,
            rapid_fire: [[0u16; UNIT_KIND_COUNT]; UNIT_KIND_COUNT],
        };
        for (attacker, row) in &file.rapid_fire {
            for (defender, &shots) in row {
                if shots > 10_000 {
                    return Err(format!(
                        "rapid fire {} -> {} exceeds 10000 shots",
                        attacker.code(),
                        defender.code()
                    ));
                }
                catalog.set_rapid_fire(*attacker, *defender, shots);
            }
        }
        Ok(catalog)
    }

    /// Replace one rapid-fire entry, given as an average shot count.
    /// 0 or 1 shot disables it.
    pub fn set_rapid_fire(&mut self, attacker: UnitKind, defender: UnitKind, shots: u32) {
        self.rapid_fire[attacker.index()][defender.index()] = threshold_for_shots(shots);
    }

    #[inline]
    pub fn stats_for(&self, kind: UnitKind) -> &ItemStats {
        &self.items[kind]
    }

    /// Per-10000 rapid-fire threshold; 0 means no rapid fire.
    #[inline]
    pub fn rapid_fire(&self, attacker: UnitKind, defender: UnitKind) -> u16 {
        self.rapid_fire[attacker.index()][defender.index()]
    }

    pub fn missile_price(&self) -> u32 {
        MISSILE_METAL + MISSILE_CRYSTAL + DEUTERIUM_WEIGHT * MISSILE_DEUTERIUM
    }
}

impl Default for ItemCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
