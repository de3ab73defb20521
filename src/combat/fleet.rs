//! Fleet state: unit counts, technology, tech-scaled stats and the battle
//! unit table the engine fights with.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::combat::travel::Coordinate;
use crate::combat::unit::{Drive, PerUnit, UnitCounts, UnitKind, UNIT_KIND_COUNT};
use crate::data::catalog::{
    ItemCatalog, DEUTERIUM_WEIGHT, MISSILE_CRYSTAL, MISSILE_DEUTERIUM, MISSILE_METAL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Attacker,
    Defender,
}

impl Role {
    pub const fn opponent(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attacker => "attacker",
            Self::Defender => "defender",
        }
    }

    /// Kinds that enter the battle unit table. Attacker defense slots are
    /// missiles and never fight in rounds.
    pub fn combat_kinds(self) -> Range<usize> {
        match self {
            Self::Attacker => UnitKind::SHIPS,
            Self::Defender => 0..UNIT_KIND_COUNT,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechLevels {
    pub weapons: u8,
    pub shielding: u8,
    pub armour: u8,
    pub combustion: u8,
    pub impulse: u8,
    pub hyperspace: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub metal: u64,
    pub crystal: u64,
    pub deuterium: u64,
}

/// Per-kind stats after technology scaling. Structure is stored at a tenth
/// of the catalog value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UnitStats {
    pub shield: f32,
    /// `100 / shield`: a hit counts once `damage * shield_ratio >= 1`.
    pub shield_ratio: f32,
    pub attack: f32,
    pub structure: f32,
    /// `100 / structure`, the remaining-structure percentage per point.
    pub structure_ratio: f32,
    pub metal: u32,
    pub crystal: u32,
    pub deuterium: u32,
    pub price: f32,
    pub capacity: u32,
    pub speed: u32,
    pub fuel: u32,
}

impl UnitStats {
    pub fn derive(kind: UnitKind, role: Role, tech: TechLevels, catalog: &ItemCatalog) -> Self {
        let base = catalog.stats_for(kind);
        let scale = |level: u8, per_level: f32| 1.0 + per_level * f32::from(level);

        let shield = base.shield * scale(tech.shielding, 0.1);
        let structure = base.structure as f32 * scale(tech.armour, 0.1) / 10.0;
        let speed = match kind.drive() {
            Drive::Combustion => (base.speed as f32 * scale(tech.combustion, 0.1)) as u32,
            Drive::Impulse => (base.speed as f32 * scale(tech.impulse, 0.2)) as u32,
            Drive::Hyperspace => (base.speed as f32 * scale(tech.hyperspace, 0.3)) as u32,
            Drive::Static => 0,
        };
        let (metal, crystal, deuterium) = if role == Role::Attacker && !kind.is_ship() {
            (MISSILE_METAL, MISSILE_CRYSTAL, MISSILE_DEUTERIUM)
        } else {
            (base.metal, base.crystal, base.deuterium)
        };

        Self {
            shield,
            shield_ratio: 100.0 / shield,
            attack: base.attack * scale(tech.weapons, 0.1),
            structure,
            structure_ratio: 100.0 / structure,
            metal,
            crystal,
            deuterium,
            price: (metal + crystal + DEUTERIUM_WEIGHT * deuterium) as f32,
            capacity: base.capacity,
            speed,
            fuel: base.fuel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BattleUnit {
    pub kind: UnitKind,
    pub shield: f32,
    pub structure: f32,
    pub destroyed: bool,
}

/// Arena of per-unit battle state. Slots `[0, live)` are in the fight.
#[derive(Debug, Clone, Default)]
pub struct BattleUnitTable {
    slots: Vec<BattleUnit>,
    live: usize,
}

impl BattleUnitTable {
    pub fn with_capacity(units: usize) -> Self {
        Self {
            slots: Vec::with_capacity(units),
            live: 0,
        }
    }

    /// Rebuild from `counts` for kinds in `kinds`, every unit at full structure.
    pub fn fill(&mut self, counts: &UnitCounts, stats: &PerUnit<UnitStats>, kinds: Range<usize>) {
        self.slots.clear();
        for kind in kinds.map(|index| UnitKind::ALL[index]) {
            let unit = BattleUnit {
                kind,
                shield: 0.0,
                structure: stats[kind].structure,
                destroyed: false,
            };
            self.slots
                .extend(std::iter::repeat(unit).take(counts[kind] as usize));
        }
        self.live = self.slots.len();
    }

    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn units(&self) -> &[BattleUnit] {
        &self.slots[..self.live]
    }

    #[inline]
    pub(crate) fn unit_mut(&mut self, index: usize) -> &mut BattleUnit {
        &mut self.slots[index]
    }

    pub fn regenerate_shields(&mut self, stats: &PerUnit<UnitStats>) {
        for unit in &mut self.slots[..self.live] {
            unit.shield = stats[unit.kind].shield;
        }
    }

    /// Swap-remove every destroyed unit with the last live slot and decrement
    /// its kind in `current`.
    pub fn compact(&mut self, current: &mut UnitCounts) {
        let mut index = 0;
        while index < self.live {
            if self.slots[index].destroyed {
                let kind = self.slots[index].kind;
                current[kind] = current[kind].saturating_sub(1);
                self.live -= 1;
                self.slots.swap(index, self.live);
            } else {
                index += 1;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fleet {
    role: Role,
    coordinate: Option<Coordinate>,
    tech: TechLevels,
    resources: Resources,
    interceptors: u32,
    initial: UnitCounts,
    pub(crate) current: UnitCounts,
    pub(crate) stats: PerUnit<UnitStats>,
    pub(crate) table: BattleUnitTable,
}

impl Fleet {
    pub fn new(role: Role, tech: TechLevels, catalog: &ItemCatalog) -> Self {
        let mut fleet = Self {
            role,
            coordinate: None,
            tech,
            resources: Resources::default(),
            interceptors: 0,
            initial: UnitCounts::default(),
            current: UnitCounts::default(),
            stats: PerUnit([UnitStats::default(); UNIT_KIND_COUNT]),
            table: BattleUnitTable::default(),
        };
        fleet.derive_stats(catalog);
        fleet
    }

    fn derive_stats(&mut self, catalog: &ItemCatalog) {
        for kind in UnitKind::ALL {
            self.stats[kind] = UnitStats::derive(kind, self.role, self.tech, catalog);
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    pub fn set_coordinate(&mut self, coordinate: Option<Coordinate>) {
        self.coordinate = coordinate;
    }

    pub fn tech(&self) -> TechLevels {
        self.tech
    }

    /// Change technology levels; every derived stat is recomputed.
    pub fn set_tech(&mut self, tech: TechLevels, catalog: &ItemCatalog) {
        self.tech = tech;
        self.derive_stats(catalog);
    }

    /// Recompute derived stats against another catalog.
    pub fn rebind_catalog(&mut self, catalog: &ItemCatalog) {
        self.derive_stats(catalog);
    }

    pub fn resources(&self) -> Resources {
        self.resources
    }

    pub fn set_resources(&mut self, resources: Resources) {
        self.resources = resources;
    }

    pub fn interceptors(&self) -> u32 {
        self.interceptors
    }

    pub fn set_interceptors(&mut self, interceptors: u32) {
        self.interceptors = interceptors;
    }

    pub fn initial(&self) -> &UnitCounts {
        &self.initial
    }

    pub fn current(&self) -> &UnitCounts {
        &self.current
    }

    /// Replace the configured counts. Survivors reset to the new counts.
    pub fn set_initial(&mut self, counts: UnitCounts) {
        self.initial = counts;
        self.current = counts;
    }

    pub fn stats(&self, kind: UnitKind) -> &UnitStats {
        &self.stats[kind]
    }

    pub fn live_units(&self) -> usize {
        self.table.live()
    }

    pub fn battle_table(&self) -> &BattleUnitTable {
        &self.table
    }

    /// Reserve battle slots for up to `units` combatants.
    pub fn reserve_units(&mut self, units: usize) {
        self.table = BattleUnitTable::with_capacity(units);
    }

    /// Whether `kind` counts toward the fleet's unit total.
    #[inline]
    pub fn counts_toward_units(&self, kind: UnitKind) -> bool {
        self.role.combat_kinds().contains(&kind.index())
    }

    pub fn unit_count(&self, counts: &UnitCounts) -> u64 {
        counts
            .iter()
            .filter(|(kind, _)| self.counts_toward_units(*kind))
            .map(|(_, &n)| u64::from(n))
            .sum()
    }

    /// Configured combat units.
    pub fn ship_count(&self) -> u64 {
        self.unit_count(&self.initial)
    }

    /// Combat units still standing.
    pub fn surviving_count(&self) -> u64 {
        self.unit_count(&self.current)
    }

    pub fn price_of(&self, counts: &UnitCounts) -> f64 {
        counts
            .iter()
            .map(|(kind, &n)| f64::from(n) * f64::from(self.stats[kind].price))
            .sum()
    }

    /// Reset survivors to the configured counts and build the battle table.
    pub(crate) fn deploy(&mut self) {
        self.current = self.initial;
        let kinds = self.role.combat_kinds();
        self.table.fill(&self.initial, &self.stats, kinds);
    }

    /// Like [`Fleet::deploy`] but fighting with `counts` instead of the
    /// configured ones, which stay untouched.
    pub(crate) fn deploy_with(&mut self, counts: &UnitCounts) {
        self.current = *counts;
        let kinds = self.role.combat_kinds();
        self.table.fill(counts, &self.stats, kinds);
    }
}
