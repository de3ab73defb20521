//! Fleet composition as a genetic problem.
//!
//! A chromosome is a [`Fleet`] of the guessed role. Fitness replays
//! [`FITNESS_BATTLES`] battles against a snapshot of the known opponent and
//! scores the resource balance per unit of investment.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::combat::engine::CombatEngine;
use crate::combat::fleet::{BattleUnit, Fleet, Resources, Role};
use crate::combat::rng::Rng;
use crate::combat::stats::DEBRIS_RATIO;
use crate::combat::travel::{flight_time, Flight};
use crate::combat::unit::{UnitClass, UnitCounts, UnitKind, UnitMask, UNIT_KIND_COUNT};
use crate::data::catalog::{ItemCatalog, DEUTERIUM_WEIGHT, MISSILE_DAMAGE};
use crate::optimizer::genetic::GeneticProblem;
use crate::optimizer::REJECTED;

/// Battles replayed per fitness evaluation.
pub const FITNESS_BATTLES: u32 = 32;

const SKIP_KIND_PROBABILITY: f32 = 0.15;
const MUTATION_JUMP_PROBABILITY: f32 = 0.05;

const NORMAL_DEFENDER_MASK: UnitMask = UnitMask::of(&[
    UnitKind::SmallCargo,
    UnitKind::LargeCargo,
    UnitKind::ColonyShip,
    UnitKind::Recycler,
    UnitKind::EspionageProbe,
    UnitKind::SolarSatellite,
]);

const NORMAL_ATTACKER_MASK: UnitMask =
    NORMAL_DEFENDER_MASK.union(UnitMask::of(&[UnitKind::Deathstar]));

const DEF_DEFENDER_MASK: UnitMask = UnitMask::of(&[
    UnitKind::SmallCargo,
    UnitKind::LargeCargo,
    UnitKind::LightFighter,
    UnitKind::HeavyFighter,
    UnitKind::Cruiser,
    UnitKind::ColonyShip,
    UnitKind::Recycler,
    UnitKind::EspionageProbe,
    UnitKind::SolarSatellite,
]);

const SCRIPT_MASK: UnitMask = UnitMask::of(&[
    UnitKind::ColonyShip,
    UnitKind::Recycler,
    UnitKind::EspionageProbe,
    UnitKind::SolarSatellite,
    UnitKind::Deathstar,
])
.union(UnitMask::defenses());

/// Which unit kinds the search may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// Everything a role can field.
    Full,
    /// Defender built from heavy ships and defenses only.
    Def,
    /// Combat ships only, with script-friendly defaults.
    Script,
    /// No missiles and no defenses.
    NoMissile,
    #[default]
    Normal,
}

impl SearchMode {
    /// Kinds a candidate of `guessed` role must leave at zero.
    pub const fn forbidden(self, guessed: Role) -> UnitMask {
        match (self, guessed) {
            (Self::Full, Role::Defender) => UnitMask::EMPTY,
            (Self::Full, Role::Attacker) => UnitMask::of(&[UnitKind::SolarSatellite]),
            (Self::Def, Role::Defender) => DEF_DEFENDER_MASK,
            (Self::Script, _) => SCRIPT_MASK,
            (Self::NoMissile, _) => NORMAL_ATTACKER_MASK.union(UnitMask::defenses()),
            (Self::Normal, Role::Defender) => NORMAL_DEFENDER_MASK,
            (Self::Normal | Self::Def, Role::Attacker) => NORMAL_ATTACKER_MASK,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Def => "def",
            Self::Script => "script",
            Self::NoMissile => "no-missile",
            Self::Normal => "normal",
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "def" => Ok(Self::Def),
            "script" => Ok(Self::Script),
            "no-missile" | "nomissile" => Ok(Self::NoMissile),
            "normal" => Ok(Self::Normal),
            other => Err(format!(
                "unknown mode '{other}' (expected full, def, script, no-missile or normal)"
            )),
        }
    }
}

/// Scoring switches that combine with any [`SearchMode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringFlags {
    /// Reject any attacker that loses a single unit.
    pub no_loss: bool,
    /// Ignore debris fields when scoring attackers.
    pub no_recycling: bool,
    /// Only units the guessed side already owns may be used.
    pub no_invest: bool,
    /// Reject attackers whose raid does not pay for itself.
    pub strict_profit: bool,
}

/// Size limits every candidate is trimmed to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    pub max_units: u32,
    pub max_price: f32,
    /// Per defense kind, the most missiles an attacker may carry for it.
    pub missile_caps: UnitCounts,
}

/// A new best composition, as reported to callers.
#[derive(Debug, Clone, Serialize)]
pub struct BestCandidate {
    pub role: Role,
    pub score: f32,
    /// Non-zero counts only.
    pub units: BTreeMap<UnitKind, u32>,
    /// Resources spent on units beyond the known repartition.
    pub investment: Resources,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight: Option<Flight>,
    pub elapsed_secs: f64,
    pub found_at: String,
}

pub type BestSink = Box<dyn Fn(&BestCandidate) + Send + Sync>;

/// Scale, clamp and trim `fleet.initial()` until it fits `budget`.
///
/// Counts are first scaled down by the larger overshoot ratio, then random
/// amounts are removed kind by kind until both limits hold. Kinds that do
/// not count as units are only trimmed while the price is over budget.
pub fn reduce_to_max(fleet: &mut Fleet, budget: &Budget, rng: &mut Rng) {
    let mut counts = *fleet.initial();

    let price = fleet.price_of(&counts);
    let units = fleet.unit_count(&counts);
    let mut ratio = 1.0_f64;
    if price > f64::from(budget.max_price) {
        ratio = ratio.min(f64::from(budget.max_price) / price);
    }
    if units > u64::from(budget.max_units) {
        ratio = ratio.min(f64::from(budget.max_units) / units as f64);
    }
    if ratio < 1.0 {
        for (_, count) in counts.iter_mut() {
            *count = (f64::from(*count) * ratio) as u32;
        }
    }

    match fleet.role() {
        Role::Defender => {
            for (kind, count) in counts.iter_mut() {
                if kind.class() == UnitClass::ShieldDome {
                    *count = (*count).min(1);
                }
            }
        }
        Role::Attacker => {
            for kind in UnitKind::DEFENSES.map(|index| UnitKind::ALL[index]) {
                counts[kind] = counts[kind].min(budget.missile_caps[kind]);
            }
        }
    }

    let mut cursor = 0;
    loop {
        let over_units = fleet.unit_count(&counts) > u64::from(budget.max_units);
        let over_price = fleet.price_of(&counts) > f64::from(budget.max_price);
        if !over_units && !over_price {
            break;
        }
        let kind = UnitKind::ALL[cursor % UNIT_KIND_COUNT];
        cursor += 1;
        let count = counts[kind];
        if count == 0 || (!over_price && !fleet.counts_toward_units(kind)) {
            continue;
        }
        counts[kind] -= 1 + rng.below(count);
    }

    fleet.set_initial(counts);
}

/// Everything a fitness evaluation needs besides the candidate.
pub struct FleetSearch {
    catalog: Arc<ItemCatalog>,
    /// The known side, replayed from its configured counts every battle.
    opponent: Fleet,
    /// Empty candidate of the guessed role, tech and position.
    template: Fleet,
    known: UnitCounts,
    forbidden: UnitMask,
    flags: ScoringFlags,
    budget: Budget,
    /// Debris metal and crystal expected from wiping out the opponent.
    recycled: (u64, u64),
    distance: u32,
    wave_time: u32,
    max_flight_time: u32,
    seed_cursor: AtomicUsize,
    sink: Option<BestSink>,
}

pub struct FleetSearchParams {
    pub mode: SearchMode,
    pub flags: ScoringFlags,
    /// Attacker travel distance; zero when guessing a defender.
    pub distance: u32,
    /// Seconds; zero disables the limit.
    pub max_flight_time: u32,
    /// Seconds between attack waves; zero disables splitting.
    pub wave_time: u32,
}

impl FleetSearch {
    /// `guessed` carries the technology, position and known repartition of
    /// the side to search for; `opponent` is fought as configured.
    pub fn new(
        guessed: &Fleet,
        opponent: Fleet,
        catalog: Arc<ItemCatalog>,
        params: FleetSearchParams,
    ) -> Self {
        let role = guessed.role();
        let known = *guessed.initial();
        let mut missile_caps = UnitCounts::default();

        let opponent_ships = opponent.initial();
        let mut debris_metal = 0_u64;
        let mut debris_crystal = 0_u64;
        for kind in UnitKind::SHIPS.map(|index| UnitKind::ALL[index]) {
            let stats = opponent.stats(kind);
            debris_metal += u64::from(opponent_ships[kind]) * u64::from(stats.metal);
            debris_crystal += u64::from(opponent_ships[kind]) * u64::from(stats.crystal);
        }

        let (mut max_price, mut max_units) = match role {
            Role::Attacker => {
                let max_price = 3.5 * opponent.price_of(opponent.initial());
                let fighter = f64::from(opponent.stats(UnitKind::LightFighter).price);
                let missile_damage = f64::from(MISSILE_DAMAGE)
                    * (1.0 + f64::from(guessed.tech().weapons) / 10.0);
                for kind in UnitKind::DEFENSES.map(|index| UnitKind::ALL[index]) {
                    let count = opponent.initial()[kind];
                    if count > 0 {
                        let structure = f64::from(opponent.stats(kind).structure);
                        let needed = (structure * f64::from(count) / missile_damage).ceil() as u32;
                        missile_caps[kind] = opponent.interceptors().saturating_add(needed);
                    }
                }
                (max_price, max_price / fighter)
            }
            Role::Defender => {
                let mut ships = UnitCounts::default();
                for kind in UnitKind::SHIPS.map(|index| UnitKind::ALL[index]) {
                    ships[kind] = opponent.initial()[kind];
                }
                let max_price = 1.5 * opponent.price_of(&ships);
                // Attacker missile slots are priced as missiles.
                let missile = f64::from(opponent.stats(UnitKind::RocketLauncher).price);
                (max_price, max_price / missile)
            }
        };
        max_price = max_price.max(guessed.price_of(&known));
        max_units = max_units.max(known.total() as f64);
        let budget = Budget {
            max_units: (max_units as u32).max(1),
            max_price: max_price as f32,
            missile_caps,
        };

        let scale = |amount: u64| ((amount as f64 * DEBRIS_RATIO) as u64).max(1);
        let recycled = (scale(debris_metal), scale(debris_crystal));

        let mut template = Fleet::new(role, guessed.tech(), &catalog);
        template.set_coordinate(guessed.coordinate());
        template.set_resources(guessed.resources());
        template.reserve_units(budget.max_units as usize);

        Self {
            catalog,
            opponent,
            template,
            known,
            forbidden: params.mode.forbidden(role),
            flags: params.flags,
            budget,
            recycled,
            distance: params.distance,
            wave_time: params.wave_time,
            max_flight_time: params.max_flight_time,
            seed_cursor: AtomicUsize::new(0),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: BestSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn forbidden(&self) -> UnitMask {
        self.forbidden
    }

    pub fn guessed_role(&self) -> Role {
        self.template.role()
    }

    /// Bytes one chromosome occupies, battle table included.
    pub fn individual_bytes(&self) -> u64 {
        (std::mem::size_of::<Fleet>() + self.budget.max_units as usize * std::mem::size_of::<BattleUnit>())
            as u64
    }

    fn investment(&self, fleet: &Fleet) -> Resources {
        let mut investment = Resources::default();
        for (kind, &count) in fleet.initial().iter() {
            let extra = u64::from(count.saturating_sub(self.known[kind]));
            let stats = fleet.stats(kind);
            investment.metal += extra * u64::from(stats.metal);
            investment.crystal += extra * u64::from(stats.crystal);
            investment.deuterium += extra * u64::from(stats.deuterium);
        }
        investment
    }

    pub fn describe(&self, fleet: &Fleet, score: f32, elapsed: Duration) -> BestCandidate {
        let units = fleet
            .initial()
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(kind, &count)| (kind, count))
            .collect();
        let flight = (fleet.role() == Role::Attacker).then(|| flight_time(fleet, self.distance));
        BestCandidate {
            role: fleet.role(),
            score,
            units,
            investment: self.investment(fleet),
            flight,
            elapsed_secs: elapsed.as_secs_f64(),
            found_at: chrono::Utc::now().to_rfc2822(),
        }
    }

    /// Raid balance of one won battle for an attacker candidate, or `None`
    /// when the flags reject it.
    fn attacker_balance(&self, own: &Fleet, defender: &Fleet, fuel: u64) -> Option<i64> {
        let lost = losses(own);
        if self.flags.no_loss && lost != (1, 1, 1) {
            return None;
        }
        let (mut lost_metal, mut lost_crystal, lost_deuterium) = lost;
        if !self.flags.no_recycling {
            lost_metal = (lost_metal as f64 * (1.0 - DEBRIS_RATIO)) as u64;
            lost_crystal = (lost_crystal as f64 * (1.0 - DEBRIS_RATIO)) as u64;
        }

        let free_capacity: u64 = UnitKind::SHIPS
            .map(|index| UnitKind::ALL[index])
            .map(|kind| u64::from(own.current()[kind]) * u64::from(own.stats(kind).capacity))
            .sum();

        let (mut metal, mut crystal, mut deuterium) = (0_i64, 0_i64, 0_i64);
        if free_capacity >= fuel {
            let room = free_capacity - fuel;
            let stock = defender.resources();
            let (m, c, d) = (stock.metal / 2, stock.crystal / 2, stock.deuterium / 2);
            let wanted = m + c + d;
            if room < wanted {
                let share = room as f64 / wanted as f64;
                metal = (m as f64 * share) as i64;
                crystal = (c as f64 * share) as i64;
                deuterium = (d as f64 * share) as i64;
            } else {
                (metal, crystal, deuterium) = (m as i64, c as i64, d as i64);
            }
            deuterium -= fuel as i64;
        } else if self.flags.no_recycling {
            return None;
        }
        if !self.flags.no_recycling {
            metal += self.recycled.0 as i64;
            crystal += self.recycled.1 as i64;
        }

        let balance = (metal - lost_metal as i64)
            + (crystal - lost_crystal as i64)
            + i64::from(DEUTERIUM_WEIGHT) * (deuterium - lost_deuterium as i64);
        if self.flags.strict_profit && balance < 0 {
            return None;
        }
        Some(balance)
    }
}

/// Resources lost by `fleet` in its last battle, each floored to 1.
/// Remove `delta` worth of `kind`, or add it back when `delta` is negative.
fn offset_price(counts: &mut UnitCounts, kind: UnitKind, delta: f32, price: f32) {
    if price <= 0.0 {
        return;
    }
    let shifted = counts[kind] as f32 - delta / price;
    counts[kind] = shifted.max(0.0) as u32;
}

fn losses(fleet: &Fleet) -> (u64, u64, u64) {
    let (mut metal, mut crystal, mut deuterium) = (0_u64, 0_u64, 0_u64);
    for (kind, &initial) in fleet.initial().iter() {
        let lost = u64::from(initial - fleet.current()[kind]);
        let stats = fleet.stats(kind);
        metal += lost * u64::from(stats.metal);
        crystal += lost * u64::from(stats.crystal);
        deuterium += lost * u64::from(stats.deuterium);
    }
    (metal.max(1), crystal.max(1), deuterium.max(1))
}

impl GeneticProblem for FleetSearch {
    type Chromosome = Fleet;

    fn allocate(&self) -> Fleet {
        self.template.clone()
    }

    fn randomize(&self, fleet: &mut Fleet, rng: &mut Rng) {
        if !self.known.is_empty() {
            let first = self.seed_cursor.fetch_add(1, Ordering::Relaxed);
            if first < UNIT_KIND_COUNT {
                let mut counts = self.known;
                for (kind, count) in counts.iter_mut() {
                    if kind.index() < first {
                        *count = 0;
                    }
                }
                fleet.set_initial(counts);
                return;
            }
        }

        let cap = 1 + rng.below(self.budget.max_units);
        let mut counts = UnitCounts::default();
        for kind in self.forbidden.allowed() {
            if rng.next_f32() < SKIP_KIND_PROBABILITY {
                continue;
            }
            counts[kind] = if self.flags.no_invest {
                (rng.next_f32() * self.known[kind] as f32) as u32
            } else {
                rng.below(cap)
            };
        }
        fleet.set_initial(counts);
        reduce_to_max(fleet, &self.budget, rng);
    }

    fn fitness(&self, fleet: &mut Fleet, rng: &mut Rng) -> f32 {
        let guessed = fleet.role();
        let mut opponent = self.opponent.clone();
        let engine = CombatEngine::new(&self.catalog);

        let mut wave_divider = 1_u64;
        let mut fuel = 0_u64;
        if guessed == Role::Attacker {
            let flight = flight_time(fleet, self.distance);
            if self.max_flight_time > 0 && flight.seconds > self.max_flight_time {
                return REJECTED;
            }
            if self.wave_time > 0 && flight.seconds > self.wave_time {
                wave_divider = u64::from(flight.seconds.div_ceil(self.wave_time));
            }
            fuel = u64::from(flight.fuel);
        }

        if self.flags.no_invest
            && fleet
                .initial()
                .iter()
                .any(|(kind, &count)| count > self.known[kind])
        {
            return REJECTED;
        }
        let investment = self.investment(fleet);
        let invested = (investment.metal + 1)
            + (investment.crystal + 1)
            + u64::from(DEUTERIUM_WEIGHT) * (investment.deuterium + 1);

        let mut numerator_sum = 0_i64;
        let mut divider_sum = 0_u64;
        for _ in 0..FITNESS_BATTLES {
            match guessed {
                Role::Attacker => engine.resolve(fleet, &mut opponent, rng),
                Role::Defender => engine.resolve(&mut opponent, fleet, rng),
            };
            if fleet.surviving_count() == 0 || opponent.surviving_count() != 0 {
                return REJECTED;
            }

            let (numerator, divider) = match guessed {
                Role::Defender => {
                    let (metal, crystal, deuterium) = losses(fleet);
                    let balance = (self.recycled.0 as i64 - metal as i64)
                        + (self.recycled.1 as i64 - crystal as i64)
                        - i64::from(DEUTERIUM_WEIGHT) * deuterium as i64;
                    (balance, invested)
                }
                Role::Attacker => {
                    let Some(balance) = self.attacker_balance(fleet, &opponent, fuel) else {
                        return REJECTED;
                    };
                    let divider = if balance > 0 && !self.flags.no_invest {
                        invested
                    } else {
                        1
                    };
                    (balance, divider)
                }
            };
            numerator_sum += numerator;
            divider_sum += divider * wave_divider;
        }

        (numerator_sum as f64 / divider_sum as f64) as f32
    }

    fn crossover(&self, p: f32, father: &Fleet, mother: &mut Fleet, rng: &mut Rng) {
        let mut counts = *mother.initial();
        for (kind, count) in counts.iter_mut() {
            if rng.next_f32() < p {
                let a = rng.next_f32();
                let blended = a * *count as f32 + (1.0 - a) * father.initial()[kind] as f32;
                *count = blended as u32;
            }
        }
        mother.set_initial(counts);
        reduce_to_max(mother, &self.budget, rng);
    }

    fn mutate(&self, p: f32, fleet: &mut Fleet, rng: &mut Rng) {
        let mut counts = *fleet.initial();
        let allowed: Vec<UnitKind> = self.forbidden.allowed().collect();
        for &kind in &allowed {
            if rng.next_f32() >= p {
                continue;
            }
            let before = counts[kind];
            if before == 0 {
                if rng.next_f32() < MUTATION_JUMP_PROBABILITY {
                    counts[kind] = 1;
                }
                continue;
            }
            if rng.next_f32() < MUTATION_JUMP_PROBABILITY {
                counts[kind] = 0;
                continue;
            }

            let r = 2.0 * rng.next_f32() - 1.0;
            let after = (before as f32 * (1.0 + p * r)).max(0.0) as u32;
            counts[kind] = after;

            // Half the time the price change is offset on another kind.
            if after != before && rng.next_f32() < 0.5 {
                let delta = (after as f32 - before as f32) * fleet.stats(kind).price;
                let other = allowed[rng.below(allowed.len() as u32) as usize];
                if other != kind {
                    offset_price(&mut counts, other, delta, fleet.stats(other).price);
                }
            }
        }
        if fleet.role() == Role::Defender {
            for (kind, count) in counts.iter_mut() {
                if kind.class() == UnitClass::ShieldDome {
                    *count = (*count).min(1);
                }
            }
        }
        fleet.set_initial(counts);
        reduce_to_max(fleet, &self.budget, rng);
    }

    fn on_new_best(&self, fleet: &Fleet, score: f32, elapsed: Duration) {
        let candidate = self.describe(fleet, score, elapsed);
        info!(
            role = %candidate.role,
            score,
            units = candidate.units.values().sum::<u32>(),
            elapsed_secs = candidate.elapsed_secs,
            "new best fleet"
        );
        if let Some(sink) = &self.sink {
            sink(&candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::fleet::TechLevels;
    use crate::combat::travel::Coordinate;

    fn tech() -> TechLevels {
        TechLevels {
            weapons: 10,
            shielding: 10,
            armour: 10,
            combustion: 10,
            impulse: 8,
            hyperspace: 6,
        }
    }

    fn defender(catalog: &ItemCatalog) -> Fleet {
        let mut fleet = Fleet::new(Role::Defender, tech(), catalog);
        fleet.set_coordinate(Some(Coordinate::new(1, 10, 5)));
        fleet.set_resources(Resources {
            metal: 100_000,
            crystal: 50_000,
            deuterium: 20_000,
        });
        let mut counts = UnitCounts::default();
        counts[UnitKind::LightFighter] = 20;
        counts[UnitKind::RocketLauncher] = 30;
        fleet.set_initial(counts);
        fleet
    }

    fn attacker_search(mode: SearchMode, flags: ScoringFlags) -> FleetSearch {
        let catalog = Arc::new(ItemCatalog::standard());
        let mut guessed = Fleet::new(Role::Attacker, tech(), &catalog);
        guessed.set_coordinate(Some(Coordinate::new(1, 12, 5)));
        let opponent = defender(&catalog);
        FleetSearch::new(
            &guessed,
            opponent,
            catalog,
            FleetSearchParams {
                mode,
                flags,
                distance: 2_890,
                max_flight_time: 0,
                wave_time: 0,
            },
        )
    }

    #[test]
    fn masks_follow_mode_and_role() {
        assert!(SearchMode::Normal.forbidden(Role::Attacker).contains(UnitKind::Deathstar));
        assert!(!SearchMode::Normal.forbidden(Role::Defender).contains(UnitKind::Deathstar));
        assert!(SearchMode::Full.forbidden(Role::Defender).allowed().count() == UNIT_KIND_COUNT);
        let def = SearchMode::Def.forbidden(Role::Defender);
        assert!(def.contains(UnitKind::Cruiser));
        assert!(!def.contains(UnitKind::Battleship));
        assert!(!def.contains(UnitKind::PlasmaTurret));
        assert_eq!(
            SearchMode::Def.forbidden(Role::Attacker),
            SearchMode::Normal.forbidden(Role::Attacker)
        );
        let no_missile = SearchMode::NoMissile.forbidden(Role::Attacker);
        assert!(no_missile.contains(UnitKind::RocketLauncher));
        assert!(!no_missile.contains(UnitKind::Bomber));
    }

    #[test]
    fn mode_names_parse() {
        assert_eq!("no-missile".parse::<SearchMode>(), Ok(SearchMode::NoMissile));
        assert_eq!("SCRIPT".parse::<SearchMode>(), Ok(SearchMode::Script));
        assert!("aggressive".parse::<SearchMode>().is_err());
    }

    #[test]
    fn attacker_budget_from_defender() {
        let search = attacker_search(SearchMode::Normal, ScoringFlags::default());
        let budget = search.budget();
        // 20 light fighters and 30 rocket launchers at 4000 and 2000.
        assert_eq!(budget.max_price, 3.5 * 140_000.0);
        assert_eq!(budget.max_units, (3.5 * 140_000.0 / 4_000.0) as u32);
        assert!(budget.missile_caps[UnitKind::RocketLauncher] > 0);
        assert_eq!(budget.missile_caps[UnitKind::PlasmaTurret], 0);
    }

    #[test]
    fn reduce_to_max_respects_both_limits() {
        let search = attacker_search(SearchMode::Full, ScoringFlags::default());
        let budget = Budget {
            max_units: 50,
            max_price: 200_000.0,
            missile_caps: search.budget().missile_caps,
        };
        let mut fleet = search.allocate();
        let mut counts = UnitCounts::default();
        counts[UnitKind::Battleship] = 400;
        counts[UnitKind::LightFighter] = 900;
        counts[UnitKind::RocketLauncher] = 1_000;
        fleet.set_initial(counts);
        let mut rng = Rng::new(3);
        reduce_to_max(&mut fleet, &budget, &mut rng);
        assert!(fleet.unit_count(fleet.initial()) <= 50);
        assert!(fleet.price_of(fleet.initial()) <= 200_000.0);
        assert!(fleet.initial()[UnitKind::RocketLauncher] <= budget.missile_caps[UnitKind::RocketLauncher]);
    }

    #[test]
    fn seeding_walks_the_known_repartition() {
        let catalog = Arc::new(ItemCatalog::standard());
        let mut guessed = Fleet::new(Role::Attacker, tech(), &catalog);
        let mut known = UnitCounts::default();
        known[UnitKind::LightFighter] = 10;
        known[UnitKind::Cruiser] = 4;
        guessed.set_initial(known);
        let search = FleetSearch::new(
            &guessed,
            defender(&catalog),
            catalog,
            FleetSearchParams {
                mode: SearchMode::Normal,
                flags: ScoringFlags::default(),
                distance: 1_000,
                max_flight_time: 0,
                wave_time: 0,
            },
        );
        let mut rng = Rng::new(1);
        let mut fleet = search.allocate();

        search.randomize(&mut fleet, &mut rng);
        assert_eq!(fleet.initial(), &known);
        for _ in 0..3 {
            search.randomize(&mut fleet, &mut rng);
        }
        // The fourth seed zeroes every kind below index 3.
        assert_eq!(fleet.initial()[UnitKind::LightFighter], 0);
        assert_eq!(fleet.initial()[UnitKind::Cruiser], 4);
    }

    #[test]
    fn random_candidates_stay_inside_mask_and_budget() {
        let search = attacker_search(SearchMode::Normal, ScoringFlags::default());
        let forbidden = search.forbidden();
        let mut rng = Rng::new(11);
        let mut fleet = search.allocate();
        for _ in 0..50 {
            search.randomize(&mut fleet, &mut rng);
            for (kind, &count) in fleet.initial().iter() {
                if forbidden.contains(kind) {
                    assert_eq!(count, 0, "{kind:?}");
                }
            }
            assert!(fleet.unit_count(fleet.initial()) <= u64::from(search.budget().max_units));
        }
    }

    #[test]
    fn weak_attacker_is_rejected_and_strong_one_scores() {
        let search = attacker_search(SearchMode::Normal, ScoringFlags::default());
        let mut rng = Rng::new(5);

        let mut weak = search.allocate();
        let mut counts = UnitCounts::default();
        counts[UnitKind::LightFighter] = 1;
        weak.set_initial(counts);
        assert_eq!(search.fitness(&mut weak, &mut rng), REJECTED);

        let mut strong = search.allocate();
        let mut counts = UnitCounts::default();
        counts[UnitKind::Battleship] = 60;
        strong.set_initial(counts);
        let score = search.fitness(&mut strong, &mut rng);
        assert!(score > REJECTED);
        assert!(score.is_finite());
    }

    #[test]
    fn flight_limit_rejects_slow_fleets() {
        let catalog = Arc::new(ItemCatalog::standard());
        let guessed = Fleet::new(Role::Attacker, tech(), &catalog);
        let search = FleetSearch::new(
            &guessed,
            defender(&catalog),
            catalog,
            FleetSearchParams {
                mode: SearchMode::Normal,
                flags: ScoringFlags::default(),
                distance: 20_000,
                max_flight_time: 60,
                wave_time: 0,
            },
        );
        let mut fleet = search.allocate();
        let mut counts = UnitCounts::default();
        counts[UnitKind::Battleship] = 60;
        fleet.set_initial(counts);
        assert_eq!(search.fitness(&mut fleet, &mut Rng::new(2)), REJECTED);
    }

    #[test]
    fn no_invest_rejects_new_units() {
        let flags = ScoringFlags {
            no_invest: true,
            ..ScoringFlags::default()
        };
        let search = attacker_search(SearchMode::Normal, flags);
        let mut fleet = search.allocate();
        let mut counts = UnitCounts::default();
        counts[UnitKind::Battleship] = 60;
        fleet.set_initial(counts);
        assert_eq!(search.fitness(&mut fleet, &mut Rng::new(9)), REJECTED);
    }

    #[test]
    fn price_offset_works_both_ways() {
        let mut counts = UnitCounts::default();
        counts[UnitKind::Cruiser] = 10;
        offset_price(&mut counts, UnitKind::Cruiser, 62_000.0, 31_000.0);
        assert_eq!(counts[UnitKind::Cruiser], 8);
        offset_price(&mut counts, UnitKind::Cruiser, -93_000.0, 31_000.0);
        assert_eq!(counts[UnitKind::Cruiser], 11);
        offset_price(&mut counts, UnitKind::Cruiser, 1.0e9, 31_000.0);
        assert_eq!(counts[UnitKind::Cruiser], 0);
        counts[UnitKind::SolarSatellite] = 4;
        offset_price(&mut counts, UnitKind::SolarSatellite, -5_000.0, 0.0);
        assert_eq!(counts[UnitKind::SolarSatellite], 4);
    }

    #[test]
    fn defender_unit_budget_counts_missile_prices() {
        let catalog = Arc::new(ItemCatalog::standard());
        let guessed = Fleet::new(Role::Defender, tech(), &catalog);
        let mut attacker = Fleet::new(Role::Attacker, tech(), &catalog);
        let mut counts = UnitCounts::default();
        counts[UnitKind::Cruiser] = 40;
        counts[UnitKind::RocketLauncher] = 5;
        attacker.set_initial(counts);
        let search = FleetSearch::new(
            &guessed,
            attacker,
            Arc::clone(&catalog),
            FleetSearchParams {
                mode: SearchMode::Normal,
                flags: ScoringFlags::default(),
                distance: 0,
                max_flight_time: 0,
                wave_time: 0,
            },
        );
        // Ships only: 40 cruisers at 31000, divided by a 35000 missile.
        let max_price = 1.5 * 40.0 * 31_000.0;
        assert_eq!(search.budget().max_price, max_price as f32);
        assert_eq!(
            search.budget().max_units,
            (max_price / f64::from(catalog.missile_price())) as u32
        );
    }

    #[test]
    fn mutation_and_crossover_keep_domes_single() {
        let catalog = Arc::new(ItemCatalog::standard());
        let guessed = Fleet::new(Role::Defender, tech(), &catalog);
        let mut attacker = Fleet::new(Role::Attacker, tech(), &catalog);
        let mut counts = UnitCounts::default();
        counts[UnitKind::Cruiser] = 40;
        attacker.set_initial(counts);
        let search = FleetSearch::new(
            &guessed,
            attacker,
            catalog,
            FleetSearchParams {
                mode: SearchMode::Full,
                flags: ScoringFlags::default(),
                distance: 0,
                max_flight_time: 0,
                wave_time: 0,
            },
        );
        let mut rng = Rng::new(21);
        let mut father = search.allocate();
        let mut mother = search.allocate();
        for _ in 0..40 {
            search.randomize(&mut father, &mut rng);
            search.randomize(&mut mother, &mut rng);
            search.crossover(0.95, &father, &mut mother, &mut rng);
            search.mutate(0.5, &mut mother, &mut rng);
            assert!(mother.initial()[UnitKind::SmallShieldDome] <= 1);
            assert!(mother.initial()[UnitKind::LargeShieldDome] <= 1);
            assert!(mother.unit_count(mother.initial()) <= u64::from(search.budget().max_units));
        }
    }

    #[test]
    fn sink_receives_best_candidates() {
        use parking_lot::Mutex;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let search = attacker_search(SearchMode::Normal, ScoringFlags::default())
            .with_sink(Box::new(move |candidate: &BestCandidate| log.lock().push(candidate.clone())));
        let mut fleet = search.allocate();
        let mut counts = UnitCounts::default();
        counts[UnitKind::Battleship] = 7;
        fleet.set_initial(counts);
        search.on_new_best(&fleet, 1.5, Duration::from_millis(20));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].units.get(&UnitKind::Battleship), Some(&7));
        assert_eq!(seen[0].units.len(), 1);
        assert!(seen[0].flight.is_some());
    }
}
