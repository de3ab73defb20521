//! Unit kinds and the fixed-size per-kind map used by every fleet table.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

pub const UNIT_KIND_COUNT: usize = 22;

/// Every unit a fleet can field, in table order. Ships come first, then
/// static defenses. For an attacker the defense slots hold missiles aimed
/// at that defense kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    SmallCargo,
    LargeCargo,
    LightFighter,
    HeavyFighter,
    Cruiser,
    Battleship,
    ColonyShip,
    Recycler,
    EspionageProbe,
    Bomber,
    SolarSatellite,
    Destroyer,
    Deathstar,
    Battlecruiser,
    RocketLauncher,
    LightLaser,
    HeavyLaser,
    GaussCannon,
    IonCannon,
    PlasmaTurret,
    SmallShieldDome,
    LargeShieldDome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitClass {
    Ship,
    Defense,
    /// Shield domes: at most one of each per defender.
    ShieldDome,
}

/// Which drive technology scales a ship's speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    Combustion,
    Impulse,
    Hyperspace,
    Static,
}

impl UnitKind {
    pub const ALL: [UnitKind; UNIT_KIND_COUNT] = [
        Self::SmallCargo,
        Self::LargeCargo,
        Self::LightFighter,
        Self::HeavyFighter,
        Self::Cruiser,
        Self::Battleship,
        Self::ColonyShip,
        Self::Recycler,
        Self::EspionageProbe,
        Self::Bomber,
        Self::SolarSatellite,
        Self::Destroyer,
        Self::Deathstar,
        Self::Battlecruiser,
        Self::RocketLauncher,
        Self::LightLaser,
        Self::HeavyLaser,
        Self::GaussCannon,
        Self::IonCannon,
        Self::PlasmaTurret,
        Self::SmallShieldDome,
        Self::LargeShieldDome,
    ];

    pub const SHIPS: std::ops::Range<usize> = 0..14;
    pub const DEFENSES: std::ops::Range<usize> = 14..UNIT_KIND_COUNT;

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn class(self) -> UnitClass {
        match self {
            Self::SmallCargo
            | Self::LargeCargo
            | Self::LightFighter
            | Self::HeavyFighter
            | Self::Cruiser
            | Self::Battleship
            | Self::ColonyShip
            | Self::Recycler
            | Self::EspionageProbe
            | Self::Bomber
            | Self::SolarSatellite
            | Self::Destroyer
            | Self::Deathstar
            | Self::Battlecruiser => UnitClass::Ship,
            Self::RocketLauncher
            | Self::LightLaser
            | Self::HeavyLaser
            | Self::GaussCannon
            | Self::IonCannon
            | Self::PlasmaTurret => UnitClass::Defense,
            Self::SmallShieldDome | Self::LargeShieldDome => UnitClass::ShieldDome,
        }
    }

    pub const fn is_ship(self) -> bool {
        matches!(self.class(), UnitClass::Ship)
    }

    pub const fn drive(self) -> Drive {
        match self {
            Self::LargeCargo | Self::LightFighter | Self::Recycler | Self::EspionageProbe => {
                Drive::Combustion
            }
            Self::SmallCargo | Self::HeavyFighter | Self::Cruiser | Self::ColonyShip => {
                Drive::Impulse
            }
            Self::Bomber
            | Self::Battleship
            | Self::Destroyer
            | Self::Deathstar
            | Self::Battlecruiser => Drive::Hyperspace,
            _ => Drive::Static,
        }
    }

    /// Short code used in fleet specifications and logs.
    pub const fn code(self) -> &'static str {
        match self {
            Self::SmallCargo => "sc",
            Self::LargeCargo => "lc",
            Self::LightFighter => "lf",
            Self::HeavyFighter => "hf",
            Self::Cruiser => "cr",
            Self::Battleship => "bs",
            Self::ColonyShip => "cs",
            Self::Recycler => "rec",
            Self::EspionageProbe => "ep",
            Self::Bomber => "bmb",
            Self::SolarSatellite => "sat",
            Self::Destroyer => "dst",
            Self::Deathstar => "ds",
            Self::Battlecruiser => "bc",
            Self::RocketLauncher => "rl",
            Self::LightLaser => "ll",
            Self::HeavyLaser => "hl",
            Self::GaussCannon => "gc",
            Self::IonCannon => "ic",
            Self::PlasmaTurret => "pt",
            Self::SmallShieldDome => "ssd",
            Self::LargeShieldDome => "lsd",
        }
    }
}

/// Fixed-size map keyed by [`UnitKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerUnit<T>(pub [T; UNIT_KIND_COUNT]);

impl<T: Copy + Default> Default for PerUnit<T> {
    fn default() -> Self {
        Self([T::default(); UNIT_KIND_COUNT])
    }
}

impl<T> PerUnit<T> {
    pub fn iter(&self) -> impl Iterator<Item = (UnitKind, &T)> {
        UnitKind::ALL.into_iter().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (UnitKind, &mut T)> {
        UnitKind::ALL.into_iter().zip(self.0.iter_mut())
    }
}

impl<T> Index<UnitKind> for PerUnit<T> {
    type Output = T;

    #[inline]
    fn index(&self, kind: UnitKind) -> &T {
        &self.0[kind.index()]
    }
}

impl<T> IndexMut<UnitKind> for PerUnit<T> {
    #[inline]
    fn index_mut(&mut self, kind: UnitKind) -> &mut T {
        &mut self.0[kind.index()]
    }
}

/// Per-kind unit counts.
pub type UnitCounts = PerUnit<u32>;

impl UnitCounts {
    pub fn total(&self) -> u64 {
        self.0.iter().map(|&n| u64::from(n)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&n| n == 0)
    }
}

/// Set of unit kinds, one bit per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitMask(u32);

impl UnitMask {
    pub const EMPTY: UnitMask = UnitMask(0);

    pub const fn of(kinds: &[UnitKind]) -> Self {
        let mut bits = 0u32;
        let mut i = 0;
        while i < kinds.len() {
            bits |= 1 << kinds[i] as u32;
            i += 1;
        }
        Self(bits)
    }

    pub const fn defenses() -> Self {
        Self::of(&[
            UnitKind::RocketLauncher,
            UnitKind::LightLaser,
            UnitKind::HeavyLaser,
            UnitKind::GaussCannon,
            UnitKind::IonCannon,
            UnitKind::PlasmaTurret,
            UnitKind::SmallShieldDome,
            UnitKind::LargeShieldDome,
        ])
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(self, kind: UnitKind) -> bool {
        self.0 & (1 << kind as u32) != 0
    }

    /// Kinds not in the mask.
    pub fn allowed(self) -> impl Iterator<Item = UnitKind> {
        UnitKind::ALL.into_iter().filter(move |&kind| !self.contains(kind))
    }
}
