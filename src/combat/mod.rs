pub mod engine;
pub mod fleet;
pub mod rng;
pub mod stats;
pub mod travel;
pub mod unit;

pub use engine::{resolve, CombatEngine, EXPLOSION_THRESHOLD, MAX_ROUNDS};
pub use fleet::{BattleUnit, BattleUnitTable, Fleet, Resources, Role, TechLevels, UnitStats};
pub use rng::Rng;
pub use stats::{
    simulate_battle, simulate_battle_parallel, Debris, ResourceLoss, SideReport,
    StatisticsReport, DEBRIS_RATIO,
};
pub use travel::{distance, distance_between, flight_time, Coordinate, Flight};
pub use unit::{PerUnit, UnitClass, UnitCounts, UnitKind, UnitMask, UNIT_KIND_COUNT};
