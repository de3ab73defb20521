//! Battle resolution: a missile strike followed by up to six rounds of fire.
//!
//! Every random decision draws from the caller's [`Rng`], so a battle is a
//! pure function of both fleets and the generator state.

use crate::combat::fleet::{BattleUnit, Fleet, UnitStats};
use crate::combat::rng::Rng;
use crate::combat::unit::{UnitCounts, UnitKind};
use crate::data::catalog::{ItemCatalog, MISSILE_DAMAGE};

pub const MAX_ROUNDS: u8 = 6;

/// A unit at or below this share of its structure may blow up.
pub const EXPLOSION_THRESHOLD: f32 = 0.7;

/// Rapid-fire draws fall in `[0, RAPID_FIRE_SCALE)`.
pub const RAPID_FIRE_SCALE: u32 = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct CombatEngine<'a> {
    catalog: &'a ItemCatalog,
}

impl<'a> CombatEngine<'a> {
    pub fn new(catalog: &'a ItemCatalog) -> Self {
        Self { catalog }
    }

    /// Fight one battle and return the number of rounds played.
    ///
    /// Both fleets start from their configured counts; survivors are left in
    /// [`Fleet::current`] and the live battle tables.
    pub fn resolve(&self, attacker: &mut Fleet, defender: &mut Fleet, rng: &mut Rng) -> u8 {
        attacker.deploy();
        let standing = missile_strike(attacker, defender);
        defender.deploy_with(&standing);

        let mut rounds = 0;
        while rounds < MAX_ROUNDS && attacker.live_units() > 0 && defender.live_units() > 0 {
            attacker.table.regenerate_shields(&attacker.stats);
            defender.table.regenerate_shields(&defender.stats);

            self.volley(attacker, defender, rng);
            self.volley(defender, attacker, rng);

            defender.table.compact(&mut defender.current);
            attacker.table.compact(&mut attacker.current);
            rounds += 1;
        }
        rounds
    }

    /// Every live unit of `shooter` fires at `target`, chaining rapid fire.
    /// Destroyed targets stay in the table until the round ends.
    fn volley(&self, shooter: &Fleet, target: &mut Fleet, rng: &mut Rng) {
        for gun in shooter.table.units() {
            let damage = shooter.stats[gun.kind].attack;
            loop {
                let index = rng.below(target.table.live() as u32) as usize;
                let unit = target.table.unit_mut(index);
                let target_kind = unit.kind;
                let stats = &target.stats[target_kind];

                // Hits under 1% of the target's shield bounce off; rapid
                // fire is still rolled.
                if damage * stats.shield_ratio >= 1.0 && !unit.destroyed {
                    hit(unit, damage, stats, rng);
                }

                let threshold = self.catalog.rapid_fire(gun.kind, target_kind);
                if threshold == 0 || rng.below(RAPID_FIRE_SCALE) < u32::from(threshold) {
                    break;
                }
            }
        }
    }
}

fn hit(unit: &mut BattleUnit, damage: f32, stats: &UnitStats, rng: &mut Rng) {
    let dealt = (damage * 10.0).floor() * 0.1;
    let overflow = dealt - unit.shield;
    unit.shield -= dealt;
    if overflow <= 0.0 {
        return;
    }

    unit.structure -= overflow;
    unit.shield = 0.0;
    if unit.structure < 0.0 {
        unit.destroyed = true;
    } else if unit.structure <= EXPLOSION_THRESHOLD * stats.structure
        && rng.below(100) as f32 >= unit.structure * stats.structure_ratio
    {
        unit.destroyed = true;
    }
}

/// Fire the attacker's missiles at the defender's static defenses and return
/// the defenses left standing. The interceptor pool shields every defense
/// kind in turn and is only spent by the first salvo that overwhelms it.
fn missile_strike(attacker: &mut Fleet, defender: &Fleet) -> UnitCounts {
    let mut standing = *defender.initial();
    let mut interceptors = defender.interceptors();
    let per_missile = MISSILE_DAMAGE * (1.0 + f32::from(attacker.tech().weapons) / 10.0);

    for kind in UnitKind::DEFENSES.map(|index| UnitKind::ALL[index]) {
        let missiles = attacker.initial()[kind];
        if missiles > interceptors {
            let damage = (missiles - interceptors) as f32 * per_missile;
            interceptors = 0;
            let destroyed = (damage / defender.stats[kind].structure) as u32;
            standing[kind] -= destroyed.min(standing[kind]);
        }
        attacker.current[kind] = 0;
    }
    standing
}

/// Resolve one battle with the given catalog's rapid-fire table.
pub fn resolve(
    attacker: &mut Fleet,
    defender: &mut Fleet,
    catalog: &ItemCatalog,
    rng: &mut Rng,
) -> u8 {
    CombatEngine::new(catalog).resolve(attacker, defender, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::fleet::{Role, TechLevels};

    fn fleet(role: Role, units: &[(UnitKind, u32)]) -> Fleet {
        let mut fleet = Fleet::new(role, TechLevels::default(), &ItemCatalog::standard());
        let mut counts = UnitCounts::default();
        for &(kind, n) in units {
            counts[kind] = n;
        }
        fleet.set_initial(counts);
        fleet
    }

    #[test]
    fn empty_defender_plays_no_rounds() {
        let catalog = ItemCatalog::standard();
        let mut attacker = fleet(Role::Attacker, &[(UnitKind::Cruiser, 3)]);
        let mut defender = fleet(Role::Defender, &[]);
        let rounds = resolve(&mut attacker, &mut defender, &catalog, &mut Rng::new(1));
        assert_eq!(rounds, 0);
        assert_eq!(attacker.current()[UnitKind::Cruiser], 3);
    }

    #[test]
    fn zero_attack_never_scratches() {
        let catalog = ItemCatalog::standard();
        let mut attacker = fleet(Role::Attacker, &[(UnitKind::EspionageProbe, 50)]);
        let mut defender = fleet(Role::Defender, &[(UnitKind::SolarSatellite, 1)]);
        // Satellites hit back with 1 damage against a probe's 0 shield.
        let rounds = resolve(&mut attacker, &mut defender, &catalog, &mut Rng::new(5));
        assert!(rounds <= MAX_ROUNDS);
        assert_eq!(defender.current()[UnitKind::SolarSatellite], 1);
    }

    #[test]
    fn missiles_destroy_defenses_and_are_consumed() {
        let catalog = ItemCatalog::standard();
        let mut attacker = fleet(Role::Attacker, &[(UnitKind::RocketLauncher, 2)]);
        let mut defender = fleet(Role::Defender, &[(UnitKind::RocketLauncher, 100)]);
        // 2 * 12000 damage against 200 structure each.
        resolve(&mut attacker, &mut defender, &catalog, &mut Rng::new(9));
        assert_eq!(attacker.current()[UnitKind::RocketLauncher], 0);
        assert_eq!(defender.current()[UnitKind::RocketLauncher], 0);
        assert_eq!(defender.initial()[UnitKind::RocketLauncher], 100);
    }

    #[test]
    fn interceptors_absorb_missiles() {
        let catalog = ItemCatalog::standard();
        let mut attacker = fleet(Role::Attacker, &[(UnitKind::RocketLauncher, 2)]);
        let mut defender = fleet(Role::Defender, &[(UnitKind::RocketLauncher, 100)]);
        defender.set_interceptors(1);
        resolve(&mut attacker, &mut defender, &catalog, &mut Rng::new(9));
        assert_eq!(defender.current()[UnitKind::RocketLauncher], 40);
    }

    #[test]
    fn absorbed_salvos_leave_the_interceptor_pool_intact() {
        let mut attacker = fleet(
            Role::Attacker,
            &[(UnitKind::RocketLauncher, 2), (UnitKind::LightLaser, 2)],
        );
        let mut defender = fleet(
            Role::Defender,
            &[(UnitKind::RocketLauncher, 100), (UnitKind::LightLaser, 100)],
        );
        defender.set_interceptors(2);
        attacker.deploy();
        let standing = missile_strike(&mut attacker, &defender);
        assert_eq!(standing[UnitKind::RocketLauncher], 100);
        assert_eq!(standing[UnitKind::LightLaser], 100);
        assert_eq!(attacker.current()[UnitKind::RocketLauncher], 0);
        assert_eq!(attacker.current()[UnitKind::LightLaser], 0);
    }

    #[test]
    fn overwhelmed_interceptors_are_spent() {
        let mut attacker = fleet(
            Role::Attacker,
            &[(UnitKind::RocketLauncher, 3), (UnitKind::LightLaser, 2)],
        );
        let mut defender = fleet(
            Role::Defender,
            &[(UnitKind::RocketLauncher, 100), (UnitKind::LightLaser, 100)],
        );
        defender.set_interceptors(2);
        attacker.deploy();
        let standing = missile_strike(&mut attacker, &defender);
        // One missile through: 12000 damage against 200 structure.
        assert_eq!(standing[UnitKind::RocketLauncher], 40);
        assert_eq!(standing[UnitKind::LightLaser], 0);
    }

    #[test]
    fn deathstar_chains_through_probes() {
        let catalog = ItemCatalog::standard();
        let mut attacker = fleet(Role::Attacker, &[(UnitKind::Deathstar, 1)]);
        let mut defender = fleet(Role::Defender, &[(UnitKind::EspionageProbe, 2_000)]);
        let rounds = resolve(&mut attacker, &mut defender, &catalog, &mut Rng::new(3));
        assert!(rounds >= 1);
        let destroyed = 2_000 - defender.current()[UnitKind::EspionageProbe];
        // A single gun without rapid fire kills at most one probe a round.
        assert!(destroyed > u32::from(rounds), "{destroyed} in {rounds} rounds");
        assert_eq!(attacker.current()[UnitKind::Deathstar], 1);
    }

    #[test]
    fn weak_shots_bounce_off_a_large_shield_dome() {
        let catalog = ItemCatalog::standard();
        let mut attacker = fleet(
            Role::Attacker,
            &[(UnitKind::LightFighter, 500), (UnitKind::EspionageProbe, 50)],
        );
        let mut defender = fleet(Role::Defender, &[(UnitKind::LargeShieldDome, 1)]);
        let rounds = resolve(&mut attacker, &mut defender, &catalog, &mut Rng::new(12));
        assert_eq!(rounds, MAX_ROUNDS);
        assert_eq!(defender.current()[UnitKind::LargeShieldDome], 1);
        let dome = defender.table.units()[0];
        let stats = &defender.stats[UnitKind::LargeShieldDome];
        assert_eq!(dome.shield, stats.shield);
        assert_eq!(dome.structure, stats.structure);
    }

    #[test]
    fn rapid_fire_is_rolled_after_a_bounce() {
        let mut catalog = ItemCatalog::standard();
        catalog.set_rapid_fire(UnitKind::LightFighter, UnitKind::LargeShieldDome, 10_000);
        let engine = CombatEngine::new(&catalog);
        for seed in 0..20 {
            let mut shooter = fleet(Role::Attacker, &[(UnitKind::LightFighter, 1)]);
            let mut target = fleet(
                Role::Defender,
                &[(UnitKind::EspionageProbe, 1), (UnitKind::LargeShieldDome, 1)],
            );
            shooter.deploy();
            target.deploy();
            target.table.regenerate_shields(&target.stats);
            engine.volley(&shooter, &mut target, &mut Rng::new(seed));

            // Bounces on the dome keep the chain going, so the probe gets hit.
            let probe = target
                .table
                .units()
                .iter()
                .find(|unit| unit.kind == UnitKind::EspionageProbe)
                .expect("probe in table");
            assert!(
                probe.structure < target.stats[UnitKind::EspionageProbe].structure,
                "seed {seed}"
            );
        }
    }

    #[test]
    fn survivors_never_exceed_configured_counts() {
        let catalog = ItemCatalog::standard();
        let mut rng = Rng::new(2024);
        let mut attacker = fleet(
            Role::Attacker,
            &[(UnitKind::LightFighter, 300), (UnitKind::Cruiser, 40)],
        );
        let mut defender = fleet(
            Role::Defender,
            &[(UnitKind::RocketLauncher, 200), (UnitKind::HeavyLaser, 30)],
        );
        for _ in 0..20 {
            let rounds = resolve(&mut attacker, &mut defender, &catalog, &mut rng);
            assert!(rounds <= MAX_ROUNDS);
            for fleet in [&attacker, &defender] {
                for (kind, &alive) in fleet.current().iter() {
                    assert!(alive <= fleet.initial()[kind]);
                }
                assert_eq!(fleet.surviving_count(), fleet.live_units() as u64);
            }
        }
    }
}
