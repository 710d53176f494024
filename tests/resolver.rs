use combat_engine::core::config::{EngineConfig, ResolutionMode, StabBonus};
use combat_engine::core::error::EngineError;
use combat_engine::core::events::apply_outcome;
use combat_engine::core::resolver::{resolve_move, resolve_move_seeded, ResolveContext};
use combat_engine::core::state::{AilmentKind, CreatureSnapshot, StatBlock, Stats};
use combat_engine::data::moves::{MoveAilment, MoveClass, MoveDatabase, MoveDescriptor, MoveUses, MultiHit};
use combat_engine::data::type_chart::TypeChart;
use proptest::prelude::*;

fn sequence(values: Vec<f64>) -> impl FnMut() -> f64 {
    let mut idx = 0usize;
    move || {
        let v = values[idx % values.len()];
        idx += 1;
        v
    }
}

fn creature(id: &str, types: &[&str], atk: i32, def: i32, hp: i32) -> CreatureSnapshot {
    let stats = Stats {
        atk: StatBlock::new(atk),
        def: StatBlock::new(def),
        satk: StatBlock::new(5),
        sdef: StatBlock::new(5),
        spd: StatBlock::new(5),
    };
    CreatureSnapshot::new(id, id, types.iter().map(|t| t.to_string()).collect(), stats, hp)
}

fn physical(id: &str, element: &str, power: &str) -> MoveDescriptor {
    MoveDescriptor::new(id, MoveClass::Physical, element, power)
}

fn tactical() -> EngineConfig {
    EngineConfig::default().with_mode(ResolutionMode::Tactical)
}

#[test]
fn test_tactical_stab_scenario() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = tactical();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["fire"], 10, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let descriptor = physical("flame_strike", "fire", "2d6+@atk");

    // d20 = 11, then the two d6 land on 1 and 6.
    let mut rng = sequence(vec![0.5, 0.0, 0.9]);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert!(outcome.hit);
    assert!(!outcome.critical);
    assert_eq!(outcome.damage_dealt, 21);

    let off_type = creature("attacker", &["water"], 10, 5, 40);
    let mut rng = sequence(vec![0.5, 0.0, 0.9]);
    let outcome = resolve_move(&off_type, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert_eq!(outcome.damage_dealt, 17);
}

#[test]
fn test_simulated_stab_multiplies() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = EngineConfig::default();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["fire"], 10, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let descriptor = physical("flame_strike", "fire", "2d6");

    // d100 = 1 (hit), crit roll fails, dice 1 and 6.
    let mut rng = sequence(vec![0.0, 0.99, 0.0, 0.9]);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert!(outcome.hit);
    assert!(!outcome.critical);
    // ((7) + 5) * 1.5
    assert_eq!(outcome.damage_dealt, 18);
}

#[test]
fn test_simulated_effectiveness_percent_is_folded_in() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = EngineConfig::default();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["normal"], 10, 5, 40);
    let defender = creature("defender", &["fire"], 5, 5, 40);
    let descriptor = physical("splash_hit", "water", "2d6");

    let mut rng = sequence(vec![0.0, 0.99, 0.0, 0.9]);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert_eq!(outcome.effectiveness_stage, 1);
    assert_eq!(outcome.damage_dealt, 24);
}

#[test]
fn test_tactical_effectiveness_adjusts_dice_count() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = tactical();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["normal"], 10, 5, 40);
    let defender = creature("defender", &["fire"], 5, 5, 40);

    // d20 = 11 then every die rolls 1.
    let super_effective = physical("splash_hit", "water", "2d6");
    let mut rng = sequence(vec![0.5, 0.0, 0.0, 0.0]);
    let outcome = resolve_move(&attacker, &defender, &super_effective, &ctx, &mut rng).unwrap();
    assert_eq!(outcome.damage_dealt, 3);

    let resisted = physical("bug_bite", "bug", "1d6 + 2");
    let mut rng = sequence(vec![0.5, 0.99]);
    let outcome = resolve_move(&attacker, &defender, &resisted, &ctx, &mut rng).unwrap();
    assert_eq!(outcome.effectiveness_stage, -1);
    assert_eq!(outcome.damage_dealt, 2);
}

#[test]
fn test_tactical_natural_twenty_crit_still_misses_on_low_total() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let mut config = tactical();
    config.base_ac = 40;
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["normal"], 2, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let mut descriptor = physical("tackle", "normal", "2d6");
    descriptor.accuracy = 0.0;

    let mut rng = sequence(vec![0.999]);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert_eq!(outcome.accuracy_roll, 20);
    assert!(outcome.critical);
    assert!(!outcome.hit);
    assert_eq!(outcome.damage_dealt, 0);
    assert!(outcome.log.iter().any(|line| line == "Natural 20!"));
}

#[test]
fn test_tactical_crit_maximizes_dice() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = tactical();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["water"], 10, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let descriptor = physical("tackle", "normal", "2d6+@atk.mod");

    let mut rng = sequence(vec![0.999, 0.0]);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert!(outcome.critical && outcome.hit);
    assert_eq!(outcome.damage_dealt, 17);
}

#[test]
fn test_simulated_miss_never_crits() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = EngineConfig::default();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["normal"], 10, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let mut descriptor = physical("tackle", "normal", "2d6");
    descriptor.crit_stage = 3;

    // d100 = 100 is above the 96 ceiling.
    let mut rng = sequence(vec![0.999]);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert!(!outcome.hit);
    assert!(!outcome.critical);
    assert_eq!(outcome.accuracy_roll, 100);
}

#[test]
fn test_simulated_accuracy_band_floor() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = EngineConfig::default();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["normal"], 10, 5, 40);
    let mut defender = creature("defender", &["normal"], 5, 5, 40);
    defender.set_evasion_stage(6);
    let mut descriptor = physical("tackle", "normal", "2d6");
    descriptor.accuracy = 10.0;

    // Roll 33 still hits because the chance is lifted to the band minimum.
    let mut rng = sequence(vec![0.325, 0.99, 0.5]);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert_eq!(outcome.accuracy_roll, 33);
    assert!(outcome.hit);

    let mut rng = sequence(vec![0.335]);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert_eq!(outcome.accuracy_roll, 34);
    assert!(!outcome.hit);
}

#[test]
fn test_immunity_zeroes_damage_and_skips_ailment() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let attacker = creature("attacker", &["normal"], 30, 5, 40);
    let defender = creature("ghost", &["ghost"], 5, 5, 40);
    let mut descriptor = physical("body_slam", "normal", "4d6+@atk");
    descriptor.ailment = Some(MoveAilment {
        kind: AilmentKind::Paralyzed,
        chance: 100.0,
    });
    descriptor.drain = 50.0;

    for mode in [ResolutionMode::Tactical, ResolutionMode::Simulated] {
        let config = EngineConfig::default().with_mode(mode);
        let ctx = ResolveContext::new(&moves, &chart, &config);
        for r in [0.0, 0.3, 0.999] {
            let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut || r).unwrap();
            assert_eq!(outcome.damage_dealt, 0);
            assert_eq!(outcome.ailment_applied, None);
            assert_eq!(outcome.drain_healed, 0);
            if outcome.hit {
                assert!(outcome.immune);
            }
        }
    }
}

#[test]
fn test_no_uses_remaining_refuses() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = EngineConfig::default();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["normal"], 10, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let mut descriptor = physical("hyper_beam", "normal", "6d6");
    descriptor.uses = MoveUses { value: 0, max: 5 };

    let before = defender.clone();
    let err = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut || 0.0).unwrap_err();
    assert!(matches!(err, EngineError::NoUsesRemaining { ref move_id } if move_id == "hyper_beam"));
    assert_eq!(defender, before);

    // Per-creature remaining uses take precedence over the descriptor value.
    descriptor.uses = MoveUses::limited(5);
    let mut tired = attacker.clone();
    tired.move_uses.insert("hyper_beam".to_string(), 0);
    assert!(resolve_move(&tired, &defender, &descriptor, &ctx, &mut || 0.0).is_err());
    assert!(resolve_move(&attacker, &defender, &descriptor, &ctx, &mut || 0.0).is_ok());
}

#[test]
fn test_parse_failure_aborts_before_rolling() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = EngineConfig::default();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["normal"], 10, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let mut rng = || -> f64 { panic!("no roll expected") };

    let broken = physical("broken", "normal", "2d6 +");
    let err = resolve_move(&attacker, &defender, &broken, &ctx, &mut rng).unwrap_err();
    assert!(err.is_input_error());

    let unbound = physical("unbound", "normal", "2d6 + @luck");
    let err = resolve_move(&attacker, &defender, &unbound, &ctx, &mut rng).unwrap_err();
    assert!(matches!(err, EngineError::UnknownBinding(_)));
}

#[test]
fn test_drain_heals_half_of_damage() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = tactical();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let mut attacker = creature("attacker", &["water"], 10, 5, 40);
    attacker.set_hp(15);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let mut descriptor = physical("leech", "grass", "20");
    descriptor.drain = 50.0;

    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut || 0.5).unwrap();
    assert_eq!(outcome.damage_dealt, 20);
    assert_eq!(outcome.drain_healed, 10);

    let (healed, hurt) = apply_outcome(&attacker, &defender, &descriptor, &outcome);
    assert_eq!(healed.hp.current, 25);
    assert_eq!(hurt.hp.current, 20);

    attacker.set_hp(36);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut || 0.5).unwrap();
    assert_eq!(outcome.drain_healed, 4);
    let (healed, _) = apply_outcome(&attacker, &defender, &descriptor, &outcome);
    assert_eq!(healed.hp.current, 40);
}

#[test]
fn test_ailment_roll() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = tactical();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["fire"], 10, 5, 40);
    let defender = creature("defender", &["grass"], 5, 5, 40);
    let mut descriptor = physical("ember", "fire", "1d6");
    descriptor.ailment = Some(MoveAilment {
        kind: AilmentKind::Burn,
        chance: 30.0,
    });

    // d20, two d6 (stage +1), then the ailment roll.
    let mut rng = sequence(vec![0.5, 0.5, 0.5, 0.2]);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert_eq!(outcome.ailment_applied, Some(AilmentKind::Burn));

    let mut rng = sequence(vec![0.5, 0.5, 0.5, 0.35]);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert_eq!(outcome.ailment_applied, None);
}

#[test]
fn test_multi_hit_sums_strikes() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = tactical();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["water"], 10, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let mut descriptor = physical("fury", "normal", "3");
    descriptor.multi_hit = Some(MultiHit { min: 2, max: 5 });

    // d20 = 11, strike count draw 0.99 -> 5 strikes.
    let mut rng = sequence(vec![0.5, 0.99]);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert_eq!(outcome.hits, 5);
    assert_eq!(outcome.damage_dealt, 15);

    let mut rng = sequence(vec![0.5, 0.0]);
    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap();
    assert_eq!(outcome.hits, 2);
    assert_eq!(outcome.damage_dealt, 6);
}

#[test]
fn test_overflowing_damage_is_an_input_error() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = tactical();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["water"], 10, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let mut descriptor = physical("meteor", "normal", "99999999999");
    descriptor.multi_hit = Some(MultiHit { min: 2, max: 2 });

    let mut rng = sequence(vec![0.5]);
    let err = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut rng).unwrap_err();
    assert!(matches!(err, EngineError::Input(_)));
    assert!(err.is_input_error());

    let oversized = physical("oversized", "normal", "1000d5000000");
    let err = resolve_move(&attacker, &defender, &oversized, &ctx, &mut sequence(vec![0.5])).unwrap_err();
    assert!(matches!(err, EngineError::Parse { .. }));
}

#[test]
fn test_flinch_is_recorded() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = tactical();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["water"], 10, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let mut descriptor = physical("bite", "dark", "4");
    descriptor.flinch_chance = 30.0;

    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut || 0.1).unwrap();
    assert!(outcome.flinched);
    let (_, target) = apply_outcome(&attacker, &defender, &descriptor, &outcome);
    assert!(target.statuses.contains(&AilmentKind::Flinch));
}

#[test]
fn test_status_move_deals_no_damage() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let config = EngineConfig::default();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["normal"], 10, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let mut descriptor = MoveDescriptor::new("thunder_wave", MoveClass::Status, "electric", "");
    descriptor.ailment = Some(MoveAilment {
        kind: AilmentKind::Paralyzed,
        chance: 100.0,
    });

    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut || 0.0).unwrap();
    assert!(outcome.hit);
    assert_eq!(outcome.damage_dealt, 0);
    assert_eq!(outcome.ailment_applied, Some(AilmentKind::Paralyzed));
}

#[test]
fn test_flat_stab_can_be_reconfigured() {
    let moves = MoveDatabase::new();
    let chart = TypeChart::new();
    let mut config = tactical();
    config.stab.tactical = StabBonus::Multiplier(2.0);
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["fire"], 10, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let descriptor = physical("flame_strike", "fire", "5");

    let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut || 0.5).unwrap();
    assert_eq!(outcome.damage_dealt, 10);
}

#[test]
fn test_seeded_resolution_is_deterministic() {
    let moves = MoveDatabase::minimal();
    let chart = TypeChart::new();
    let config = EngineConfig::default();
    let ctx = ResolveContext::new(&moves, &chart, &config);
    let attacker = creature("attacker", &["normal"], 10, 5, 40);
    let defender = creature("defender", &["normal"], 5, 5, 40);
    let descriptor = moves.get("tackle").unwrap();

    let first = resolve_move_seeded(&attacker, &defender, descriptor, &ctx, Some(42)).unwrap();
    let second = resolve_move_seeded(&attacker, &defender, descriptor, &ctx, Some(42)).unwrap();
    assert_eq!(first, second);
}

proptest! {
    #[test]
    fn immune_targets_never_take_damage(r in 0.0f64..1.0, tactical_mode in any::<bool>()) {
        let moves = MoveDatabase::new();
        let chart = TypeChart::new();
        let mode = if tactical_mode { ResolutionMode::Tactical } else { ResolutionMode::Simulated };
        let config = EngineConfig::default().with_mode(mode);
        let ctx = ResolveContext::new(&moves, &chart, &config);
        let attacker = creature("attacker", &["electric"], 20, 5, 40);
        let defender = creature("defender", &["ground"], 5, 5, 40);
        let descriptor = physical("spark", "electric", "3d8+@atk");
        let outcome = resolve_move(&attacker, &defender, &descriptor, &ctx, &mut || r).unwrap();
        prop_assert_eq!(outcome.damage_dealt, 0);
    }
}
