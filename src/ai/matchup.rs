use crate::core::config::ResolutionMode;
use crate::core::resolver::{formula_bindings, ResolveContext};
use crate::core::state::{AilmentKind, CreatureSnapshot, StatKind};
use crate::data::moves::{MoveClass, MoveDescriptor};
use crate::data::type_chart::Effectiveness;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveSummary {
    pub move_id: String,
    pub class: MoveClass,
    /// `None` for status moves, which are listed but never ranked.
    pub expected_damage: Option<f64>,
    pub scaling: Option<f64>,
    pub effectiveness: Effectiveness,
    pub stab: bool,
    pub ailment: Option<AilmentKind>,
    pub usable: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchupReport {
    pub attacker_id: String,
    pub defender_id: String,
    pub defender_hp: i32,
    pub defender_fainted: bool,
    pub moves: Vec<MoveSummary>,
    pub best_move: Option<String>,
    pub best_expected_damage: f64,
    /// `u32::MAX` when no move is expected to deal damage.
    pub turns_to_ko: u32,
    pub goes_first: bool,
    pub physical_ratio: f64,
    pub special_ratio: f64,
    pub ailments: Vec<AilmentKind>,
}

impl MatchupReport {
    pub fn kos_within(&self, turns: u32) -> bool {
        self.turns_to_ko <= turns
    }

    pub fn summary_for(&self, move_id: &str) -> Option<&MoveSummary> {
        self.moves.iter().find(|m| m.move_id == move_id)
    }
}

fn ratio(attacker: &CreatureSnapshot, defender: &CreatureSnapshot, att: StatKind, def: StatKind) -> f64 {
    let divisor = defender.tester_stat(def);
    let divisor = if divisor > 0.0 { divisor } else { 1.0 };
    attacker.tester_stat(att) / divisor
}

/// Chance the move connects, as a 0-1 factor.
///
/// Percentile play uses the raw accuracy. Tactical play counts the d20 faces
/// that meet the defense target.
fn hit_factor(
    attacker: &CreatureSnapshot,
    defender: &CreatureSnapshot,
    descriptor: &MoveDescriptor,
    ctx: &ResolveContext<'_>,
) -> f64 {
    match ctx.mode() {
        ResolutionMode::Simulated => descriptor.accuracy / 100.0,
        ResolutionMode::Tactical => {
            let (att, def) = descriptor.class.stat_keys().unwrap_or((StatKind::Spd, StatKind::Spd));
            let target = ctx.config.base_ac + defender.stat_total(def).floor() as i32;
            let needed = target - attacker.stat_mod(att) - descriptor.accuracy.floor() as i32;
            ((21 - needed) as f64 / 20.0).clamp(0.0, 1.0)
        }
    }
}

/// Estimates how well `attacker` does against `defender` without rolling.
pub fn evaluate_matchup(
    attacker: &CreatureSnapshot,
    defender: &CreatureSnapshot,
    ctx: &ResolveContext<'_>,
) -> MatchupReport {
    let physical_ratio = ratio(attacker, defender, StatKind::Atk, StatKind::Def);
    let special_ratio = ratio(attacker, defender, StatKind::Satk, StatKind::Sdef);
    let effect_ratio = ratio(attacker, defender, StatKind::Spd, StatKind::Spd);

    let mut report = MatchupReport {
        attacker_id: attacker.id.clone(),
        defender_id: defender.id.clone(),
        defender_hp: defender.hp.current,
        defender_fainted: defender.is_fainted(),
        moves: Vec::new(),
        best_move: None,
        best_expected_damage: 0.0,
        turns_to_ko: u32::MAX,
        goes_first: attacker.tester_stat(StatKind::Spd) > defender.tester_stat(StatKind::Spd),
        physical_ratio,
        special_ratio,
        ailments: Vec::new(),
    };

    for move_id in &attacker.moves {
        let Some(descriptor) = ctx.moves.get(move_id) else {
            debug!(move_id = %move_id, attacker = %attacker.id, "skipping unknown move");
            continue;
        };
        let effectiveness = ctx.chart.resolve(&descriptor.element, defender);
        let ailment = descriptor.ailment.map(|a| a.kind);
        if let Some(kind) = ailment {
            if !report.ailments.contains(&kind) {
                report.ailments.push(kind);
            }
        }
        let usable = !descriptor.is_exhausted_for(attacker);

        if !descriptor.is_damaging() {
            report.moves.push(MoveSummary {
                move_id: descriptor.id.clone(),
                class: descriptor.class,
                expected_damage: None,
                scaling: None,
                effectiveness,
                stab: false,
                ailment,
                usable,
            });
            continue;
        }

        let scaling = match descriptor.class {
            MoveClass::Physical => physical_ratio,
            MoveClass::Special => special_ratio,
            _ => effect_ratio,
        };
        let stab = attacker.has_type(&descriptor.element);
        let stab_factor = if stab { ctx.config.stab.matchup } else { 1.0 };
        let bindings = formula_bindings(attacker, descriptor);
        let power = descriptor.average_power(&bindings).unwrap_or(0.0).max(0.0);
        let percent = if effectiveness.immune { 0.0 } else { effectiveness.percent };
        let expected = power * scaling * stab_factor * percent * hit_factor(attacker, defender, descriptor, ctx);

        if usable && expected > report.best_expected_damage {
            report.best_expected_damage = expected;
            report.best_move = Some(descriptor.id.clone());
        }
        report.moves.push(MoveSummary {
            move_id: descriptor.id.clone(),
            class: descriptor.class,
            expected_damage: Some(expected),
            scaling: Some(scaling),
            effectiveness,
            stab,
            ailment,
            usable,
        });
    }

    if report.defender_fainted {
        report.turns_to_ko = 0;
    } else if report.best_expected_damage > 0.0 {
        let turns = (defender.hp.current as f64 / report.best_expected_damage).ceil();
        report.turns_to_ko = if turns >= u32::MAX as f64 { u32::MAX } else { turns as u32 };
    }
    report
}
