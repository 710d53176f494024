use crate::core::config::{EngineConfig, ResolutionMode};
use crate::core::dice::{roll, roll_die, DiceExpression};
use crate::core::error::{EngineError, Result};
use crate::core::stat_curve::{accuracy_stage_multiplier, critical_chance};
use crate::core::state::{AilmentKind, CreatureSnapshot, StatKind};
use crate::data::moves::{MoveClass, MoveDatabase, MoveDescriptor};
use crate::data::type_chart::{Effectiveness, TypeChart};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const TACTICAL_ACCURACY_FORMULA: &str = "1d20 + @stat.mod + @accuracy";

#[derive(Clone, Copy, Debug)]
pub struct ResolveContext<'a> {
    pub moves: &'a MoveDatabase,
    pub chart: &'a TypeChart,
    pub config: &'a EngineConfig,
}

impl<'a> ResolveContext<'a> {
    pub fn new(moves: &'a MoveDatabase, chart: &'a TypeChart, config: &'a EngineConfig) -> Self {
        Self { moves, chart, config }
    }

    pub fn mode(&self) -> ResolutionMode {
        self.config.mode
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub move_id: String,
    pub hit: bool,
    pub critical: bool,
    pub effectiveness_stage: i32,
    pub immune: bool,
    pub damage_dealt: i32,
    /// Strikes that landed. 1 for single-hit moves, 0 on a miss.
    pub hits: u32,
    pub ailment_applied: Option<AilmentKind>,
    pub flinched: bool,
    pub drain_healed: i32,
    /// d20 in tactical play, d100 in simulated play.
    pub accuracy_roll: u32,
    pub log: Vec<String>,
}

impl ResolutionOutcome {
    fn new(move_id: &str) -> Self {
        Self {
            move_id: move_id.to_string(),
            hit: false,
            critical: false,
            effectiveness_stage: 0,
            immune: false,
            damage_dealt: 0,
            hits: 0,
            ailment_applied: None,
            flinched: false,
            drain_healed: 0,
            accuracy_roll: 0,
            log: Vec::new(),
        }
    }
}

// Status moves aim like effect moves.
fn accuracy_stats(class: MoveClass) -> (StatKind, StatKind) {
    class.stat_keys().unwrap_or((StatKind::Spd, StatKind::Spd))
}

/// Every stat is available as `@atk` (total), `@atk.total`, `@atk.mod`,
/// `@atk.base` and `@atk.boost`. `@stat.*` aliases the move's attacking
/// stat and `@accuracy` is the move's accuracy value.
pub fn formula_bindings(attacker: &CreatureSnapshot, descriptor: &MoveDescriptor) -> HashMap<String, f64> {
    let mut bindings = HashMap::new();
    let mut add_stat = |prefix: &str, kind: StatKind| {
        let block = attacker.stats.get(kind);
        let total = block.total();
        bindings.insert(prefix.to_string(), total);
        bindings.insert(format!("{}.total", prefix), total);
        bindings.insert(format!("{}.mod", prefix), block.modifier() as f64);
        bindings.insert(format!("{}.base", prefix), block.base as f64);
        bindings.insert(format!("{}.boost", prefix), block.boost as f64);
    };
    for kind in StatKind::ALL {
        add_stat(kind.as_str(), kind);
    }
    add_stat("stat", accuracy_stats(descriptor.class).0);
    bindings.insert("accuracy".to_string(), descriptor.accuracy);
    bindings.insert("hp".to_string(), attacker.hp.current as f64);
    bindings.insert("hp.current".to_string(), attacker.hp.current as f64);
    bindings.insert("hp.max".to_string(), attacker.hp.max as f64);
    bindings
}

fn damage_expression(
    attacker: &CreatureSnapshot,
    descriptor: &MoveDescriptor,
    effectiveness: &Effectiveness,
    config: &EngineConfig,
) -> Result<DiceExpression> {
    let power = descriptor.power.trim();
    let stab = attacker
        .has_type(&descriptor.element)
        .then(|| config.stab.for_mode(config.mode));
    match config.mode {
        ResolutionMode::Tactical => {
            let formula = match stab {
                Some(bonus) => bonus.apply(power),
                None => power.to_string(),
            };
            let mut expression = DiceExpression::parse(&formula)?;
            if effectiveness.stage != 0 {
                expression.adjust_first_dice_count(effectiveness.stage);
            }
            Ok(expression)
        }
        ResolutionMode::Simulated => {
            let (stat, _) = accuracy_stats(descriptor.class);
            let bonus = (attacker.stat_total(stat) / 2.0).floor();
            let mut formula = format!("({}) + {}", power, bonus);
            if let Some(stab) = stab {
                formula = stab.apply(&formula);
            }
            if effectiveness.percent != 1.0 {
                formula = format!("({}) * {}", formula, effectiveness.percent);
            }
            DiceExpression::parse(&formula)
        }
    }
}

fn strike_count(descriptor: &MoveDescriptor, rng: &mut dyn FnMut() -> f64) -> u32 {
    match descriptor.multi_hit {
        Some(multi) if multi.is_active() => {
            let span = multi.max.saturating_sub(multi.min) + 1;
            let extra = ((rng() * span as f64).floor() as u32).min(span - 1);
            multi.min + extra
        }
        _ => 1,
    }
}

/// Nothing is mutated. Fails before any roll when the move has no uses
/// left or the damage formula cannot be evaluated.
pub fn resolve_move(
    attacker: &CreatureSnapshot,
    defender: &CreatureSnapshot,
    descriptor: &MoveDescriptor,
    ctx: &ResolveContext<'_>,
    rng: &mut dyn FnMut() -> f64,
) -> Result<ResolutionOutcome> {
    attacker.validate()?;
    defender.validate()?;
    if !descriptor.accuracy.is_finite() {
        return Err(EngineError::Input(format!(
            "move '{}' has no numeric accuracy",
            descriptor.id
        )));
    }
    if descriptor.is_exhausted_for(attacker) {
        return Err(EngineError::NoUsesRemaining {
            move_id: descriptor.id.clone(),
        });
    }

    let config = ctx.config;
    let bindings = formula_bindings(attacker, descriptor);
    let effectiveness = ctx.chart.resolve(&descriptor.element, defender);
    let damage = if descriptor.is_damaging() {
        let expression = damage_expression(attacker, descriptor, &effectiveness, config)?;
        expression.check_bindings(&bindings)?;
        Some(expression)
    } else {
        None
    };

    let mut outcome = ResolutionOutcome::new(&descriptor.id);
    outcome
        .log
        .push(format!("{} used {}!", attacker.name, descriptor.display_name()));

    let crit_stage = descriptor.crit_stage + attacker.crit_stage;
    let (_, def_stat) = accuracy_stats(descriptor.class);
    match config.mode {
        ResolutionMode::Tactical => {
            let attack_roll = roll(TACTICAL_ACCURACY_FORMULA, &bindings, rng, false)?;
            let natural = attack_roll.first_die().unwrap_or(0);
            let total = attack_roll.total;
            let target = config.base_ac + defender.stat_total(def_stat).floor() as i32;
            outcome.accuracy_roll = natural;
            outcome.critical = natural as i32 >= 20 - crit_stage;
            outcome.hit = total >= target;
            if attack_roll.natural_max() {
                outcome.log.push("Natural 20!".to_string());
            }
            outcome
                .log
                .push(format!("Rolled {} (natural {}) against {}.", total, natural, target));
        }
        ResolutionMode::Simulated => {
            let chance = config.accuracy_band.clamp(
                descriptor.accuracy * accuracy_stage_multiplier(attacker.accuracy_stage - defender.evasion_stage),
            );
            let roll = roll_die(100, rng);
            outcome.accuracy_roll = roll;
            outcome.hit = roll as f64 <= chance;
            if outcome.hit {
                outcome.critical = rng() < critical_chance(crit_stage);
            }
        }
    }

    if !outcome.hit {
        outcome.log.push(format!("{}'s attack missed!", attacker.name));
        debug!(
            move_id = %descriptor.id,
            roll = outcome.accuracy_roll,
            critical = outcome.critical,
            "move missed"
        );
        return Ok(outcome);
    }
    if outcome.critical {
        outcome.log.push("A critical hit!".to_string());
    }

    outcome.immune = effectiveness.immune;
    outcome.effectiveness_stage = effectiveness.stage;

    if let Some(expression) = damage {
        outcome.log.push(effectiveness.describe().to_string());
        if effectiveness.immune {
            outcome.damage_dealt = 0;
        } else {
            let strikes = strike_count(descriptor, rng);
            let mut total: i32 = 0;
            for _ in 0..strikes {
                let rolled = expression.evaluate(&bindings, rng, outcome.critical)?;
                total = total.checked_add(rolled.total.max(0)).ok_or_else(|| {
                    EngineError::Input(format!("damage from move '{}' overflows", descriptor.id))
                })?;
            }
            outcome.hits = strikes;
            outcome.damage_dealt = total.max(0);
            if strikes > 1 {
                outcome.log.push(format!("Hit {} times!", strikes));
            }
            outcome
                .log
                .push(format!("{} took {} damage.", defender.name, outcome.damage_dealt));
        }
    } else {
        outcome.hits = 1;
    }

    if effectiveness.immune {
        debug!(move_id = %descriptor.id, "defender is immune");
        return Ok(outcome);
    }

    if let Some(ailment) = descriptor.ailment {
        if rng() * 100.0 < ailment.chance {
            outcome.ailment_applied = Some(ailment.kind);
            outcome
                .log
                .push(format!("{} is now affected by {}.", defender.name, ailment.kind));
        }
    }

    if descriptor.flinch_chance > 0.0 && outcome.damage_dealt > 0 && rng() * 100.0 < descriptor.flinch_chance {
        outcome.flinched = true;
        outcome.log.push(format!("{} flinched!", defender.name));
    }

    if descriptor.drain > 0.0 && outcome.damage_dealt > 0 {
        let healed = (outcome.damage_dealt as f64 * descriptor.drain / 100.0).floor() as i32;
        outcome.drain_healed = healed.clamp(0, attacker.hp.missing());
        if outcome.drain_healed > 0 {
            outcome
                .log
                .push(format!("{} restored {} HP.", attacker.name, outcome.drain_healed));
        }
    }

    debug!(
        move_id = %descriptor.id,
        damage = outcome.damage_dealt,
        critical = outcome.critical,
        stage = outcome.effectiveness_stage,
        "move resolved"
    );
    Ok(outcome)
}

pub fn resolve_move_seeded(
    attacker: &CreatureSnapshot,
    defender: &CreatureSnapshot,
    descriptor: &MoveDescriptor,
    ctx: &ResolveContext<'_>,
    seed: Option<u64>,
) -> Result<ResolutionOutcome> {
    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let mut next = || rng.gen::<f64>();
    resolve_move(attacker, defender, descriptor, ctx, &mut next)
}
