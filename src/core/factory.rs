use crate::core::config::{EngineConfig, ResolutionMode};
use crate::core::error::Result;
use crate::core::state::{AilmentKind, CreatureSnapshot, StatBlock, Stats};
use crate::data::moves::{MoveAilment, MoveClass, MoveDatabase, MoveDescriptor, MoveUses, MultiHit};
use crate::data::species::SpeciesData;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};

static CREATURE_COUNTER: AtomicUsize = AtomicUsize::new(1);

#[derive(Clone, Debug, Default)]
pub struct CreateCreatureOptions {
    pub id: Option<String>,
    pub name: Option<String>,
    pub moves: Option<Vec<String>>,
}

/// Raw base stat to engine scale.
pub fn convert_stat(base: i32) -> i32 {
    (base as f64 / 10.0).round() as i32
}

pub fn convert_hp(base: i32, health_multiplier: i32) -> i32 {
    convert_stat(base) * health_multiplier
}

pub fn creature_from_species(
    species: &SpeciesData,
    options: CreateCreatureOptions,
    config: &EngineConfig,
) -> CreatureSnapshot {
    let base = &species.base_stats;
    let stats = Stats {
        atk: StatBlock::new(convert_stat(base.atk)),
        def: StatBlock::new(convert_stat(base.def)),
        satk: StatBlock::new(convert_stat(base.spa)),
        sdef: StatBlock::new(convert_stat(base.spd)),
        spd: StatBlock::new(convert_stat(base.spe)),
    };
    let id = options.id.unwrap_or_else(|| {
        let unique = CREATURE_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{}_{}", species.id, unique)
    });
    let mut creature = CreatureSnapshot::new(
        id,
        options.name.unwrap_or_else(|| species.name.clone()),
        species.types.iter().take(2).map(|t| t.to_lowercase()).collect(),
        stats,
        convert_hp(base.hp, config.health_multiplier),
    );
    creature.moves = options.moves.unwrap_or_else(|| species.moves.clone());
    creature
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawMoveMeta {
    #[serde(default)]
    pub ailment: Option<String>,
    #[serde(default)]
    pub ailment_chance: f64,
    #[serde(default)]
    pub drain: f64,
    #[serde(default)]
    pub crit_rate: i32,
    #[serde(default)]
    pub flinch_chance: f64,
    #[serde(default)]
    pub min_hits: Option<u32>,
    #[serde(default)]
    pub max_hits: Option<u32>,
}

/// Move numbers in the common 0-250 power / 0-100 accuracy scale.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawMove {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub move_type: String,
    pub damage_class: String,
    #[serde(default)]
    pub power: Option<i32>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub pp: Option<i32>,
    #[serde(default)]
    pub meta: Option<RawMoveMeta>,
}

/// `floor(power/20)d6`, with the leftover fraction of a die added as a flat
/// bonus for percentile play and the stat modifier for tactical play.
pub fn power_formula(power: i32, mode: ResolutionMode) -> String {
    let scaled = power as f64 / 20.0;
    let dice = scaled.floor() as i64;
    match mode {
        ResolutionMode::Simulated => {
            let rest = scaled.fract();
            if rest > 0.0 {
                format!("{}d6 + {}", dice, rest * 4.0)
            } else {
                format!("{}d6", dice)
            }
        }
        ResolutionMode::Tactical => format!("{}d6 + @stat.mod", dice),
    }
}

/// Expected value of the rounded `Nd6` power, at least one die.
pub fn power_average(power: i32) -> f64 {
    rounded_dice(power) as f64 * 3.5
}

fn rounded_dice(power: i32) -> i64 {
    ((power as f64 / 20.0).round() as i64).max(1)
}

/// Decomposes `power / 10` into a sum of dice pairs, largest first.
pub fn power_ladder(power: i32) -> String {
    let mut remaining = power as f64 / 10.0;
    let mut dice: Vec<&str> = Vec::new();
    while remaining > 0.0 {
        let (term, step) = if remaining >= 12.0 {
            ("2d12", 12.0)
        } else if remaining >= 10.0 {
            ("2d10", 10.0)
        } else if remaining >= 8.0 {
            ("2d8", 8.0)
        } else if remaining >= 6.0 {
            ("2d6", 6.0)
        } else if remaining >= 4.0 {
            ("2d4", 4.0)
        } else {
            dice.push("1d4");
            break;
        };
        dice.push(term);
        remaining %= step;
    }
    dice.join("+")
}

/// Converts the tactical accuracy scale: 100 or better is 0, every 5 points
/// below is -1.
pub fn tactical_accuracy(accuracy: Option<f64>) -> f64 {
    match accuracy {
        Some(acc) => ((acc - 100.0) / 5.0).min(0.0),
        None => 0.0,
    }
}

pub fn convert_move(raw: &RawMove, mode: ResolutionMode) -> MoveDescriptor {
    let class = match raw.damage_class.to_lowercase().as_str() {
        "physical" => MoveClass::Physical,
        "special" => MoveClass::Special,
        "effect" => MoveClass::Effect,
        _ => MoveClass::Status,
    };
    let meta = raw.meta.clone().unwrap_or_default();
    let power = raw.power.unwrap_or(0);
    let damaging = class != MoveClass::Status && power > 0;

    let mut descriptor = MoveDescriptor::new(&raw.id, class, &raw.move_type.to_lowercase(), "");
    descriptor.name = raw.name.clone();
    if damaging {
        descriptor.power = power_formula(power, mode);
        descriptor.power_average = Some(power_average(power));
    }
    descriptor.accuracy = match mode {
        ResolutionMode::Simulated => raw.accuracy.filter(|a| *a > 0.0).unwrap_or(100.0),
        ResolutionMode::Tactical => tactical_accuracy(raw.accuracy),
    };
    descriptor.priority = raw.priority;
    descriptor.crit_stage = meta.crit_rate;
    descriptor.drain = meta.drain;
    descriptor.flinch_chance = meta.flinch_chance;
    descriptor.uses = match raw.pp {
        Some(pp) if pp > 0 => MoveUses::limited(pp),
        _ => MoveUses::unlimited(),
    };
    if let (Some(min), Some(max)) = (meta.min_hits, meta.max_hits) {
        if min > 0 && max > 0 {
            descriptor.multi_hit = Some(MultiHit {
                min: min.min(max),
                max: min.max(max),
            });
        }
    }
    descriptor.ailment = meta
        .ailment
        .as_deref()
        .and_then(AilmentKind::parse)
        .map(|kind| MoveAilment {
            kind,
            // A listed ailment with no chance is the move's guaranteed effect.
            chance: if meta.ailment_chance > 0.0 { meta.ailment_chance } else { 100.0 },
        });
    descriptor
}

/// Flat move table row. Blank or `-` numeric cells mean "not set".
#[derive(Clone, Debug, Deserialize)]
struct MoveTableRow {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    move_type: String,
    #[serde(alias = "category")]
    damage_class: String,
    #[serde(default)]
    power: String,
    #[serde(default)]
    accuracy: String,
    #[serde(default)]
    pp: String,
    #[serde(default)]
    priority: String,
    #[serde(default)]
    ailment: String,
    #[serde(default)]
    ailment_chance: String,
    #[serde(default)]
    drain: String,
}

fn cell<T: std::str::FromStr>(value: &str) -> Option<T> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    trimmed.parse().ok()
}

/// Reads a CSV move table with a header row.
pub fn raw_moves_from_csv<R: Read>(reader: R) -> Result<Vec<RawMove>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut moves = Vec::new();
    for row in rdr.deserialize() {
        let row: MoveTableRow = row?;
        if row.id.is_empty() {
            continue;
        }
        let ailment = cell::<String>(&row.ailment);
        moves.push(RawMove {
            id: row.id,
            name: row.name.filter(|n| !n.is_empty()),
            move_type: row.move_type,
            damage_class: row.damage_class,
            power: cell(&row.power),
            accuracy: cell(&row.accuracy),
            priority: cell(&row.priority).unwrap_or(0),
            pp: cell(&row.pp),
            meta: Some(RawMoveMeta {
                ailment,
                ailment_chance: cell(&row.ailment_chance).unwrap_or(0.0),
                drain: cell(&row.drain).unwrap_or(0.0),
                ..RawMoveMeta::default()
            }),
        });
    }
    Ok(moves)
}

pub fn move_database_from_raw(raw: &[RawMove], mode: ResolutionMode) -> MoveDatabase {
    let mut db = MoveDatabase::new();
    for entry in raw {
        db.insert(convert_move(entry, mode));
    }
    db
}
