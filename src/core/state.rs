use crate::core::stat_curve::{clamp_stage, legacy_boost_multiplier, stage_multiplier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Atk,
    Def,
    Satk,
    Sdef,
    Spd,
}

impl StatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Atk => "atk",
            StatKind::Def => "def",
            StatKind::Satk => "satk",
            StatKind::Sdef => "sdef",
            StatKind::Spd => "spd",
        }
    }

    pub const ALL: [StatKind; 5] = [
        StatKind::Atk,
        StatKind::Def,
        StatKind::Satk,
        StatKind::Sdef,
        StatKind::Spd,
    ];
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    pub base: i32,
    pub current: i32,
    #[serde(default)]
    pub boost: i32,
}

impl StatBlock {
    pub fn new(base: i32) -> Self {
        Self {
            base,
            current: base,
            boost: 0,
        }
    }

    pub fn set_boost(&mut self, stage: i32) {
        self.boost = clamp_stage(stage);
    }

    pub fn adjust_boost(&mut self, delta: i32) {
        self.set_boost(self.boost.saturating_add(delta));
    }

    pub fn total(&self) -> f64 {
        self.current as f64 * stage_multiplier(self.boost)
    }

    pub fn modifier(&self) -> i32 {
        (self.total() / 2.0).floor() as i32
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub atk: StatBlock,
    pub def: StatBlock,
    pub satk: StatBlock,
    pub sdef: StatBlock,
    pub spd: StatBlock,
}

impl Stats {
    pub fn uniform(value: i32) -> Self {
        Self {
            atk: StatBlock::new(value),
            def: StatBlock::new(value),
            satk: StatBlock::new(value),
            sdef: StatBlock::new(value),
            spd: StatBlock::new(value),
        }
    }

    pub fn get(&self, kind: StatKind) -> &StatBlock {
        match kind {
            StatKind::Atk => &self.atk,
            StatKind::Def => &self.def,
            StatKind::Satk => &self.satk,
            StatKind::Sdef => &self.sdef,
            StatKind::Spd => &self.spd,
        }
    }

    pub fn get_mut(&mut self, kind: StatKind) -> &mut StatBlock {
        match kind {
            StatKind::Atk => &mut self.atk,
            StatKind::Def => &mut self.def,
            StatKind::Satk => &mut self.satk,
            StatKind::Sdef => &mut self.sdef,
            StatKind::Spd => &mut self.spd,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    pub max: i32,
    pub current: i32,
}

impl HitPoints {
    pub fn full(max: i32) -> Self {
        Self { max, current: max }
    }

    pub fn missing(&self) -> i32 {
        (self.max - self.current).max(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AilmentKind {
    Burn,
    Confuse,
    Curse,
    Frozen,
    Charm,
    Paralyzed,
    Poison,
    Sleep,
    Stun,
    Toxic,
    Flinch,
    Irradiated,
}

impl AilmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AilmentKind::Burn => "burn",
            AilmentKind::Confuse => "confuse",
            AilmentKind::Curse => "curse",
            AilmentKind::Frozen => "frozen",
            AilmentKind::Charm => "charm",
            AilmentKind::Paralyzed => "paralyzed",
            AilmentKind::Poison => "poison",
            AilmentKind::Sleep => "sleep",
            AilmentKind::Stun => "stun",
            AilmentKind::Toxic => "toxic",
            AilmentKind::Flinch => "flinch",
            AilmentKind::Irradiated => "irradiated",
        }
    }

    /// Maps ailment names from imported move data. Unrecognised names
    /// (including "none") yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let kind = match name.trim().to_lowercase().as_str() {
            "burn" => AilmentKind::Burn,
            "confuse" | "confusion" => AilmentKind::Confuse,
            "curse" => AilmentKind::Curse,
            "frozen" | "freeze" => AilmentKind::Frozen,
            "charm" | "infatuation" => AilmentKind::Charm,
            "paralyzed" | "paralysis" => AilmentKind::Paralyzed,
            "poison" => AilmentKind::Poison,
            "sleep" => AilmentKind::Sleep,
            "stun" => AilmentKind::Stun,
            "toxic" => AilmentKind::Toxic,
            "flinch" => AilmentKind::Flinch,
            "irradiated" => AilmentKind::Irradiated,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for AilmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectivenessOverride {
    Immune,
    Quarter,
    Half,
    Normal,
    Double,
    Quadruple,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResistanceOverride {
    #[serde(rename = "type")]
    pub element: String,
    pub value: EffectivenessOverride,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatureSnapshot {
    pub id: String,
    pub name: String,
    pub types: Vec<String>,
    pub stats: Stats,
    pub hp: HitPoints,
    #[serde(default)]
    pub statuses: BTreeSet<AilmentKind>,
    #[serde(default)]
    pub moves: Vec<String>,
    #[serde(default)]
    pub accuracy_stage: i32,
    #[serde(default)]
    pub evasion_stage: i32,
    #[serde(default)]
    pub crit_stage: i32,
    #[serde(default)]
    pub resistance_overrides: Vec<ResistanceOverride>,
    #[serde(default)]
    pub move_uses: HashMap<String, i32>,
}

impl CreatureSnapshot {
    pub fn new(id: impl Into<String>, name: impl Into<String>, types: Vec<String>, stats: Stats, max_hp: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            types,
            stats,
            hp: HitPoints::full(max_hp),
            statuses: BTreeSet::new(),
            moves: Vec::new(),
            accuracy_stage: 0,
            evasion_stage: 0,
            crit_stage: 0,
            resistance_overrides: Vec::new(),
            move_uses: HashMap::new(),
        }
    }

    pub fn with_moves(mut self, moves: &[&str]) -> Self {
        self.moves = moves.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn is_fainted(&self) -> bool {
        self.hp.current <= 0
    }

    pub fn has_type(&self, element: &str) -> bool {
        !element.is_empty() && self.types.iter().any(|t| t.eq_ignore_ascii_case(element))
    }

    pub fn stat_total(&self, kind: StatKind) -> f64 {
        self.stats.get(kind).total()
    }

    pub fn stat_mod(&self, kind: StatKind) -> i32 {
        self.stats.get(kind).modifier()
    }

    /// Base stat scaled by the legacy boost conversion.
    pub fn tester_stat(&self, kind: StatKind) -> f64 {
        let block = self.stats.get(kind);
        block.base as f64 * legacy_boost_multiplier(block.boost)
    }

    pub fn speed(&self) -> f64 {
        self.stat_total(StatKind::Spd)
    }

    pub fn set_accuracy_stage(&mut self, stage: i32) {
        self.accuracy_stage = clamp_stage(stage);
    }

    pub fn set_evasion_stage(&mut self, stage: i32) {
        self.evasion_stage = clamp_stage(stage);
    }

    pub fn set_crit_stage(&mut self, stage: i32) {
        self.crit_stage = clamp_stage(stage);
    }

    /// Sets current HP, clamped into `[0, max]`.
    pub fn set_hp(&mut self, value: i32) {
        self.hp.current = value.clamp(0, self.hp.max.max(0));
    }

    pub fn override_for(&self, element: &str) -> Option<EffectivenessOverride> {
        self.resistance_overrides
            .iter()
            .find(|o| o.element.eq_ignore_ascii_case(element))
            .map(|o| o.value)
    }

    /// Checks the creature data before it is used in resolution.
    pub fn validate(&self) -> crate::core::error::Result<()> {
        use crate::core::error::EngineError;
        if self.types.is_empty() || self.types.len() > 2 {
            return Err(EngineError::Input(format!(
                "{} must have one or two types, found {}",
                self.name,
                self.types.len()
            )));
        }
        if self.hp.max <= 0 {
            return Err(EngineError::Input(format!("{} has no max hp", self.name)));
        }
        Ok(())
    }
}
