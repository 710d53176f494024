use crate::core::dice::DiceExpression;
use crate::core::error::{EngineError, Result};
use crate::core::state::{AilmentKind, CreatureSnapshot, StatKind};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveClass {
    Physical,
    Special,
    Status,
    Effect,
}

impl MoveClass {
    /// Attacking and defending stat for damaging classes.
    pub fn stat_keys(&self) -> Option<(StatKind, StatKind)> {
        match self {
            MoveClass::Physical => Some((StatKind::Atk, StatKind::Def)),
            MoveClass::Special => Some((StatKind::Satk, StatKind::Sdef)),
            MoveClass::Effect => Some((StatKind::Spd, StatKind::Spd)),
            MoveClass::Status => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoveClass::Physical => "physical",
            MoveClass::Special => "special",
            MoveClass::Status => "status",
            MoveClass::Effect => "effect",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiHit {
    pub min: u32,
    pub max: u32,
}

impl MultiHit {
    pub fn is_active(&self) -> bool {
        self.min > 0 && self.max > 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveAilment {
    pub kind: AilmentKind,
    /// Percent chance, 0-100.
    pub chance: f64,
}

/// Remaining and maximum uses. `max == 0` means unlimited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveUses {
    #[serde(default)]
    pub value: i32,
    #[serde(default)]
    pub max: i32,
}

impl MoveUses {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn limited(max: i32) -> Self {
        Self { value: max, max }
    }

    pub fn is_limited(&self) -> bool {
        self.max > 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(alias = "category")]
    pub class: MoveClass,
    #[serde(rename = "type", default)]
    pub element: String,
    #[serde(default, deserialize_with = "power_from_text_or_number")]
    pub power: String,
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub multi_hit: Option<MultiHit>,
    #[serde(default)]
    pub ailment: Option<MoveAilment>,
    #[serde(default, alias = "critRate")]
    pub crit_stage: i32,
    #[serde(default)]
    pub drain: f64,
    #[serde(default)]
    pub flinch_chance: f64,
    #[serde(default)]
    pub uses: MoveUses,
    #[serde(default)]
    pub power_average: Option<f64>,
}

fn default_accuracy() -> f64 {
    100.0
}

fn power_from_text_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Power {
        Text(String),
        Number(f64),
        Missing(()),
    }
    Ok(match Power::deserialize(deserializer)? {
        Power::Text(text) => text,
        Power::Number(value) if value.fract() == 0.0 => format!("{}", value as i64),
        Power::Number(value) => value.to_string(),
        Power::Missing(()) => String::new(),
    })
}

impl MoveDescriptor {
    pub fn new(id: &str, class: MoveClass, element: &str, power: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            class,
            element: element.to_string(),
            power: power.to_string(),
            accuracy: default_accuracy(),
            priority: 0,
            multi_hit: None,
            ailment: None,
            crit_stage: 0,
            drain: 0.0,
            flinch_chance: 0.0,
            uses: MoveUses::unlimited(),
            power_average: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn is_damaging(&self) -> bool {
        self.class != MoveClass::Status && !self.power.trim().is_empty()
    }

    /// Parsed power formula. Status moves and blank power parse as `0`.
    pub fn power_expression(&self) -> Result<DiceExpression> {
        if self.power.trim().is_empty() {
            return DiceExpression::parse("0");
        }
        DiceExpression::parse(&self.power)
    }

    /// Expected value of the power formula, preferring a stored average.
    pub fn average_power(&self, bindings: &HashMap<String, f64>) -> Result<f64> {
        if let Some(avg) = self.power_average {
            return Ok(avg);
        }
        self.power_expression()?.average(bindings)
    }

    /// Uses left on `creature`, falling back to the descriptor's starting value.
    pub fn uses_remaining(&self, creature: &CreatureSnapshot) -> i32 {
        creature.move_uses.get(&self.id).copied().unwrap_or(self.uses.value)
    }

    pub fn is_exhausted_for(&self, creature: &CreatureSnapshot) -> bool {
        self.uses.is_limited() && self.uses_remaining(creature) <= 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(EngineError::Input("move without an id".to_string()));
        }
        if !self.accuracy.is_finite() {
            return Err(EngineError::Input(format!("move '{}' has no numeric accuracy", self.id)));
        }
        if let Some(multi) = self.multi_hit {
            if multi.min > multi.max {
                return Err(EngineError::Input(format!(
                    "move '{}' hits {}..{} times",
                    self.id, multi.min, multi.max
                )));
            }
        }
        self.power_expression()?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MoveDatabase {
    moves: HashMap<String, MoveDescriptor>,
}

impl MoveDatabase {
    pub fn new() -> Self {
        Self {
            moves: HashMap::new(),
        }
    }

    /// A handful of moves covering each damage class.
    pub fn minimal() -> Self {
        let mut db = Self::new();
        let mut tackle = MoveDescriptor::new("tackle", MoveClass::Physical, "normal", "2d6");
        tackle.name = Some("Tackle".to_string());
        db.insert(tackle);

        let mut ember = MoveDescriptor::new("ember", MoveClass::Special, "fire", "2d6");
        ember.name = Some("Ember".to_string());
        ember.ailment = Some(MoveAilment {
            kind: AilmentKind::Burn,
            chance: 10.0,
        });
        db.insert(ember);

        let mut water_gun = MoveDescriptor::new("water_gun", MoveClass::Special, "water", "2d6");
        water_gun.name = Some("Water Gun".to_string());
        db.insert(water_gun);

        let mut vine_whip = MoveDescriptor::new("vine_whip", MoveClass::Physical, "grass", "2d6+1");
        vine_whip.name = Some("Vine Whip".to_string());
        db.insert(vine_whip);

        let mut quick_attack = MoveDescriptor::new("quick_attack", MoveClass::Physical, "normal", "1d6");
        quick_attack.name = Some("Quick Attack".to_string());
        quick_attack.priority = 1;
        db.insert(quick_attack);

        let mut double_kick = MoveDescriptor::new("double_kick", MoveClass::Physical, "fighting", "1d6");
        double_kick.name = Some("Double Kick".to_string());
        double_kick.multi_hit = Some(MultiHit { min: 2, max: 2 });
        db.insert(double_kick);

        let mut giga_drain = MoveDescriptor::new("giga_drain", MoveClass::Special, "grass", "3d6");
        giga_drain.name = Some("Giga Drain".to_string());
        giga_drain.drain = 50.0;
        giga_drain.uses = MoveUses::limited(10);
        db.insert(giga_drain);

        let mut growl = MoveDescriptor::new("growl", MoveClass::Status, "normal", "");
        growl.name = Some("Growl".to_string());
        db.insert(growl);
        db
    }

    pub fn insert(&mut self, descriptor: MoveDescriptor) {
        self.moves.insert(descriptor.id.clone(), descriptor);
    }

    pub fn get(&self, move_id: &str) -> Option<&MoveDescriptor> {
        self.moves.get(move_id)
    }

    pub fn require(&self, move_id: &str) -> Result<&MoveDescriptor> {
        self.get(move_id)
            .ok_or_else(|| EngineError::UnknownMove(move_id.to_string()))
    }

    pub fn as_map(&self) -> &HashMap<String, MoveDescriptor> {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Move ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.moves.keys().map(|k| k.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Accepts either a map keyed by move id or a list of moves.
    pub fn load_from_yaml_str(yaml: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let mut db = Self::new();
        if value.is_mapping() {
            let map: HashMap<String, MoveDescriptor> = serde_yaml::from_value(value)?;
            for (key, mut descriptor) in map {
                if descriptor.id.is_empty() {
                    descriptor.id = key;
                }
                descriptor.validate()?;
                db.insert(descriptor);
            }
        } else {
            let list: Vec<MoveDescriptor> = serde_yaml::from_value(value)?;
            for descriptor in list {
                descriptor.validate()?;
                db.insert(descriptor);
            }
        }
        Ok(db)
    }

    pub fn load_from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::load_from_yaml_str(&content)
    }
}
