use crate::core::error::Result;
use crate::core::state::{CreatureSnapshot, EffectivenessOverride};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Attack types that hit a defending type for double, half or no damage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TypeEntry {
    #[serde(default)]
    pub double: Vec<String>,
    #[serde(default)]
    pub half: Vec<String>,
    #[serde(default)]
    pub immune: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Effectiveness {
    pub stage: i32,
    pub percent: f64,
    pub immune: bool,
}

impl Effectiveness {
    pub const NEUTRAL: Effectiveness = Effectiveness {
        stage: 0,
        percent: 1.0,
        immune: false,
    };

    pub fn from_override(value: EffectivenessOverride) -> Self {
        let (stage, percent, immune) = match value {
            EffectivenessOverride::Immune => (0, 0.0, true),
            EffectivenessOverride::Quarter => (-2, 0.25, false),
            EffectivenessOverride::Half => (-1, 0.5, false),
            EffectivenessOverride::Normal => (0, 1.0, false),
            EffectivenessOverride::Double => (1, 2.0, false),
            EffectivenessOverride::Quadruple => (2, 4.0, false),
        };
        Self {
            stage,
            percent,
            immune,
        }
    }

    /// Log wording for the damage tier.
    pub fn describe(&self) -> &'static str {
        if self.immune {
            return "It had no effect.";
        }
        match self.stage {
            s if s <= -2 => "It's barely effective...",
            -1 => "It's not very effective...",
            0 => "It's a normal hit.",
            1 => "It's super effective!",
            _ => "It's extremely effective!",
        }
    }
}

impl Default for Effectiveness {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[derive(Clone, Debug)]
pub struct TypeChart {
    chart: HashMap<String, TypeEntry>,
}

impl TypeChart {
    pub fn new() -> Self {
        let mut chart = HashMap::new();
        let mut add_entry = |type_name: &str, double: &[&str], half: &[&str], immune: &[&str]| {
            chart.insert(
                type_name.to_string(),
                TypeEntry {
                    double: double.iter().map(|v| v.to_string()).collect(),
                    half: half.iter().map(|v| v.to_string()).collect(),
                    immune: immune.iter().map(|v| v.to_string()).collect(),
                },
            );
        };

        add_entry("bug", &["fire", "flying", "rock"], &["grass", "fighting", "ground"], &[]);
        add_entry("dark", &["fighting", "bug", "fairy"], &["ghost", "dark"], &["psychic"]);
        add_entry("dragon", &["ice", "dragon", "fairy"], &["fire", "water", "electric", "grass"], &[]);
        add_entry("electric", &["ground"], &["electric", "flying", "steel"], &[]);
        add_entry("fairy", &["poison", "steel"], &["fighting", "bug", "dark"], &["dragon"]);
        add_entry("fighting", &["flying", "psychic", "fairy"], &["bug", "rock", "dark"], &[]);
        add_entry("fire", &["water", "rock", "ground"], &["fire", "grass", "ice", "bug", "steel", "fairy"], &[]);
        add_entry("flying", &["electric", "ice", "rock"], &["grass", "fighting", "bug"], &["ground"]);
        add_entry("ghost", &["ghost", "dark"], &["poison", "bug"], &["normal", "fighting"]);
        add_entry("grass", &["fire", "ice", "poison", "flying", "bug"], &["water", "electric", "grass", "ground"], &[]);
        add_entry("ground", &["water", "grass", "ice"], &["poison", "rock"], &["electric"]);
        add_entry("ice", &["fire", "fighting", "rock", "steel"], &["ice"], &[]);
        add_entry("normal", &["fighting"], &[], &["ghost"]);
        add_entry("poison", &["ground", "psychic"], &["grass", "fighting", "poison", "bug", "fairy"], &[]);
        add_entry("psychic", &["bug", "ghost", "dark"], &["fighting", "psychic"], &[]);
        add_entry("rock", &["water", "grass", "fighting", "ground", "steel"], &["normal", "fire", "poison", "flying"], &[]);
        add_entry(
            "steel",
            &["fire", "fighting", "ground"],
            &["normal", "grass", "ice", "flying", "psychic", "bug", "rock", "dragon", "steel", "fairy"],
            &["poison"],
        );
        add_entry("water", &["electric", "grass"], &["fire", "water", "ice", "steel"], &[]);
        add_entry("light", &["dark", "psychic", "bug", "ghost"], &["cyber", "fire", "electric", "light"], &["ghost"]);
        add_entry("cyber", &["fairy", "fire", "water", "fighting", "steel"], &["grass", "fighting", "ghost", "fairy"], &["steel"]);
        add_entry("nuclear", &["psychic", "water", "ground"], &["nuclear", "water", "poison", "dragon"], &["fairy"]);

        Self { chart }
    }

    pub fn empty() -> Self {
        Self {
            chart: HashMap::new(),
        }
    }

    pub fn insert(&mut self, defending_type: &str, entry: TypeEntry) {
        let lower = |list: Vec<String>| -> Vec<String> { list.into_iter().map(|t| t.to_lowercase()).collect() };
        let entry = TypeEntry {
            double: lower(entry.double),
            half: lower(entry.half),
            immune: lower(entry.immune),
        };
        self.chart.insert(defending_type.to_lowercase(), entry);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.chart.contains_key(&type_name.to_lowercase())
    }

    pub fn load_from_yaml_str(yaml: &str) -> Result<Self> {
        let entries: HashMap<String, TypeEntry> = serde_yaml::from_str(yaml)?;
        let mut chart = Self::empty();
        for (type_name, entry) in entries {
            chart.insert(&type_name, entry);
        }
        Ok(chart)
    }

    pub fn load_from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::load_from_yaml_str(&content)
    }

    /// Table lookup for an attack type against one or two defending types.
    ///
    /// Each defending type is evaluated independently and the results
    /// compound. Defending types missing from the table are skipped and an
    /// attack type no entry lists is neutral. The stage is
    /// clamped to +-2; the percent is left as accumulated.
    pub fn effectiveness(&self, attack_type: &str, defender_types: &[String]) -> Effectiveness {
        let mut result = Effectiveness::NEUTRAL;
        let attack_key = attack_type.to_lowercase();
        if attack_key.is_empty() {
            return result;
        }
        for defender in defender_types {
            let Some(entry) = self.chart.get(&defender.to_lowercase()) else {
                continue;
            };
            if entry.double.iter().any(|t| *t == attack_key) {
                result.stage += 1;
                result.percent *= 2.0;
            }
            if entry.half.iter().any(|t| *t == attack_key) {
                result.stage -= 1;
                result.percent /= 2.0;
            }
            if entry.immune.iter().any(|t| *t == attack_key) {
                result.immune = true;
            }
        }
        result.stage = result.stage.clamp(-2, 2);
        result
    }

    /// Like [`TypeChart::effectiveness`] but honours the defender's
    /// per-type override first.
    pub fn resolve(&self, attack_type: &str, defender: &CreatureSnapshot) -> Effectiveness {
        match defender.override_for(attack_type) {
            Some(value) => Effectiveness::from_override(value),
            None => self.effectiveness(attack_type, &defender.types),
        }
    }
}

impl Default for TypeChart {
    fn default() -> Self {
        Self::new()
    }
}
