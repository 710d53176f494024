use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::factory::{creature_from_species, CreateCreatureOptions};
use crate::core::state::CreatureSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Raw base stats on the usual 1-255 scale.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: i32,
    pub atk: i32,
    pub def: i32,
    pub spa: i32,
    pub spd: i32,
    pub spe: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeciesData {
    pub id: String,
    pub name: String,
    #[serde(default, alias = "type")]
    pub types: Vec<String>,
    #[serde(rename = "baseStats")]
    pub base_stats: BaseStats,
    #[serde(default)]
    pub moves: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct SpeciesDatabase {
    species: HashMap<String, SpeciesData>,
}

impl SpeciesDatabase {
    pub fn new() -> Self {
        Self {
            species: HashMap::new(),
        }
    }

    pub fn insert(&mut self, data: SpeciesData) {
        self.species.insert(data.id.clone(), data);
    }

    pub fn get(&self, species_id: &str) -> Option<&SpeciesData> {
        self.species.get(species_id)
    }

    pub fn load_from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let value = match value.get("species") {
            Some(inner) => inner.clone(),
            None => value,
        };
        let mut db = Self::new();
        if value.is_array() {
            let list: Vec<SpeciesData> = serde_json::from_value(value)?;
            for data in list {
                db.insert(data);
            }
        } else {
            let map: HashMap<String, SpeciesData> = serde_json::from_value(value)?;
            for (_, data) in map {
                db.insert(data);
            }
        }
        Ok(db)
    }
}

/// A roster entry is either a ready snapshot or raw species numbers that
/// still need converting.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RosterEntry {
    Snapshot(Box<CreatureSnapshot>),
    Species(SpeciesData),
}

/// An ordered, named list of creatures loaded from JSON.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub creatures: Vec<RosterEntry>,
}

impl Roster {
    /// Accepts `{"name": .., "creatures": [..]}` or a bare list.
    pub fn load_from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let roster = if value.is_array() {
            Roster {
                name: String::new(),
                creatures: serde_json::from_value(value)?,
            }
        } else {
            serde_json::from_value(value)?
        };
        if roster.creatures.is_empty() {
            return Err(EngineError::Input("roster has no creatures".to_string()));
        }
        Ok(roster)
    }

    pub fn load_from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut roster = Self::load_from_json_str(&content)?;
        if roster.name.is_empty() {
            roster.name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("team")
                .to_string();
        }
        Ok(roster)
    }

    /// Materialises every entry as a validated snapshot.
    pub fn snapshots(&self, config: &EngineConfig) -> Result<Vec<CreatureSnapshot>> {
        self.creatures
            .iter()
            .map(|entry| {
                let snapshot = match entry {
                    RosterEntry::Snapshot(snapshot) => snapshot.as_ref().clone(),
                    RosterEntry::Species(species) => creature_from_species(
                        species,
                        CreateCreatureOptions {
                            id: Some(species.id.clone()),
                            ..CreateCreatureOptions::default()
                        },
                        config,
                    ),
                };
                snapshot.validate()?;
                Ok(snapshot)
            })
            .collect()
    }
}
