use crate::core::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How a turn is resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// d20 attack roll against a defense target.
    Tactical,
    /// Percentile accuracy roll, power plus half the attacking stat.
    #[default]
    Simulated,
}

/// Same-type bonus, either added to the formula or multiplied onto it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabBonus {
    Flat(f64),
    Multiplier(f64),
}

impl StabBonus {
    /// Wraps `formula` with the bonus.
    pub fn apply(&self, formula: &str) -> String {
        match self {
            StabBonus::Flat(value) => format!("{} + {}", formula, value),
            StabBonus::Multiplier(value) => format!("({}) * {}", formula, value),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabConfig {
    pub tactical: StabBonus,
    pub simulated: StabBonus,
    /// Factor used by matchup estimates.
    pub matchup: f64,
}

impl Default for StabConfig {
    fn default() -> Self {
        Self {
            tactical: StabBonus::Flat(4.0),
            simulated: StabBonus::Multiplier(1.5),
            matchup: 1.5,
        }
    }
}

impl StabConfig {
    pub fn for_mode(&self, mode: ResolutionMode) -> StabBonus {
        match mode {
            ResolutionMode::Tactical => self.tactical,
            ResolutionMode::Simulated => self.simulated,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccuracyBand {
    pub min: f64,
    pub max: f64,
}

impl AccuracyBand {
    pub fn clamp(&self, chance: f64) -> f64 {
        chance.clamp(self.min, self.max)
    }
}

impl Default for AccuracyBand {
    fn default() -> Self {
        Self { min: 33.0, max: 96.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: ResolutionMode,
    pub accuracy_band: AccuracyBand,
    pub turn_cap: u32,
    /// Added to the defender's stat to form the tactical hit target.
    pub base_ac: i32,
    pub health_multiplier: i32,
    pub stab: StabConfig,
    pub iterations: u32,
    pub seed: u64,
    pub parallel: bool,
    pub swaps: bool,
    /// Let move priority decide turn order before speed.
    pub priority_order: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: ResolutionMode::default(),
            accuracy_band: AccuracyBand::default(),
            turn_cap: 30,
            base_ac: 0,
            health_multiplier: 6,
            stab: StabConfig::default(),
            iterations: 100,
            seed: 0,
            parallel: false,
            swaps: false,
            priority_order: false,
        }
    }
}

impl EngineConfig {
    pub fn with_mode(mut self, mode: ResolutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(EngineError::Config("iterations must be at least 1".to_string()));
        }
        if self.turn_cap == 0 {
            return Err(EngineError::Config("turn cap must be at least 1".to_string()));
        }
        let band = self.accuracy_band;
        if !(band.min.is_finite() && band.max.is_finite()) || band.min < 0.0 || band.min > band.max {
            return Err(EngineError::Config(format!(
                "accuracy band {}..{} is not a valid range",
                band.min, band.max
            )));
        }
        if self.health_multiplier <= 0 {
            return Err(EngineError::Config("health multiplier must be positive".to_string()));
        }
        Ok(())
    }

    pub fn load_from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::load_from_yaml_str(&content)
    }
}
