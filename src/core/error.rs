//! Error types surfaced by move resolution and the battle simulator.

/// Errors surfaced while resolving moves or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Missing or malformed creature/move data.
    #[error("invalid input: {0}")]
    Input(String),

    #[error("unknown move '{0}'")]
    UnknownMove(String),

    #[error("unknown binding '@{0}' in dice formula")]
    UnknownBinding(String),

    #[error("could not parse dice formula '{formula}': {reason}")]
    Parse { formula: String, reason: String },

    /// The move has a use limit and no uses left. Nothing was changed.
    #[error("move '{move_id}' has no uses remaining")]
    NoUsesRemaining { move_id: String },

    /// Whole-run configuration problems (zero iterations, empty team, ...).
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl EngineError {
    pub fn parse(formula: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            formula: formula.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the caller-contract violations grouped as input errors.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Input(_) | Self::UnknownMove(_) | Self::UnknownBinding(_) | Self::Parse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
