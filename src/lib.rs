pub mod ai;
pub mod core;
pub mod data;

pub use ai::{choose_replacement, evaluate_matchup, should_swap, team_swap_pressure, MatchupReport, MoveSummary};
pub use core::{
    battle::{simulate, Combatant, IterationRecord, IterationStatus, Side, SideStats, SimulationSummary, Team},
    config::{AccuracyBand, EngineConfig, ResolutionMode, StabBonus, StabConfig},
    dice::{DiceExpression, DiceGroup, DiceOutcome},
    error::{EngineError, Result},
    events::apply_outcome,
    replay::replay_iteration,
    resolver::{resolve_move, resolve_move_seeded, ResolutionOutcome, ResolveContext},
    state::{AilmentKind, CreatureSnapshot, HitPoints, StatBlock, StatKind, Stats},
};
pub use data::{
    moves::{MoveClass, MoveDatabase, MoveDescriptor},
    species::{Roster, SpeciesData, SpeciesDatabase},
    type_chart::{Effectiveness, TypeChart},
};
