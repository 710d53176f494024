pub mod matchup;
pub mod swap;

pub use matchup::{evaluate_matchup, MatchupReport, MoveSummary};
pub use swap::{choose_replacement, should_swap, team_swap_pressure};
