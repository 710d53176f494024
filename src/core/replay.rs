use crate::core::battle::{run_iteration, IterationRecord, Team};
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::resolver::ResolveContext;
use crate::data::moves::MoveDatabase;
use crate::data::type_chart::TypeChart;

/// Re-runs iteration `index` of a simulation. The seed is derived the same
/// way, so the record matches the one produced by `simulate`.
pub fn replay_iteration(
    team_a: &Team,
    team_b: &Team,
    moves: &MoveDatabase,
    chart: &TypeChart,
    config: &EngineConfig,
    index: u32,
) -> Result<IterationRecord> {
    config.validate()?;
    team_a.validate()?;
    team_b.validate()?;
    let ctx = ResolveContext::new(moves, chart, config);
    Ok(run_iteration(team_a, team_b, &ctx, index))
}
