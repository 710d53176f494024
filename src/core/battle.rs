use crate::ai::matchup::evaluate_matchup;
use crate::ai::swap::{choose_replacement, should_swap};
use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::events::apply_outcome;
use crate::core::resolver::{resolve_move, ResolveContext};
use crate::core::state::{AilmentKind, CreatureSnapshot};
use crate::data::moves::MoveDatabase;
use crate::data::type_chart::TypeChart;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub creature: CreatureSnapshot,
    /// Move to use every turn. `None` picks by matchup.
    #[serde(default)]
    pub preferred_move: Option<String>,
}

impl Combatant {
    pub fn new(creature: CreatureSnapshot) -> Self {
        Self {
            creature,
            preferred_move: None,
        }
    }

    pub fn with_move(creature: CreatureSnapshot, move_id: &str) -> Self {
        Self {
            creature,
            preferred_move: Some(move_id.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub members: Vec<Combatant>,
}

impl Team {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    pub fn from_snapshots(name: &str, creatures: Vec<CreatureSnapshot>) -> Self {
        Self {
            name: name.to_string(),
            members: creatures.into_iter().map(Combatant::new).collect(),
        }
    }

    pub fn with(mut self, combatant: Combatant) -> Self {
        self.members.push(combatant);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.members.is_empty() {
            return Err(EngineError::Config(format!("team '{}' has no creatures", self.name)));
        }
        for member in &self.members {
            member.creature.validate()?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(&self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    pub attacks: u32,
    pub hits: u32,
    pub misses: u32,
    pub crits: u32,
    pub damage_dealt: i64,
    pub damage_taken: i64,
    pub swaps: u32,
}

impl SideStats {
    /// Hits per attack, 0 when nothing was attempted.
    pub fn accuracy(&self) -> f64 {
        if self.attacks == 0 {
            0.0
        } else {
            self.hits as f64 / self.attacks as f64
        }
    }

    pub fn damage_per_round(&self) -> f64 {
        if self.attacks == 0 {
            0.0
        } else {
            self.damage_dealt as f64 / self.attacks as f64
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IterationStatus {
    Completed,
    Exceeded,
    Faulted(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub index: u32,
    pub seed: u64,
    pub status: IterationStatus,
    pub winner: Option<Side>,
    pub duration: u32,
    pub team_a: SideStats,
    pub team_b: SideStats,
    pub timeline: Vec<String>,
}

impl IterationRecord {
    pub fn is_completed(&self) -> bool {
        self.status == IterationStatus::Completed
    }

    pub fn stats(&self, side: Side) -> &SideStats {
        match side {
            Side::A => &self.team_a,
            Side::B => &self.team_b,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SideSummary {
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub mean_accuracy: f64,
    pub mean_damage_per_round: f64,
    pub mean_damage_dealt: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub iterations: u32,
    pub completed: u32,
    pub exceeded: u32,
    pub faulted: u32,
    pub team_a: SideSummary,
    pub team_b: SideSummary,
    pub mean_duration: f64,
    pub median_duration: f64,
    pub duration_histogram: BTreeMap<u32, u32>,
    /// Name of the side with more wins, `None` on a tie.
    pub winner: Option<String>,
    pub longest: Option<IterationRecord>,
    #[serde(skip)]
    pub records: Vec<IterationRecord>,
}

impl SimulationSummary {
    pub fn winner_label(&self) -> &str {
        self.winner.as_deref().unwrap_or("DRAW!")
    }
}

struct SideState {
    members: Vec<Combatant>,
    active: usize,
    stats: SideStats,
}

impl SideState {
    fn new(team: &Team) -> Self {
        Self {
            members: team.members.clone(),
            active: 0,
            stats: SideStats::default(),
        }
    }

    fn active(&self) -> &CreatureSnapshot {
        &self.members[self.active].creature
    }

    fn has_healthy(&self) -> bool {
        self.members.iter().any(|m| !m.creature.is_fainted())
    }

    fn creatures(&self) -> Vec<CreatureSnapshot> {
        self.members.iter().map(|m| m.creature.clone()).collect()
    }
}

enum TurnAction {
    Switch(usize),
    Move(String),
    Idle,
}

fn side_mut<'s>(a: &'s mut SideState, b: &'s mut SideState, side: Side) -> (&'s mut SideState, &'s mut SideState) {
    match side {
        Side::A => (a, b),
        Side::B => (b, a),
    }
}

/// Preferred move if still usable, then the matchup pick, then the first
/// move with uses left.
fn choose_move(combatant: &Combatant, opponent: &CreatureSnapshot, ctx: &ResolveContext<'_>) -> Option<String> {
    let creature = &combatant.creature;
    let usable = |move_id: &str| {
        ctx.moves
            .get(move_id)
            .is_some_and(|descriptor| !descriptor.is_exhausted_for(creature))
    };
    if let Some(preferred) = combatant.preferred_move.as_deref() {
        if usable(preferred) {
            return Some(preferred.to_string());
        }
    }
    if let Some(best) = evaluate_matchup(creature, opponent, ctx).best_move {
        return Some(best);
    }
    creature.moves.iter().find(|m| usable(m.as_str())).cloned()
}

fn choose_action(own: &SideState, opponent: &CreatureSnapshot, ctx: &ResolveContext<'_>) -> TurnAction {
    let active = own.active();
    if ctx.config.swaps && own.members.len() > 1 {
        let threat = evaluate_matchup(opponent, active, ctx);
        let answer = evaluate_matchup(active, opponent, ctx);
        if should_swap(&threat, &answer) {
            let team = own.creatures();
            if let Some(candidate) = choose_replacement(&team, own.active, opponent, ctx) {
                let incoming = &team[candidate];
                let incoming_threat = evaluate_matchup(opponent, incoming, ctx);
                let incoming_answer = evaluate_matchup(incoming, opponent, ctx);
                if !should_swap(&incoming_threat, &incoming_answer) {
                    return TurnAction::Switch(candidate);
                }
            }
        }
    }
    match choose_move(&own.members[own.active], opponent, ctx) {
        Some(move_id) => TurnAction::Move(move_id),
        None => TurnAction::Idle,
    }
}

fn replace_fainted(own: &mut SideState, opponent: &CreatureSnapshot, ctx: &ResolveContext<'_>, timeline: &mut Vec<String>) {
    if !own.active().is_fainted() {
        return;
    }
    let team = own.creatures();
    if let Some(next) = choose_replacement(&team, own.active, opponent, ctx) {
        timeline.push(format!("{} is sent in to replace {}.", team[next].name, team[own.active].name));
        own.active = next;
    }
}

fn perform_move(
    attacker_side: &mut SideState,
    defender_side: &mut SideState,
    move_id: &str,
    ctx: &ResolveContext<'_>,
    rng: &mut dyn FnMut() -> f64,
    timeline: &mut Vec<String>,
) -> Result<bool> {
    let descriptor = ctx.moves.require(move_id)?;
    let attacker = attacker_side.active().clone();
    let defender = defender_side.active().clone();
    let outcome = resolve_move(&attacker, &defender, descriptor, ctx, rng)?;
    let (next_attacker, next_defender) = apply_outcome(&attacker, &defender, descriptor, &outcome);

    let a = attacker_side.active;
    let d = defender_side.active;
    attacker_side.members[a].creature = next_attacker;
    defender_side.members[d].creature = next_defender;

    attacker_side.stats.attacks += 1;
    if outcome.hit {
        attacker_side.stats.hits += 1;
        if outcome.critical {
            attacker_side.stats.crits += 1;
        }
    } else {
        attacker_side.stats.misses += 1;
    }
    attacker_side.stats.damage_dealt += outcome.damage_dealt as i64;
    defender_side.stats.damage_taken += outcome.damage_dealt as i64;
    timeline.extend(outcome.log);
    Ok(outcome.flinched)
}

fn move_priority(action: &TurnAction, ctx: &ResolveContext<'_>) -> i32 {
    match action {
        TurnAction::Move(move_id) => ctx.moves.get(move_id).map(|m| m.priority).unwrap_or(0),
        _ => 0,
    }
}

fn play_iteration(
    team_a: &Team,
    team_b: &Team,
    ctx: &ResolveContext<'_>,
    rng: &mut dyn FnMut() -> f64,
    record: &mut IterationRecord,
) -> Result<()> {
    let mut a = SideState::new(team_a);
    let mut b = SideState::new(team_b);
    let mut timeline = Vec::new();
    let mut turn = 0u32;

    let result = loop {
        if !a.has_healthy() {
            break Some(Side::B);
        }
        if !b.has_healthy() {
            break Some(Side::A);
        }
        if turn >= ctx.config.turn_cap {
            break None;
        }
        turn += 1;
        timeline.push(format!("--- Turn {} ---", turn));

        let b_active = b.active().clone();
        replace_fainted(&mut a, &b_active, ctx, &mut timeline);
        let a_active = a.active().clone();
        replace_fainted(&mut b, &a_active, ctx, &mut timeline);

        let mut actions = [
            (Side::A, choose_action(&a, b.active(), ctx)),
            (Side::B, choose_action(&b, a.active(), ctx)),
        ];

        for (side, action) in actions.iter_mut() {
            if let TurnAction::Switch(next) = action {
                let (own, _) = side_mut(&mut a, &mut b, *side);
                timeline.push(format!(
                    "{} switches {} out for {}.",
                    if *side == Side::A { &team_a.name } else { &team_b.name },
                    own.active().name,
                    own.members[*next].creature.name
                ));
                own.active = *next;
                own.stats.swaps += 1;
                *action = TurnAction::Idle;
            }
        }

        let (a_priority, b_priority) = if ctx.config.priority_order {
            (move_priority(&actions[0].1, ctx), move_priority(&actions[1].1, ctx))
        } else {
            (0, 0)
        };
        let a_first = a_priority > b_priority || (a_priority == b_priority && a.active().speed() >= b.active().speed());
        let order = if a_first { [0, 1] } else { [1, 0] };

        let mut flinched = false;
        for (position, slot) in order.into_iter().enumerate() {
            let (side, action) = &actions[slot];
            let TurnAction::Move(move_id) = action else {
                continue;
            };
            let (own, opponent) = side_mut(&mut a, &mut b, *side);
            if own.active().is_fainted() || opponent.active().is_fainted() {
                break;
            }
            if position == 1 && flinched {
                timeline.push(format!("{} flinched and couldn't move!", own.active().name));
                continue;
            }
            flinched = perform_move(own, opponent, move_id, ctx, rng, &mut timeline)?;
            if opponent.active().is_fainted() {
                timeline.push(format!("{} fainted!", opponent.active().name));
                break;
            }
        }

        for side in [&mut a, &mut b] {
            let idx = side.active;
            side.members[idx].creature.statuses.remove(&AilmentKind::Flinch);
        }
    };

    record.duration = turn;
    record.winner = result;
    record.status = if result.is_some() {
        IterationStatus::Completed
    } else {
        IterationStatus::Exceeded
    };
    record.team_a = a.stats;
    record.team_b = b.stats;
    record.timeline = timeline;
    debug!(index = record.index, turns = turn, winner = ?result, "iteration finished");
    Ok(())
}

pub fn run_iteration(team_a: &Team, team_b: &Team, ctx: &ResolveContext<'_>, index: u32) -> IterationRecord {
    let seed = ctx.config.seed.wrapping_add(index as u64);
    let mut chacha = ChaCha8Rng::seed_from_u64(seed);
    let mut rng = || chacha.gen::<f64>();
    let mut record = IterationRecord {
        index,
        seed,
        status: IterationStatus::Exceeded,
        winner: None,
        duration: 0,
        team_a: SideStats::default(),
        team_b: SideStats::default(),
        timeline: Vec::new(),
    };
    if let Err(err) = play_iteration(team_a, team_b, ctx, &mut rng, &mut record) {
        warn!(index, error = %err, "iteration faulted");
        record.status = IterationStatus::Faulted(err.to_string());
        record.winner = None;
    }
    record
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn median(mut values: Vec<u32>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) as f64 / 2.0
    } else {
        values[mid] as f64
    }
}

fn side_summary(name: &str, side: Side, completed: &[&IterationRecord]) -> SideSummary {
    let wins = completed.iter().filter(|r| r.winner == Some(side)).count() as u32;
    let losses = completed.iter().filter(|r| r.winner == Some(side.other())).count() as u32;
    SideSummary {
        name: name.to_string(),
        wins,
        losses,
        mean_accuracy: mean(completed.iter().map(|r| r.stats(side).accuracy())),
        mean_damage_per_round: mean(completed.iter().map(|r| r.stats(side).damage_per_round())),
        mean_damage_dealt: mean(completed.iter().map(|r| r.stats(side).damage_dealt as f64)),
    }
}

/// Aggregates iteration records. Exceeded and faulted iterations only count
/// towards their own tallies.
pub fn summarize(team_a: &str, team_b: &str, records: Vec<IterationRecord>) -> SimulationSummary {
    let completed: Vec<&IterationRecord> = records.iter().filter(|r| r.is_completed()).collect();
    let exceeded = records
        .iter()
        .filter(|r| r.status == IterationStatus::Exceeded)
        .count() as u32;
    let faulted = records
        .iter()
        .filter(|r| matches!(r.status, IterationStatus::Faulted(_)))
        .count() as u32;

    let mut duration_histogram = BTreeMap::new();
    for record in &completed {
        *duration_histogram.entry(record.duration).or_insert(0) += 1;
    }

    let a = side_summary(team_a, Side::A, &completed);
    let b = side_summary(team_b, Side::B, &completed);
    let winner = if a.wins > b.wins {
        Some(a.name.clone())
    } else if b.wins > a.wins {
        Some(b.name.clone())
    } else {
        None
    };

    let mut longest: Option<&IterationRecord> = None;
    for record in &completed {
        if longest.map_or(true, |l| record.duration > l.duration) {
            longest = Some(record);
        }
    }

    SimulationSummary {
        iterations: records.len() as u32,
        completed: completed.len() as u32,
        exceeded,
        faulted,
        mean_duration: mean(completed.iter().map(|r| r.duration as f64)),
        median_duration: median(completed.iter().map(|r| r.duration).collect()),
        duration_histogram,
        winner,
        longest: longest.cloned(),
        team_a: a,
        team_b: b,
        records,
    }
}

pub fn simulate(
    team_a: &Team,
    team_b: &Team,
    moves: &MoveDatabase,
    chart: &TypeChart,
    config: &EngineConfig,
) -> Result<SimulationSummary> {
    config.validate()?;
    team_a.validate()?;
    team_b.validate()?;
    let ctx = ResolveContext::new(moves, chart, config);

    info!(
        iterations = config.iterations,
        team_a = %team_a.name,
        team_b = %team_b.name,
        mode = ?config.mode,
        parallel = config.parallel,
        "starting simulation"
    );

    let run_one = |index: u32| run_iteration(team_a, team_b, &ctx, index);
    let records: Vec<IterationRecord> = if config.parallel {
        (0..config.iterations).into_par_iter().map(run_one).collect()
    } else {
        (0..config.iterations).map(run_one).collect()
    };

    let summary = summarize(&team_a.name, &team_b.name, records);
    info!(
        completed = summary.completed,
        exceeded = summary.exceeded,
        faulted = summary.faulted,
        winner = summary.winner_label(),
        "simulation finished"
    );
    Ok(summary)
}
