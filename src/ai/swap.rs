//! Decides when the side facing `attacker` should pull its creature.
//!
//! Reports are read from the creature at risk: `attacker_report` is the
//! opponent against it, `defender_report` is it against the opponent.

use crate::ai::matchup::{evaluate_matchup, MatchupReport};
use crate::core::resolver::ResolveContext;
use crate::core::state::CreatureSnapshot;

pub fn should_swap(attacker_report: &MatchupReport, defender_report: &MatchupReport) -> bool {
    if attacker_report.defender_fainted {
        return true;
    }
    let mut swap = false;
    if attacker_report.kos_within(2) && attacker_report.goes_first {
        swap = true;
    }
    if attacker_report.kos_within(1) {
        swap = true;
    }
    if defender_report.turns_to_ko >= attacker_report.turns_to_ko {
        swap = true;
    }
    if defender_report.turns_to_ko >= 5 {
        swap = true;
    }
    // A guaranteed first-strike KO keeps the creature in.
    if defender_report.kos_within(1) && defender_report.goes_first {
        swap = false;
    }
    swap
}

/// Team-level pressure check: the opponent has a move at stage +2 or better,
/// or outspeeds and KOs in one. Cancelled when our creature outspeeds and
/// KOs in one itself.
pub fn team_swap_pressure(attacker_report: &MatchupReport, defender_report: &MatchupReport) -> bool {
    if attacker_report.defender_fainted {
        return true;
    }
    let mut swap = attacker_report
        .moves
        .iter()
        .filter(|m| m.expected_damage.is_some())
        .any(|m| !m.effectiveness.immune && m.effectiveness.stage >= 2);
    if attacker_report.goes_first && attacker_report.kos_within(1) {
        swap = true;
    }
    if defender_report.goes_first && defender_report.kos_within(1) {
        swap = false;
    }
    swap
}

/// Healthy team member (other than `active`) that KOs `opponent` fastest.
/// Ties go to the earlier slot.
pub fn choose_replacement(
    team: &[CreatureSnapshot],
    active: usize,
    opponent: &CreatureSnapshot,
    ctx: &ResolveContext<'_>,
) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, candidate) in team.iter().enumerate() {
        if index == active || candidate.is_fainted() {
            continue;
        }
        let turns = evaluate_matchup(candidate, opponent, ctx).turns_to_ko;
        match best {
            Some((_, best_turns)) if turns >= best_turns => {}
            _ => best = Some((index, turns)),
        }
    }
    best.map(|(index, _)| index)
}
