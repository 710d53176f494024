use crate::core::resolver::ResolutionOutcome;
use crate::core::state::{AilmentKind, CreatureSnapshot};
use crate::data::moves::MoveDescriptor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Participant {
    Attacker,
    Defender,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CombatEvent {
    Damage {
        target: Participant,
        amount: i32,
    },
    Heal {
        target: Participant,
        amount: i32,
    },
    ApplyAilment {
        target: Participant,
        ailment: AilmentKind,
    },
    ConsumeUse {
        target: Participant,
        move_id: String,
        starting: i32,
    },
}

impl CombatEvent {
    pub fn target(&self) -> Participant {
        match self {
            CombatEvent::Damage { target, .. }
            | CombatEvent::Heal { target, .. }
            | CombatEvent::ApplyAilment { target, .. }
            | CombatEvent::ConsumeUse { target, .. } => *target,
        }
    }
}

/// Expands an outcome into the state changes it implies, in application order.
pub fn outcome_events(descriptor: &MoveDescriptor, outcome: &ResolutionOutcome) -> Vec<CombatEvent> {
    let mut events = Vec::new();
    if descriptor.uses.is_limited() {
        events.push(CombatEvent::ConsumeUse {
            target: Participant::Attacker,
            move_id: descriptor.id.clone(),
            starting: descriptor.uses.value,
        });
    }
    if outcome.damage_dealt > 0 {
        events.push(CombatEvent::Damage {
            target: Participant::Defender,
            amount: outcome.damage_dealt,
        });
    }
    if let Some(ailment) = outcome.ailment_applied {
        events.push(CombatEvent::ApplyAilment {
            target: Participant::Defender,
            ailment,
        });
    }
    if outcome.flinched {
        events.push(CombatEvent::ApplyAilment {
            target: Participant::Defender,
            ailment: AilmentKind::Flinch,
        });
    }
    if outcome.drain_healed > 0 {
        events.push(CombatEvent::Heal {
            target: Participant::Attacker,
            amount: outcome.drain_healed,
        });
    }
    events
}

pub fn apply_event(creature: &CreatureSnapshot, event: &CombatEvent) -> CreatureSnapshot {
    let mut next = creature.clone();
    match event {
        CombatEvent::Damage { amount, .. } => {
            next.set_hp(next.hp.current - (*amount).max(0));
        }
        CombatEvent::Heal { amount, .. } => {
            next.set_hp(next.hp.current + (*amount).max(0));
        }
        CombatEvent::ApplyAilment { ailment, .. } => {
            next.statuses.insert(*ailment);
        }
        CombatEvent::ConsumeUse { move_id, starting, .. } => {
            let remaining = next.move_uses.entry(move_id.clone()).or_insert(*starting);
            *remaining = (*remaining - 1).max(0);
        }
    }
    next
}

/// Produces the post-move snapshots. The inputs are left untouched.
pub fn apply_outcome(
    attacker: &CreatureSnapshot,
    defender: &CreatureSnapshot,
    descriptor: &MoveDescriptor,
    outcome: &ResolutionOutcome,
) -> (CreatureSnapshot, CreatureSnapshot) {
    let mut next_attacker = attacker.clone();
    let mut next_defender = defender.clone();
    for event in outcome_events(descriptor, outcome) {
        match event.target() {
            Participant::Attacker => next_attacker = apply_event(&next_attacker, &event),
            Participant::Defender => next_defender = apply_event(&next_defender, &event),
        }
    }
    (next_attacker, next_defender)
}
