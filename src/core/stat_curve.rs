//! Stage counters to multipliers.

pub const MIN_STAGE: i32 = -6;
pub const MAX_STAGE: i32 = 6;

pub fn clamp_stage(stage: i32) -> i32 {
    stage.clamp(MIN_STAGE, MAX_STAGE)
}

fn curve(stage: i32, base: f64) -> f64 {
    let s = clamp_stage(stage);
    if s > 0 {
        (base + s as f64) / base
    } else if s < 0 {
        base / (base - s as f64)
    } else {
        1.0
    }
}

/// General stat boost curve: +1 is x1.5, -1 is x2/3.
pub fn stage_multiplier(stage: i32) -> f64 {
    curve(stage, 2.0)
}

/// Accuracy/evasion curve, same shape with base 3.
pub fn accuracy_stage_multiplier(stage: i32) -> f64 {
    curve(stage, 3.0)
}

/// Older boost conversion still used for matchup estimates.
///
/// Positive stages give `s / 2`, negative give `2 / |s|`. Stage zero returns 1
/// before either division is reached.
pub fn legacy_boost_multiplier(stage: i32) -> f64 {
    let s = clamp_stage(stage);
    if s == 0 {
        return 1.0;
    }
    if s < 0 {
        2.0 / (-s) as f64
    } else {
        s as f64 / 2.0
    }
}

/// Chance of a critical hit for a crit stage.
///
/// 0 or lower: 1/24, 1: 1/8, 2: 1/2, 3+: always.
pub fn critical_chance(stage: i32) -> f64 {
    if stage <= 0 {
        1.0 / 24.0
    } else if stage == 1 {
        1.0 / 8.0
    } else if stage == 2 {
        1.0 / 2.0
    } else {
        1.0
    }
}
