use crate::core::battle::{IterationRecord, IterationStatus, Side};
use crate::core::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One CSV row per iteration.
#[derive(Debug, Serialize)]
struct IterationRow<'a> {
    index: u32,
    seed: u64,
    status: &'a str,
    fault: &'a str,
    winner: &'a str,
    duration: u32,
    a_attacks: u32,
    a_hits: u32,
    a_misses: u32,
    a_crits: u32,
    a_damage_dealt: i64,
    a_damage_taken: i64,
    a_swaps: u32,
    b_attacks: u32,
    b_hits: u32,
    b_misses: u32,
    b_crits: u32,
    b_damage_dealt: i64,
    b_damage_taken: i64,
    b_swaps: u32,
}

impl<'a> IterationRow<'a> {
    fn from_record(record: &'a IterationRecord, team_a: &'a str, team_b: &'a str) -> Self {
        let (status, fault) = match &record.status {
            IterationStatus::Completed => ("completed", ""),
            IterationStatus::Exceeded => ("exceeded", ""),
            IterationStatus::Faulted(reason) => ("faulted", reason.as_str()),
        };
        let winner = match record.winner {
            Some(Side::A) => team_a,
            Some(Side::B) => team_b,
            None => "",
        };
        let a = &record.team_a;
        let b = &record.team_b;
        Self {
            index: record.index,
            seed: record.seed,
            status,
            fault,
            winner,
            duration: record.duration,
            a_attacks: a.attacks,
            a_hits: a.hits,
            a_misses: a.misses,
            a_crits: a.crits,
            a_damage_dealt: a.damage_dealt,
            a_damage_taken: a.damage_taken,
            a_swaps: a.swaps,
            b_attacks: b.attacks,
            b_hits: b.hits,
            b_misses: b.misses,
            b_crits: b.crits,
            b_damage_dealt: b.damage_dealt,
            b_damage_taken: b.damage_taken,
            b_swaps: b.swaps,
        }
    }
}

pub fn write_records<W: Write>(writer: W, records: &[IterationRecord], team_a: &str, team_b: &str) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(IterationRow::from_record(record, team_a, team_b))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_records_to_path(path: &Path, records: &[IterationRecord], team_a: &str, team_b: &str) -> Result<()> {
    let file = File::create(path)?;
    write_records(file, records, team_a, team_b)
}
