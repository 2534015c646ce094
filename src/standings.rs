use std::collections::BTreeMap;

use tracing::debug;

use crate::error::TallyError;
use crate::models::{PersonAggregate, Roster, SegmentEntries, SegmentResults, SegmentSplit};
use crate::time::ElapsedTime;

/// Rank for anyone who missed the segment: one behind its last finisher.
pub fn placeholder_rank(entries: &SegmentEntries) -> u32 {
    entries.values().map(|record| record.rank).max().unwrap_or(0) + 1
}

/// Give every roster member missing from a segment a placeholder record.
///
/// Placeholder ranks are computed from the data as it was before this call, so
/// one segment's placeholders never raise another placeholder's rank.
pub fn backfill(results: &mut SegmentResults, roster: &Roster) {
    let mut missing = Vec::new();
    for (segment, entries) in results.iter() {
        let rank = placeholder_rank(entries);
        for person in roster.iter().filter(|person| !entries.contains_key(*person)) {
            missing.push((segment.to_string(), person.clone(), rank));
        }
    }

    for (segment, person, rank) in missing {
        debug!(%person, %segment, rank, "backfilling missed segment");
        results.insert_placeholder(&segment, person, rank);
    }
}

/// Missed segments add nothing to the total time but count at their
/// placeholder rank in the average.
pub fn aggregate(
    results: &mut SegmentResults,
    roster: &Roster,
) -> Result<BTreeMap<String, PersonAggregate>, TallyError> {
    backfill(results, roster);

    let nsegs = results.len();
    let mut standings = BTreeMap::new();

    for person in roster {
        if nsegs == 0 {
            return Err(TallyError::InvalidState(format!(
                "no segments to average for {person}"
            )));
        }

        let mut per_segment = BTreeMap::new();
        let mut total_time = ElapsedTime::from_secs(0);
        let mut rank_avg = 0.0;

        for (segment, entries) in results.iter() {
            let record = entries.get(person).ok_or_else(|| {
                TallyError::InvalidState(format!("{person} has no entry for segment {segment}"))
            })?;

            if let Some(time) = record.time {
                total_time = total_time.checked_add(time).ok_or_else(|| {
                    TallyError::InvalidState(format!("total time for {person} overflows"))
                })?;
            }
            rank_avg += f64::from(record.rank) / nsegs as f64;

            debug!(
                %person,
                %segment,
                rank = record.rank,
                total_time = %total_time,
                rank_avg,
                "accumulated segment"
            );

            per_segment.insert(
                segment.to_string(),
                SegmentSplit {
                    time: record.time,
                    rank: record.rank,
                },
            );
        }

        standings.insert(
            person.clone(),
            PersonAggregate {
                per_segment,
                total_time,
                rank_avg,
            },
        );
    }

    Ok(standings)
}
