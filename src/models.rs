use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::time::ElapsedTime;
use crate::NOT_AVAILABLE;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawResultRow {
    pub rank: u32,
    pub name: String,
    pub date: String,
    pub speed: String,
    pub heart_rate: String,
    pub power: String,
    pub raw_time: String,
}

/// Placeholder records for a missed segment carry only a rank.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonSegmentRecord {
    pub rank: u32,
    pub date: Option<String>,
    pub heart_rate: Option<String>,
    pub power: Option<String>,
    pub speed: Option<String>,
    pub time: Option<ElapsedTime>,
}

impl PersonSegmentRecord {
    pub fn from_row(row: RawResultRow, time: Option<ElapsedTime>) -> Self {
        PersonSegmentRecord {
            rank: row.rank,
            date: Some(row.date),
            heart_rate: Some(row.heart_rate),
            power: Some(row.power),
            speed: Some(row.speed),
            time,
        }
    }

    pub fn placeholder(rank: u32) -> Self {
        PersonSegmentRecord {
            rank,
            date: None,
            heart_rate: None,
            power: None,
            speed: None,
            time: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.date.is_none() && self.time.is_none()
    }
}

pub type SegmentEntries = BTreeMap<String, PersonSegmentRecord>;

/// Segments iterate in name order, which is also the column order of the
/// standings table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentResults {
    segments: BTreeMap<String, SegmentEntries>,
}

impl SegmentResults {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, name: &str) -> Option<&SegmentEntries> {
        self.segments.get(name)
    }

    pub fn segment_names(&self) -> impl Iterator<Item = &str> {
        self.segments.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SegmentEntries)> {
        self.segments
            .iter()
            .map(|(name, entries)| (name.as_str(), entries))
    }

    pub fn participants(&self) -> Roster {
        self.segments
            .values()
            .flat_map(|entries| entries.keys().cloned())
            .collect()
    }

    pub(crate) fn insert_placeholder(&mut self, segment: &str, person: String, rank: u32) {
        if let Some(entries) = self.segments.get_mut(segment) {
            entries.insert(person, PersonSegmentRecord::placeholder(rank));
        }
    }
}

impl From<BTreeMap<String, SegmentEntries>> for SegmentResults {
    fn from(segments: BTreeMap<String, SegmentEntries>) -> Self {
        SegmentResults { segments }
    }
}

pub type Roster = BTreeSet<String>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSplit {
    pub time: Option<ElapsedTime>,
    pub rank: u32,
}

impl SegmentSplit {
    pub fn time_label(&self) -> String {
        self.time
            .map(|time| time.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn time_seconds(&self) -> Option<u64> {
        self.time.map(ElapsedTime::as_secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonAggregate {
    pub per_segment: BTreeMap<String, SegmentSplit>,
    pub total_time: ElapsedTime,
    pub rank_avg: f64,
}
