use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

use crate::error::TallyError;
use crate::models::{PersonSegmentRecord, RawResultRow, SegmentEntries, SegmentResults};
use crate::time::{normalize, to_seconds, ElapsedTime};

/// Columns read from each export row; anything after these is ignored.
const FIELD_COUNT: usize = 7;

const HEADER_RANK: &str = "Rank";

#[derive(Debug, Clone, Default)]
pub struct Club {
    members: HashSet<String>,
}

impl Club {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Couldn't find {}", path.display()))?;
        Ok(Self::from_lines(&text))
    }

    pub fn from_lines(text: &str) -> Self {
        let members = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Club { members }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub accepted: usize,
    pub headers: usize,
    pub malformed: usize,
    pub outside_club: usize,
    pub duplicates: usize,
    pub unrecognised_times: usize,
}

pub fn segment_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn read_rows<R: Read>(
    reader: R,
    delimiter: u8,
    club: &Club,
    summary: &mut IngestSummary,
) -> anyhow::Result<Vec<RawResultRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter)
        .from_reader(reader);

    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;

        if record.get(0) == Some(HEADER_RANK) {
            summary.headers += 1;
            continue;
        }

        let Some(row) = parse_row(&record) else {
            warn!(row = ?record, "couldn't process row");
            summary.malformed += 1;
            continue;
        };

        if !club.contains(&row.name) {
            info!(name = %row.name, "skipping, not in club");
            summary.outside_club += 1;
            continue;
        }

        rows.push(row);
    }

    Ok(rows)
}

fn parse_row(record: &StringRecord) -> Option<RawResultRow> {
    if record.len() < FIELD_COUNT {
        return None;
    }
    let fields: StringRecord = record.iter().take(FIELD_COUNT).collect();
    fields
        .deserialize::<RawResultRow>(None)
        .ok()
        .filter(|row| row.rank > 0)
}

/// Segments without any rows are left out. When a person appears twice in one
/// segment, the better rank is kept.
pub fn build_results<I>(
    segments: I,
    summary: &mut IngestSummary,
) -> Result<SegmentResults, TallyError>
where
    I: IntoIterator<Item = (String, Vec<RawResultRow>)>,
{
    let mut results: BTreeMap<String, SegmentEntries> = BTreeMap::new();

    for (segment, rows) in segments {
        if rows.is_empty() {
            warn!(%segment, "no club results, segment ignored");
            continue;
        }

        let entries = results.entry(segment.clone()).or_default();

        for row in rows {
            let time = to_seconds(&normalize(&row.raw_time))?.map(ElapsedTime::from_secs);
            if time.is_none() {
                warn!(%segment, name = %row.name, raw_time = %row.raw_time, "unrecognised time");
                summary.unrecognised_times += 1;
            }

            match entries.entry(row.name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(PersonSegmentRecord::from_row(row, time));
                    summary.accepted += 1;
                }
                Entry::Occupied(mut slot) => {
                    warn!(%segment, name = %row.name, "duplicate result");
                    summary.duplicates += 1;
                    if row.rank < slot.get().rank {
                        slot.insert(PersonSegmentRecord::from_row(row, time));
                    }
                }
            }
        }
    }

    Ok(SegmentResults::from(results))
}

pub fn load_segments(
    paths: &[PathBuf],
    delimiter: u8,
    club: &Club,
) -> anyhow::Result<(SegmentResults, IngestSummary)> {
    let mut summary = IngestSummary::default();
    let mut segments = Vec::with_capacity(paths.len());

    for path in paths {
        let file = File::open(path).with_context(|| format!("Couldn't find {}", path.display()))?;
        let rows = read_rows(file, delimiter, club, &mut summary)
            .with_context(|| format!("failed to read {}", path.display()))?;

        let segment = segment_name(path);
        debug!(%segment, rows = rows.len(), "read segment export");
        segments.push((segment, rows));
    }

    let results = build_results(segments, &mut summary)?;
    Ok((results, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const EXPORT: &str = "\
Rank,Name,Date,Speed,HR,Power,Time
1,Avery Lee,\"Jun 3, 2015\",21.3mi/h,162bpm,301W,10:52
2,Jules Moreno,\"Jun 1, 2015\",20.9mi/h,-,280W,1:02:03
3,Kiara Patel,\"May 30, 2015\",19.4mi/h,158bpm,-,42s
4,Visitor,\"May 29, 2015\",19.0mi/h,-,-,11:40
";

    fn club() -> Club {
        Club::from_lines("Avery Lee\n  Jules Moreno \n\nKiara Patel\n")
    }

    fn row(rank: u32, name: &str, raw_time: &str) -> RawResultRow {
        RawResultRow {
            rank,
            name: name.to_string(),
            date: "Jun 3, 2015".to_string(),
            speed: "20.0mi/h".to_string(),
            heart_rate: "-".to_string(),
            power: "-".to_string(),
            raw_time: raw_time.to_string(),
        }
    }

    #[test]
    fn club_list_ignores_blank_lines_and_padding() {
        let club = club();
        assert_eq!(club.len(), 3);
        assert!(club.contains("Jules Moreno"));
        assert!(!club.contains("Visitor"));
    }

    #[test]
    fn reads_club_rows_and_skips_header_and_visitors() {
        let mut summary = IngestSummary::default();
        let rows = read_rows(EXPORT.as_bytes(), b',', &club(), &mut summary).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "Avery Lee");
        assert_eq!(rows[0].date, "Jun 3, 2015");
        assert_eq!(rows[1].raw_time, "1:02:03");
        assert_eq!(summary.headers, 1);
        assert_eq!(summary.outside_club, 1);
        assert_eq!(summary.malformed, 0);
    }

    #[test]
    fn short_and_unranked_rows_are_malformed() {
        let export = "1,Avery Lee,Jun 3\nx,Jules Moreno,d,s,h,p,10:00\n0,Kiara Patel,d,s,h,p,10:00\n";
        let mut summary = IngestSummary::default();
        let rows = read_rows(export.as_bytes(), b',', &club(), &mut summary).unwrap();

        assert!(rows.is_empty());
        assert_eq!(summary.malformed, 3);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let export = "1;Avery Lee;d;s;h;p;10:52;kudos;extra\n";
        let mut summary = IngestSummary::default();
        let rows = read_rows(export.as_bytes(), b';', &club(), &mut summary).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].raw_time, "10:52");
    }

    #[test]
    fn segment_name_drops_directory_and_extension() {
        assert_eq!(segment_name(Path::new("data/hill climb.csv")), "hill climb");
        assert_eq!(segment_name(Path::new("sprint")), "sprint");
    }

    #[test]
    fn builds_normalized_results_per_segment() {
        let mut summary = IngestSummary::default();
        let results = build_results(
            vec![
                ("hill".to_string(), vec![row(1, "A", "10:52"), row(2, "B", "later")]),
                ("empty".to_string(), Vec::new()),
            ],
            &mut summary,
        )
        .unwrap();

        assert_eq!(results.segment_names().collect::<Vec<_>>(), vec!["hill"]);
        let hill = results.segment("hill").unwrap();
        assert_eq!(hill["A"].time.map(ElapsedTime::as_secs), Some(652));
        assert_eq!(hill["A"].date.as_deref(), Some("Jun 3, 2015"));
        assert_eq!(hill["B"].time, None);
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.unrecognised_times, 1);
    }

    #[test]
    fn duplicate_person_keeps_better_rank() {
        let mut summary = IngestSummary::default();
        let results = build_results(
            vec![
                ("hill".to_string(), vec![row(4, "A", "12:00")]),
                ("hill".to_string(), vec![row(2, "A", "11:00"), row(5, "B", "13:00")]),
            ],
            &mut summary,
        )
        .unwrap();

        let hill = results.segment("hill").unwrap();
        assert_eq!(hill["A"].rank, 2);
        assert_eq!(hill.len(), 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(results.participants().len(), 2);
    }

    #[test]
    fn missing_club_list_is_reported() {
        let err = Club::load(Path::new("no/such/club.txt")).unwrap_err();
        assert!(err.to_string().contains("Couldn't find"));
    }

    #[test]
    fn oversized_time_is_recorded_as_missing() {
        let mut summary = IngestSummary::default();
        let mut results = build_results(
            vec![
                ("long".to_string(), vec![row(1, "A", "18446744073709551615s")]),
                ("short".to_string(), vec![row(1, "A", "10s")]),
            ],
            &mut summary,
        )
        .unwrap();

        assert_eq!(results.segment("long").unwrap()["A"].time, None);
        assert_eq!(summary.unrecognised_times, 1);

        let roster = results.participants();
        let standings = crate::standings::aggregate(&mut results, &roster).unwrap();
        assert_eq!(standings["A"].total_time.to_string(), "0:00:10");
        assert_eq!(standings["A"].rank_avg, 1.0);
    }

    #[test]
    fn exports_on_disk_become_a_standings_table() {
        let dir = tempdir().unwrap();
        let hill = dir.path().join("hill.csv");
        let sprint = dir.path().join("sprint.csv");
        let club_path = dir.path().join("club.txt");
        fs::write(&hill, EXPORT).unwrap();
        let sprint_export = "Rank,Name,Date,Speed,HR,Power,Time\n1,Kiara Patel,d,s,h,p,58s\n";
        fs::write(&sprint, sprint_export).unwrap();
        fs::write(&club_path, "Avery Lee\nJules Moreno\nKiara Patel\n").unwrap();

        let club = Club::load(&club_path).unwrap();
        let (mut results, summary) = load_segments(&[sprint, hill], b',', &club).unwrap();
        assert_eq!(summary.accepted, 4);
        assert_eq!(summary.headers, 2);
        assert_eq!(summary.outside_club, 1);

        let roster = results.participants();
        let standings = crate::standings::aggregate(&mut results, &roster).unwrap();
        let names: Vec<String> = results.segment_names().map(str::to_string).collect();
        let table = crate::report::build_table(&names, &standings, true).unwrap();

        assert_eq!(
            table,
            "Name#hill#sprint#Total Time#Rank Avg\n\
             Avery Lee#0:10:52#N/A#0:10:52#1.50\n\
             Jules Moreno#1:02:03#N/A#1:02:03#2.00\n\
             Kiara Patel#0:00:42#0:00:58#0:01:40#2.00\n"
        );
    }

    #[test]
    fn missing_files_are_reported() {
        let err = load_segments(&[PathBuf::from("no/such/segment.csv")], b',', &club())
            .unwrap_err();
        assert!(err.to_string().contains("Couldn't find"));
    }
}
