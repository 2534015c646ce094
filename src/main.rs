use std::io;
use std::path::PathBuf;

use anyhow::{ensure, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use segment_standings::ingest::{self, Club};
use segment_standings::{report, standings};

#[derive(Parser)]
#[command(name = "segment-standings")]
#[command(about = "Combine club members' segment leaderboards into overall standings", long_about = None)]
struct Cli {
    /// Text file listing club members, one name per line
    club: PathBuf,

    /// Segment leaderboard exports; each file name becomes a column
    #[arg(required = true)]
    segment_csv: Vec<PathBuf>,

    /// Field delimiter used in the segment exports
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    /// Add a rank-average column to the table
    #[arg(short, long)]
    score: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    ensure!(
        cli.delimiter.is_ascii(),
        "delimiter must be a single ASCII character, got {:?}",
        cli.delimiter
    );
    let delimiter = cli.delimiter as u8;

    let club = Club::load(&cli.club)?;
    info!(members = club.len(), "loaded club list");

    let (mut results, summary) = ingest::load_segments(&cli.segment_csv, delimiter, &club)?;
    info!(
        segments = results.len(),
        accepted = summary.accepted,
        outside_club = summary.outside_club,
        malformed = summary.malformed,
        duplicates = summary.duplicates,
        unrecognised_times = summary.unrecognised_times,
        "read segment exports"
    );

    let roster = results.participants();
    let standings = standings::aggregate(&mut results, &roster)
        .context("failed to aggregate segment results")?;

    let segment_names: Vec<String> = results.segment_names().map(str::to_string).collect();
    let table = report::build_table(&segment_names, &standings, cli.score)?;
    print!("{table}");

    Ok(())
}
