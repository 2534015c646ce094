pub mod error;
pub mod ingest;
pub mod models;
pub mod report;
pub mod standings;
pub mod time;

pub use error::TallyError;
pub use models::{PersonAggregate, PersonSegmentRecord, RawResultRow, Roster, SegmentResults};

pub const NOT_AVAILABLE: &str = "N/A";
