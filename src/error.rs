use thiserror::Error;

#[derive(Debug, Error)]
pub enum TallyError {
    #[error("Malformed canonical time: {0:?}")]
    MalformedTime(String),

    #[error("Invalid aggregation state: {0}")]
    InvalidState(String),
}
