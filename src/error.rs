//! Caller-facing error taxonomy for the aggregation engine.

use thiserror::Error;

/// Errors surfaced to callers of the engine's exposed operations.
///
/// Row-level data problems are never represented here; they are dropped
/// during ingest (see [`crate::engine::ingest::DropReason`]).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The end of the requested range precedes its start.
    #[error("invalid range: end date {end} is before start date {start}")]
    InvalidRange { start: String, end: String },

    /// A range bound could not be parsed as a calendar date.
    #[error("invalid range: unparseable date '{0}'")]
    InvalidDate(String),

    /// The upstream row fetch failed. No retry is attempted here.
    #[error("row fetch failed")]
    Fetch(#[source] anyhow::Error),

    /// A window aggregation task panicked or was cancelled.
    #[error("aggregation task failed")]
    Task(#[from] tokio::task::JoinError),

    /// Assembled metrics violated an internal consistency check.
    #[error("inconsistent metrics: {0}")]
    Inconsistent(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Returns `true` for the range-validation variants.
    pub fn is_invalid_range(&self) -> bool {
        matches!(self, EngineError::InvalidRange { .. } | EngineError::InvalidDate(_))
    }
}
