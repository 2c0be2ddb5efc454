//! Normalization of raw persistence rows into [`WeeklyRecord`]s.
//!
//! Each row either becomes a typed record or is dropped with an explicit
//! [`DropReason`]. Drops are data-quality tolerance, never errors.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::engine::calendar::{DateRange, WeekKey};
use crate::engine::types::{CaseCounts, RawRow, RawValue, StateFilter, WeeklyRecord};

/// Label of the pre-aggregated pseudo-state. Always excluded.
pub const TOTAL_LABEL: &str = "Total";

/// Why a raw row did not become a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    InvalidWeek,
    MissingState,
    AggregateRow,
    FilteredOut,
    OutsideWindow,
}

/// Counts of kept and dropped rows for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub kept: usize,
    pub dropped: BTreeMap<DropReason, usize>,
}

impl IngestStats {
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }
}

/// Output of [`Ingestor::ingest`].
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub records: Vec<WeeklyRecord>,
    pub stats: IngestStats,
}

/// Missing, null, negative or non-numeric counts become 0.
fn coerce_count(value: Option<&RawValue>) -> u64 {
    value
        .and_then(RawValue::as_i64)
        .map(|v| u64::try_from(v).unwrap_or(0))
        .unwrap_or(0)
}

fn parse_week(row: &RawRow) -> Option<WeekKey> {
    let year = i32::try_from(row.iso_year.as_ref()?.as_i64()?).ok()?;
    let week = u32::try_from(row.iso_week.as_ref()?.as_i64()?).ok()?;
    WeekKey::new(year, week)
}

/// Case-insensitive match against [`TOTAL_LABEL`] and any extra configured
/// aggregate labels. An empty `extra_labels` still matches "Total".
pub fn is_aggregate_state(state: &str, extra_labels: &[String]) -> bool {
    let state = state.trim();
    state.eq_ignore_ascii_case(TOTAL_LABEL)
        || extra_labels
            .iter()
            .any(|label| label.trim().eq_ignore_ascii_case(state))
}

/// Normalizes rows for one date window and state filter.
pub struct Ingestor<'a> {
    range: DateRange,
    filter: &'a StateFilter,
    aggregate_labels: &'a [String],
}

impl<'a> Ingestor<'a> {
    pub fn new(range: DateRange, filter: &'a StateFilter, aggregate_labels: &'a [String]) -> Self {
        Self {
            range,
            filter,
            aggregate_labels,
        }
    }

    /// Converts one row, or names the reason it was dropped.
    ///
    /// The window check comes last: the upstream fetch is year-scoped and
    /// therefore wider than the requested range.
    pub fn normalize(&self, row: &RawRow) -> Result<WeeklyRecord, DropReason> {
        let week = parse_week(row).ok_or(DropReason::InvalidWeek)?;

        let state = row
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(DropReason::MissingState)?;

        if is_aggregate_state(state, self.aggregate_labels) {
            return Err(DropReason::AggregateRow);
        }
        if !self.filter.matches(state) {
            return Err(DropReason::FilteredOut);
        }
        if !week.overlaps(&self.range) {
            return Err(DropReason::OutsideWindow);
        }

        Ok(WeeklyRecord {
            week,
            state: state.to_string(),
            counts: CaseCounts {
                suspected: coerce_count(row.suspected.as_ref()),
                confirmed: coerce_count(row.confirmed.as_ref()),
                deaths: coerce_count(row.deaths.as_ref()),
            },
        })
    }

    pub fn ingest(&self, rows: &[RawRow]) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();

        for row in rows {
            match self.normalize(row) {
                Ok(record) => {
                    outcome.records.push(record);
                    outcome.stats.kept += 1;
                }
                Err(reason) => *outcome.stats.dropped.entry(reason).or_default() += 1,
            }
        }

        debug!(
            start = %self.range.start(),
            end = %self.range.end(),
            kept = outcome.stats.kept,
            dropped = outcome.stats.dropped_total(),
            "Rows ingested"
        );

        outcome
    }
}
