//! Coverage and signal-detection aggregation.
//!
//! Raw rows flow one way: ingest, coverage aggregation, signal detection,
//! then assembly into a [`metrics::MetricsPayload`]. Every call allocates
//! fresh collections; nothing is cached between invocations.

pub mod calendar;
pub mod coverage;
pub mod delta;
pub mod ingest;
pub mod metrics;
pub mod signals;
pub mod summary;
pub mod types;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use calendar::DateRange;
use coverage::{CoverageOutcome, aggregate_window};
use summary::{PeriodSummary, WindowSummary};
use types::{RawRow, StateFilter};

pub use delta::percentage_change;
pub use metrics::assemble_report_metrics;
pub use signals::detect_signals;

/// Coverage and weekly totals for `[start, end]`.
pub fn compute_coverage(
    rows: &[RawRow],
    start: &str,
    end: &str,
    filter: &StateFilter,
    config: &EngineConfig,
) -> EngineResult<CoverageOutcome> {
    let range = DateRange::parse(start, end)?;
    Ok(aggregate_window(rows, range, filter, &config.aggregate_state_labels))
}

/// The window before `range` with the same length.
pub fn previous_window(range: &DateRange) -> EngineResult<DateRange> {
    range.previous().ok_or_else(|| EngineError::InvalidRange {
        start: range.start().to_string(),
        end: range.end().to_string(),
    })
}

/// Totals, averages and deltas for `[start, end]` against the preceding
/// window of identical length.
pub fn compute_summary(
    rows: &[RawRow],
    start: &str,
    end: &str,
    filter: &StateFilter,
    config: &EngineConfig,
) -> EngineResult<PeriodSummary> {
    let range = DateRange::parse(start, end)?;
    let previous = previous_window(&range)?;
    let labels = &config.aggregate_state_labels;

    let current_outcome = aggregate_window(rows, range, filter, labels);
    let previous_outcome = aggregate_window(rows, previous, filter, labels);

    Ok(PeriodSummary::from_windows(
        filter.label(),
        &WindowSummary::from_outcome(&range, &current_outcome),
        &WindowSummary::from_outcome(&previous, &previous_outcome),
    ))
}
