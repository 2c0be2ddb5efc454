//! Per-week and per-state totals plus calendar coverage for one window.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::engine::calendar::{DateRange, WeekKey, parse_date};
use crate::engine::ingest::{IngestStats, Ingestor};
use crate::engine::types::{CaseCounts, RawRow, StateFilter, StateTotal, WeeklyRecord, WeeklyTotal};

/// Which expected weeks have data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    #[serde(rename = "availableWeekLabels")]
    pub available_weeks: Vec<WeekKey>,
    #[serde(rename = "missingWeekLabels")]
    pub missing_weeks: Vec<WeekKey>,
    pub total_weeks: usize,
    pub coverage_ratio: Option<f64>,
}

impl CoverageReport {
    /// Neutral result for degenerate ranges.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Splits `expected` into available and missing weeks.
    ///
    /// Keys in `present` that are not expected are ignored. Both outputs keep
    /// the chronological order of `expected`.
    pub fn from_weeks(expected: &[WeekKey], present: &BTreeSet<WeekKey>) -> Self {
        let (available_weeks, missing_weeks): (Vec<WeekKey>, Vec<WeekKey>) =
            expected.iter().copied().partition(|week| present.contains(week));

        let total_weeks = expected.len();
        let coverage_ratio = if total_weeks > 0 {
            Some(available_weeks.len() as f64 / total_weeks as f64)
        } else {
            None
        };

        Self {
            available_weeks,
            missing_weeks,
            total_weeks,
            coverage_ratio,
        }
    }

    pub fn weeks_reported(&self) -> usize {
        self.available_weeks.len()
    }
}

/// Everything aggregated for one window.
#[derive(Debug, Clone, Default)]
pub struct CoverageOutcome {
    pub range: Option<DateRange>,
    pub report: CoverageReport,
    /// Chronological, one entry per available week.
    pub weekly_totals: Vec<WeeklyTotal>,
    /// Sorted by state name.
    pub state_totals: Vec<StateTotal>,
    pub records: Vec<WeeklyRecord>,
    pub ingest: IngestStats,
}

impl CoverageOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sum of every weekly total.
    pub fn totals(&self) -> CaseCounts {
        let mut sum = CaseCounts::default();
        for week in &self.weekly_totals {
            sum += week.counts;
        }
        sum
    }
}

/// Accumulates week and state totals in a single pass.
pub fn accumulate(
    records: &[WeeklyRecord],
) -> (BTreeMap<WeekKey, CaseCounts>, BTreeMap<String, CaseCounts>) {
    let mut by_week: BTreeMap<WeekKey, CaseCounts> = BTreeMap::new();
    let mut by_state: BTreeMap<String, CaseCounts> = BTreeMap::new();

    for record in records {
        *by_week.entry(record.week).or_default() += record.counts;
        *by_state.entry(record.state.clone()).or_default() += record.counts;
    }

    (by_week, by_state)
}

/// Aggregates already-ingested records for `range`.
pub fn aggregate(range: DateRange, records: Vec<WeeklyRecord>, ingest: IngestStats) -> CoverageOutcome {
    let (by_week, by_state) = accumulate(&records);

    let expected = range.weeks();
    let present: BTreeSet<WeekKey> = by_week.keys().copied().collect();
    let report = CoverageReport::from_weeks(&expected, &present);

    let weekly_totals = by_week
        .into_iter()
        .filter(|(week, _)| report.available_weeks.binary_search(week).is_ok())
        .map(|(week_key, counts)| WeeklyTotal { week_key, counts })
        .collect();

    let state_totals = by_state
        .into_iter()
        .map(|(state, counts)| StateTotal { state, counts })
        .collect();

    debug!(
        total_weeks = report.total_weeks,
        available = report.available_weeks.len(),
        missing = report.missing_weeks.len(),
        "Coverage computed"
    );

    CoverageOutcome {
        range: Some(range),
        report,
        weekly_totals,
        state_totals,
        records,
        ingest,
    }
}

/// Ingests `rows` and aggregates them for a validated window.
pub fn aggregate_window(
    rows: &[RawRow],
    range: DateRange,
    filter: &StateFilter,
    aggregate_labels: &[String],
) -> CoverageOutcome {
    let outcome = Ingestor::new(range, filter, aggregate_labels).ingest(rows);
    aggregate(range, outcome.records, outcome.stats)
}

/// Like [`aggregate_window`] but takes raw date strings and returns the
/// neutral empty outcome for unparseable or inverted bounds instead of
/// failing.
pub fn aggregate_bounds(
    rows: &[RawRow],
    start: &str,
    end: &str,
    filter: &StateFilter,
    aggregate_labels: &[String],
) -> CoverageOutcome {
    let range = match (parse_date(start), parse_date(end)) {
        (Some(s), Some(e)) => DateRange::new(s, e).ok(),
        _ => None,
    };

    match range {
        Some(range) => aggregate_window(rows, range, filter, aggregate_labels),
        None => {
            debug!(start, end, "Degenerate range, returning empty coverage");
            CoverageOutcome::empty()
        }
    }
}
