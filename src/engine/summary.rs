//! Period-over-period summaries.

use chrono::NaiveDate;
use serde::Serialize;

use crate::engine::calendar::DateRange;
use crate::engine::coverage::CoverageOutcome;
use crate::engine::delta::{average_denominator, per_week, percentage_change};
use crate::engine::types::CaseCounts;

/// Per-week averages of each metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CaseAverages {
    pub suspected: f64,
    pub confirmed: f64,
    pub deaths: f64,
}

/// Percentage change of each metric between two windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CaseDeltas {
    pub suspected: f64,
    pub confirmed: f64,
    pub deaths: f64,
}

impl CaseDeltas {
    pub fn between_totals(current: &CaseCounts, previous: &CaseCounts) -> Self {
        Self {
            suspected: percentage_change(current.suspected as f64, previous.suspected as f64),
            confirmed: percentage_change(current.confirmed as f64, previous.confirmed as f64),
            deaths: percentage_change(current.deaths as f64, previous.deaths as f64),
        }
    }

    pub fn between_averages(current: &CaseAverages, previous: &CaseAverages) -> Self {
        Self {
            suspected: percentage_change(current.suspected, previous.suspected),
            confirmed: percentage_change(current.confirmed, previous.confirmed),
            deaths: percentage_change(current.deaths, previous.deaths),
        }
    }
}

/// Totals and averages for one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub totals: CaseCounts,
    pub averages: CaseAverages,
    pub weeks_reported: usize,
    pub total_weeks: usize,
}

impl WindowSummary {
    /// Averages divide by the weeks that reported, falling back to the
    /// nominal window length when none did.
    pub fn from_outcome(range: &DateRange, outcome: &CoverageOutcome) -> Self {
        let totals = outcome.totals();
        let weeks_reported = outcome.report.weeks_reported();
        let denominator = average_denominator(weeks_reported, range);

        Self {
            start: range.start(),
            end: range.end(),
            totals,
            averages: CaseAverages {
                suspected: per_week(totals.suspected, denominator),
                confirmed: per_week(totals.confirmed, denominator),
                deaths: per_week(totals.deaths, denominator),
            },
            weeks_reported,
            total_weeks: outcome.report.total_weeks,
        }
    }
}

/// A requested window compared with the equally long window before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub state: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub previous_start: NaiveDate,
    pub previous_end: NaiveDate,
    pub totals: CaseCounts,
    pub previous_totals: CaseCounts,
    pub averages: CaseAverages,
    pub previous_averages: CaseAverages,
    pub deltas: CaseDeltas,
    pub average_deltas: CaseDeltas,
    pub weeks_reported: usize,
    pub previous_weeks_reported: usize,
    pub total_weeks: usize,
}

impl PeriodSummary {
    pub fn from_windows(state: String, current: &WindowSummary, previous: &WindowSummary) -> Self {
        Self {
            state,
            period_start: current.start,
            period_end: current.end,
            previous_start: previous.start,
            previous_end: previous.end,
            totals: current.totals,
            previous_totals: previous.totals,
            averages: current.averages,
            previous_averages: previous.averages,
            deltas: CaseDeltas::between_totals(&current.totals, &previous.totals),
            average_deltas: CaseDeltas::between_averages(&current.averages, &previous.averages),
            weeks_reported: current.weeks_reported,
            previous_weeks_reported: previous.weeks_reported,
            total_weeks: current.total_weeks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::coverage::aggregate_window;
    use crate::engine::types::{RawRow, StateFilter};

    fn labels() -> Vec<String> {
        vec!["Total".to_string()]
    }

    #[test]
    fn test_window_average_uses_reported_weeks() {
        let range = DateRange::parse("2024-01-01", "2024-01-28").unwrap();
        let rows = vec![
            RawRow::new(2024, 1, "Lagos", 10, 4, 0),
            RawRow::new(2024, 3, "Lagos", 20, 8, 2),
        ];
        let outcome = aggregate_window(&rows, range, &StateFilter::All, &labels());
        let window = WindowSummary::from_outcome(&range, &outcome);

        assert_eq!(window.weeks_reported, 2);
        assert_eq!(window.total_weeks, 4);
        assert_eq!(window.averages.suspected, 15.0);
        assert_eq!(window.averages.confirmed, 6.0);
        assert_eq!(window.averages.deaths, 1.0);
    }

    #[test]
    fn test_window_average_falls_back_to_nominal_length() {
        let range = DateRange::parse("2024-01-01", "2024-01-28").unwrap();
        let outcome = aggregate_window(&[], range, &StateFilter::All, &labels());
        let window = WindowSummary::from_outcome(&range, &outcome);
        assert_eq!(window.weeks_reported, 0);
        assert_eq!(window.averages, CaseAverages::default());
    }

    #[test]
    fn test_period_deltas() {
        let current_range = DateRange::parse("2024-01-15", "2024-01-28").unwrap();
        let previous_range = current_range.previous().unwrap();
        let rows = vec![
            RawRow::new(2024, 1, "Lagos", 10, 10, 0),
            RawRow::new(2024, 2, "Lagos", 10, 10, 0),
            RawRow::new(2024, 3, "Lagos", 15, 30, 1),
        ];
        let current = aggregate_window(&rows, current_range, &StateFilter::All, &labels());
        let previous = aggregate_window(&rows, previous_range, &StateFilter::All, &labels());

        let summary = PeriodSummary::from_windows(
            "All States".to_string(),
            &WindowSummary::from_outcome(&current_range, &current),
            &WindowSummary::from_outcome(&previous_range, &previous),
        );

        assert_eq!(summary.totals.confirmed, 30);
        assert_eq!(summary.previous_totals.confirmed, 20);
        assert_eq!(summary.deltas.confirmed, 50.0);
        assert_eq!(summary.deltas.suspected, -25.0);
        assert_eq!(summary.deltas.deaths, 100.0);
        // One reported week now vs two before.
        assert_eq!(summary.averages.confirmed, 30.0);
        assert_eq!(summary.previous_averages.confirmed, 10.0);
        assert_eq!(summary.average_deltas.confirmed, 200.0);
    }
}
