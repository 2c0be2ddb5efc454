//! Flattened metrics payload handed to the narrative generator.
//!
//! Field names are a contract: the downstream generator reads them by name.

use serde::Serialize;

use crate::engine::calendar::WeekKey;
use crate::engine::coverage::CoverageReport;
use crate::engine::delta::round_to;
use crate::engine::signals::{AlertFlags, Contributor, GrowthSignal, SignalReport};
use crate::engine::summary::{CaseAverages, CaseDeltas, PeriodSummary};
use crate::engine::types::CaseCounts;
use crate::error::{EngineError, EngineResult};

/// Immutable, field-stable metrics for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsPayload {
    state: String,
    period_start: String,
    period_end: String,
    totals: CaseCounts,
    previous_totals: CaseCounts,
    averages: CaseAverages,
    deltas: CaseDeltas,
    weeks_reported: usize,
    total_weeks: usize,
    coverage_ratio: Option<f64>,
    available_weeks: Vec<WeekKey>,
    missing_weeks: Vec<WeekKey>,
    top_contributors: Vec<Contributor>,
    fastest_growers: Vec<GrowthSignal>,
    alert_flags: AlertFlags,
    notable_signals: Vec<String>,
}

impl MetricsPayload {
    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn totals(&self) -> &CaseCounts {
        &self.totals
    }

    pub fn averages(&self) -> &CaseAverages {
        &self.averages
    }

    pub fn deltas(&self) -> &CaseDeltas {
        &self.deltas
    }

    pub fn weeks_reported(&self) -> usize {
        self.weeks_reported
    }

    pub fn total_weeks(&self) -> usize {
        self.total_weeks
    }

    pub fn coverage_ratio(&self) -> Option<f64> {
        self.coverage_ratio
    }

    pub fn missing_weeks(&self) -> &[WeekKey] {
        &self.missing_weeks
    }

    pub fn top_contributors(&self) -> &[Contributor] {
        &self.top_contributors
    }

    pub fn fastest_growers(&self) -> &[GrowthSignal] {
        &self.fastest_growers
    }

    pub fn alert_flags(&self) -> &AlertFlags {
        &self.alert_flags
    }

    pub fn notable_signals(&self) -> &[String] {
        &self.notable_signals
    }
}

fn check_consistency(coverage: &CoverageReport) -> EngineResult<()> {
    let available = coverage.available_weeks.len();
    if available > coverage.total_weeks {
        return Err(EngineError::Inconsistent(format!(
            "{available} available weeks exceed {} total weeks",
            coverage.total_weeks
        )));
    }
    if available + coverage.missing_weeks.len() != coverage.total_weeks {
        return Err(EngineError::Inconsistent(format!(
            "available ({available}) and missing ({}) weeks do not add up to {}",
            coverage.missing_weeks.len(),
            coverage.total_weeks
        )));
    }
    let chronological = |weeks: &[WeekKey]| weeks.windows(2).all(|w| w[0] < w[1]);
    if !chronological(&coverage.available_weeks) || !chronological(&coverage.missing_weeks) {
        return Err(EngineError::Inconsistent(
            "week lists are not strictly chronological".to_string(),
        ));
    }
    if let Some(ratio) = coverage.coverage_ratio {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(EngineError::Inconsistent(format!(
                "coverage ratio {ratio} outside [0, 1]"
            )));
        }
    }
    Ok(())
}

/// Combines a summary, its coverage and its signals into one payload.
///
/// Rounds the coverage ratio to 3 decimals and drops blank signal entries.
pub fn assemble_report_metrics(
    summary: &PeriodSummary,
    coverage: &CoverageReport,
    signals: &SignalReport,
) -> EngineResult<MetricsPayload> {
    check_consistency(coverage)?;

    let notable_signals = signals
        .notable_signals
        .iter()
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .collect();

    Ok(MetricsPayload {
        state: summary.state.clone(),
        period_start: summary.period_start.to_string(),
        period_end: summary.period_end.to_string(),
        totals: summary.totals,
        previous_totals: summary.previous_totals,
        averages: summary.averages,
        deltas: summary.deltas,
        weeks_reported: coverage.available_weeks.len(),
        total_weeks: coverage.total_weeks,
        coverage_ratio: coverage.coverage_ratio.map(|r| round_to(r, 3)),
        available_weeks: coverage.available_weeks.clone(),
        missing_weeks: coverage.missing_weeks.clone(),
        top_contributors: signals.top_contributors.clone(),
        fastest_growers: signals.fastest_growers.clone(),
        alert_flags: signals.alert_flags,
        notable_signals,
    })
}
