//! Contributor ranking, growth detection, alert flags and notable signals.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::engine::calendar::WeekKey;
use crate::engine::coverage::{CoverageOutcome, CoverageReport};
use crate::engine::delta::round_to;
use crate::engine::types::{StateTotal, WeeklyRecord, WeeklyTotal};

/// A ranked state with its share of confirmed cases.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub state: String,
    pub suspected: u64,
    pub confirmed: u64,
    pub deaths: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_of_confirmed: Option<f64>,
}

/// The largest positive week-over-week confirmed increase for one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthSignal {
    pub state: String,
    pub week_key: WeekKey,
    pub previous_week_key: WeekKey,
    pub week_over_week_change: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertFlags {
    pub incomplete_reporting: bool,
    pub sustained_growth: bool,
    pub sharp_spike: bool,
    pub elevated_deaths: bool,
}

/// Everything the detector derives from one window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalReport {
    pub top_contributors: Vec<Contributor>,
    pub fastest_growers: Vec<GrowthSignal>,
    pub alert_flags: AlertFlags,
    pub notable_signals: Vec<String>,
}

/// Change between two consecutive entries of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekDelta {
    pub from: WeekKey,
    pub to: WeekKey,
    pub delta: i64,
}

impl WeekDelta {
    /// Weeks between `from` and `to`; more than 1 when unreported weeks
    /// were skipped over.
    pub fn weeks_apart(&self) -> i64 {
        self.from.weeks_until(self.to).unwrap_or(1)
    }

    fn describe(&self) -> String {
        match self.weeks_apart() {
            apart if apart > 1 => format!(
                "from {} to {} ({apart} weeks apart, no data in between)",
                self.from, self.to
            ),
            _ => format!("from {} to {}", self.from, self.to),
        }
    }
}

fn signed(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Pairwise deltas over a chronologically sorted series.
pub fn week_over_week(series: &[(WeekKey, u64)]) -> Vec<WeekDelta> {
    series
        .windows(2)
        .map(|pair| WeekDelta {
            from: pair[0].0,
            to: pair[1].0,
            delta: signed(pair[1].1) - signed(pair[0].1),
        })
        .collect()
}

/// Confirmed series of the global weekly totals.
pub fn confirmed_series(weekly: &[WeeklyTotal]) -> Vec<(WeekKey, u64)> {
    let mut series: Vec<(WeekKey, u64)> =
        weekly.iter().map(|w| (w.week_key, w.counts.confirmed)).collect();
    series.sort_by_key(|(week, _)| *week);
    series
}

/// `state -> chronologically sorted confirmed series`, built in one pass.
pub fn state_series(records: &[WeeklyRecord]) -> BTreeMap<String, Vec<(WeekKey, u64)>> {
    let mut table: BTreeMap<String, BTreeMap<WeekKey, u64>> = BTreeMap::new();
    for record in records {
        let slot = table
            .entry(record.state.clone())
            .or_default()
            .entry(record.week)
            .or_default();
        *slot = slot.saturating_add(record.counts.confirmed);
    }

    table
        .into_iter()
        .map(|(state, weeks)| {
            let mut series: Vec<(WeekKey, u64)> = weeks.into_iter().collect();
            series.sort_by_key(|(week, _)| *week);
            (state, series)
        })
        .collect()
}

/// Top `n` states by confirmed cases, excluding states with none.
///
/// Shares are relative to the sum over every qualifying state, not just the
/// ranked ones, and are omitted when that sum is zero.
pub fn top_contributors(state_totals: &[StateTotal], n: usize) -> Vec<Contributor> {
    let mut qualifying: Vec<&StateTotal> =
        state_totals.iter().filter(|s| s.counts.confirmed > 0).collect();
    qualifying.sort_by(|a, b| {
        b.counts
            .confirmed
            .cmp(&a.counts.confirmed)
            .then_with(|| a.state.cmp(&b.state))
    });

    let sum = qualifying
        .iter()
        .fold(0u64, |acc, s| acc.saturating_add(s.counts.confirmed));

    qualifying
        .into_iter()
        .take(n)
        .map(|s| Contributor {
            state: s.state.clone(),
            suspected: s.counts.suspected,
            confirmed: s.counts.confirmed,
            deaths: s.counts.deaths,
            share_of_confirmed: (sum > 0)
                .then(|| round_to(s.counts.confirmed as f64 / sum as f64, 3)),
        })
        .collect()
}

/// States with the largest single positive week-over-week increase.
pub fn fastest_growers(records: &[WeeklyRecord], n: usize) -> Vec<GrowthSignal> {
    let mut growers: Vec<GrowthSignal> = state_series(records)
        .into_iter()
        .filter_map(|(state, series)| {
            let mut best: Option<WeekDelta> = None;
            for d in week_over_week(&series) {
                if best.is_none_or(|b| d.delta > b.delta) {
                    best = Some(d);
                }
            }
            let best = best.filter(|b| b.delta > 0)?;
            Some(GrowthSignal {
                state,
                week_key: best.to,
                previous_week_key: best.from,
                week_over_week_change: best.delta,
            })
        })
        .collect();

    growers.sort_by(|a, b| {
        b.week_over_week_change
            .cmp(&a.week_over_week_change)
            .then_with(|| a.state.cmp(&b.state))
    });
    growers.truncate(n);
    growers
}

fn longest_positive_run(deltas: &[WeekDelta]) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for d in deltas {
        if d.delta > 0 {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

/// Alert flags over the global weekly series.
pub fn alert_flags(
    report: &CoverageReport,
    weekly: &[WeeklyTotal],
    config: &EngineConfig,
) -> AlertFlags {
    let deltas = week_over_week(&confirmed_series(weekly));

    AlertFlags {
        incomplete_reporting: report
            .coverage_ratio
            .is_some_and(|r| r < config.incomplete_coverage_ratio),
        sustained_growth: longest_positive_run(&deltas) >= config.sustained_growth_weeks.max(1),
        sharp_spike: deltas.iter().any(|d| d.delta >= signed(config.spike_increase)),
        elevated_deaths: weekly.iter().any(|w| w.counts.deaths >= config.elevated_deaths),
    }
}

fn extreme_by(deltas: &[WeekDelta], wanted: Ordering) -> Option<WeekDelta> {
    let mut best: Option<WeekDelta> = None;
    for d in deltas {
        if d.delta.cmp(&0) != wanted {
            continue;
        }
        if best.is_none_or(|b| d.delta.abs() > b.delta.abs()) {
            best = Some(*d);
        }
    }
    best
}

/// Deterministic sentences, at most one per category: missing weeks, the
/// largest increase, the largest decrease.
pub fn notable_signals(report: &CoverageReport, weekly: &[WeeklyTotal]) -> Vec<String> {
    let mut signals = Vec::new();

    if !report.missing_weeks.is_empty() {
        let weeks: Vec<String> = report.missing_weeks.iter().map(ToString::to_string).collect();
        signals.push(format!(
            "No data reported for {} of {} weeks: {}",
            report.missing_weeks.len(),
            report.total_weeks,
            weeks.join(", ")
        ));
    }

    let deltas = week_over_week(&confirmed_series(weekly));

    if let Some(up) = extreme_by(&deltas, Ordering::Greater) {
        signals.push(format!(
            "Largest weekly increase: +{} confirmed cases {}",
            up.delta,
            up.describe()
        ));
    }
    if let Some(down) = extreme_by(&deltas, Ordering::Less) {
        signals.push(format!(
            "Largest weekly decrease: {} confirmed cases {}",
            down.delta,
            down.describe()
        ));
    }

    signals
}

/// Runs every detector over one aggregated window.
pub fn detect_signals(outcome: &CoverageOutcome, config: &EngineConfig) -> SignalReport {
    let alert_flags = alert_flags(&outcome.report, &outcome.weekly_totals, config);

    if alert_flags.incomplete_reporting {
        warn!(
            coverage_ratio = ?outcome.report.coverage_ratio,
            missing = outcome.report.missing_weeks.len(),
            "Incomplete reporting in requested range"
        );
    }

    let report = SignalReport {
        top_contributors: top_contributors(&outcome.state_totals, config.top_n),
        fastest_growers: fastest_growers(&outcome.records, config.top_n),
        alert_flags,
        notable_signals: notable_signals(&outcome.report, &outcome.weekly_totals),
    };

    debug!(
        contributors = report.top_contributors.len(),
        growers = report.fastest_growers.len(),
        notable = report.notable_signals.len(),
        "Signals detected"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::CaseCounts;

    fn week(w: u32) -> WeekKey {
        WeekKey::new(2024, w).unwrap()
    }

    fn record(w: u32, state: &str, confirmed: u64, deaths: u64) -> WeeklyRecord {
        WeeklyRecord {
            week: week(w),
            state: state.to_string(),
            counts: CaseCounts {
                suspected: confirmed * 2,
                confirmed,
                deaths,
            },
        }
    }

    fn weekly(values: &[(u32, u64, u64)]) -> Vec<WeeklyTotal> {
        values
            .iter()
            .map(|&(w, confirmed, deaths)| WeeklyTotal {
                week_key: week(w),
                counts: CaseCounts {
                    suspected: 0,
                    confirmed,
                    deaths,
                },
            })
            .collect()
    }

    fn state_total(state: &str, confirmed: u64) -> StateTotal {
        StateTotal {
            state: state.to_string(),
            counts: CaseCounts {
                suspected: 0,
                confirmed,
                deaths: 0,
            },
        }
    }

    fn full_report(weeks: &[u32]) -> CoverageReport {
        let keys: Vec<WeekKey> = weeks.iter().map(|&w| week(w)).collect();
        CoverageReport::from_weeks(&keys, &keys.iter().copied().collect())
    }

    #[test]
    fn test_top_contributors_ranking_and_share() {
        let totals = vec![
            state_total("Kano", 30),
            state_total("Lagos", 50),
            state_total("Oyo", 0),
            state_total("Abia", 10),
            state_total("Edo", 10),
        ];

        let top = top_contributors(&totals, 3);
        let names: Vec<&str> = top.iter().map(|c| c.state.as_str()).collect();
        assert_eq!(names, vec!["Lagos", "Kano", "Abia"]);
        assert_eq!(top[0].share_of_confirmed, Some(0.5));
        assert_eq!(top[1].share_of_confirmed, Some(0.3));
        assert!(top.iter().all(|c| c.confirmed > 0));
    }

    #[test]
    fn test_top_contributors_empty_when_no_confirmed() {
        let totals = vec![state_total("Kano", 0)];
        assert!(top_contributors(&totals, 3).is_empty());
    }

    #[test]
    fn test_fastest_growers_picks_largest_jump() {
        let records = vec![
            record(1, "Lagos", 10, 0),
            record(2, "Lagos", 40, 0),
            record(3, "Lagos", 45, 0),
            record(1, "Kano", 5, 0),
            record(2, "Kano", 8, 0),
            record(1, "Oyo", 9, 0),
            record(2, "Oyo", 3, 0),
        ];

        let growers = fastest_growers(&records, 3);
        assert_eq!(growers.len(), 2);
        assert_eq!(growers[0].state, "Lagos");
        assert_eq!(growers[0].week_over_week_change, 30);
        assert_eq!(growers[0].week_key, week(2));
        assert_eq!(growers[0].previous_week_key, week(1));
        assert_eq!(growers[1].state, "Kano");
    }

    #[test]
    fn test_state_series_sums_duplicate_weeks_in_order() {
        let records = vec![
            record(3, "Lagos", 1, 0),
            record(1, "Lagos", 2, 0),
            record(1, "Lagos", 4, 0),
        ];
        let table = state_series(&records);
        assert_eq!(table["Lagos"], vec![(week(1), 6), (week(3), 1)]);
    }

    #[test]
    fn test_alert_flags() {
        let config = EngineConfig::default();
        let report = full_report(&[1, 2, 3]);

        let flags = alert_flags(&report, &weekly(&[(1, 10, 0), (2, 12, 0), (3, 20, 5)]), &config);
        assert!(flags.sustained_growth);
        assert!(!flags.sharp_spike);
        assert!(flags.elevated_deaths);
        assert!(!flags.incomplete_reporting);

        let flags = alert_flags(&report, &weekly(&[(1, 10, 0), (2, 35, 4), (3, 20, 0)]), &config);
        assert!(!flags.sustained_growth);
        assert!(flags.sharp_spike);
        assert!(!flags.elevated_deaths);
    }

    #[test]
    fn test_incomplete_reporting_threshold() {
        let config = EngineConfig::default();
        let keys: Vec<WeekKey> = (1..=4).map(week).collect();
        let three_of_four =
            CoverageReport::from_weeks(&keys, &keys[..3].iter().copied().collect());
        assert!(!alert_flags(&three_of_four, &[], &config).incomplete_reporting);

        let two_of_four = CoverageReport::from_weeks(&keys, &keys[..2].iter().copied().collect());
        assert!(alert_flags(&two_of_four, &[], &config).incomplete_reporting);

        assert!(!alert_flags(&CoverageReport::empty(), &[], &config).incomplete_reporting);
    }

    #[test]
    fn test_notable_signals() {
        let keys: Vec<WeekKey> = (1..=4).map(week).collect();
        let report = CoverageReport::from_weeks(&keys, &keys[..3].iter().copied().collect());
        let series = weekly(&[(1, 10, 0), (2, 30, 0), (3, 18, 0)]);

        let signals = notable_signals(&report, &series);
        assert_eq!(
            signals,
            vec![
                "No data reported for 1 of 4 weeks: 2024-W04".to_string(),
                "Largest weekly increase: +20 confirmed cases from 2024-W01 to 2024-W02".to_string(),
                "Largest weekly decrease: -12 confirmed cases from 2024-W02 to 2024-W03".to_string(),
            ]
        );
    }

    #[test]
    fn test_notable_signals_mark_non_adjacent_weeks() {
        let keys: Vec<WeekKey> = (1..=3).map(week).collect();
        let report = CoverageReport::from_weeks(&keys, &[keys[0], keys[2]].into_iter().collect());
        let series = weekly(&[(1, 4, 0), (3, 9, 0)]);

        let signals = notable_signals(&report, &series);
        assert_eq!(
            signals,
            vec![
                "No data reported for 1 of 3 weeks: 2024-W02".to_string(),
                "Largest weekly increase: +5 confirmed cases from 2024-W01 to 2024-W03 \
                 (2 weeks apart, no data in between)"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_huge_counts_saturate_in_series_and_shares() {
        let huge = WeeklyRecord {
            week: week(1),
            state: "Lagos".to_string(),
            counts: CaseCounts {
                suspected: 0,
                confirmed: i64::MAX as u64,
                deaths: 0,
            },
        };
        let records = vec![huge.clone(), huge.clone(), huge];
        assert_eq!(state_series(&records)["Lagos"], vec![(week(1), u64::MAX)]);

        let totals = vec![state_total("Kano", u64::MAX), state_total("Lagos", u64::MAX)];
        let top = top_contributors(&totals, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].state, "Kano");
        assert_eq!(top[0].share_of_confirmed, Some(1.0));
    }

    #[test]
    fn test_notable_signals_flat_series() {
        let report = full_report(&[1, 2]);
        let signals = notable_signals(&report, &weekly(&[(1, 5, 0), (2, 5, 0)]));
        assert!(signals.is_empty());
    }
}
