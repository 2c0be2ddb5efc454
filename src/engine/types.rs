//! Data types shared across the aggregation pipeline.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

use crate::engine::calendar::WeekKey;

/// Filter value meaning "aggregate all states".
pub const ALL_STATES: &str = "All States";

/// A loosely typed field as delivered by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Coerces to an integer. Numeric-looking text is accepted; fractional
    /// values are truncated toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawValue::Int(v) => Some(*v),
            RawValue::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            RawValue::Float(_) => None,
            RawValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .map(|v| v.trunc() as i64)
                })
            }
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Int(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

/// One row as returned by the persistence collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub iso_year: Option<RawValue>,
    pub iso_week: Option<RawValue>,
    pub state: Option<String>,
    pub suspected: Option<RawValue>,
    pub confirmed: Option<RawValue>,
    pub deaths: Option<RawValue>,
}

impl RawRow {
    /// Convenience constructor for well-formed integer rows.
    pub fn new(
        iso_year: i64,
        iso_week: i64,
        state: &str,
        suspected: i64,
        confirmed: i64,
        deaths: i64,
    ) -> Self {
        Self {
            iso_year: Some(iso_year.into()),
            iso_week: Some(iso_week.into()),
            state: Some(state.to_string()),
            suspected: Some(suspected.into()),
            confirmed: Some(confirmed.into()),
            deaths: Some(deaths.into()),
        }
    }
}

/// The three case metrics tracked per week and state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseCounts {
    pub suspected: u64,
    pub confirmed: u64,
    pub deaths: u64,
}

/// Sums saturate at `u64::MAX`.
impl AddAssign for CaseCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.suspected = self.suspected.saturating_add(rhs.suspected);
        self.confirmed = self.confirmed.saturating_add(rhs.confirmed);
        self.deaths = self.deaths.saturating_add(rhs.deaths);
    }
}

/// A validated row. Lives only for one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyRecord {
    pub week: WeekKey,
    pub state: String,
    pub counts: CaseCounts,
}

/// Sum across all matching states for one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTotal {
    pub week_key: WeekKey,
    #[serde(flatten)]
    pub counts: CaseCounts,
}

/// Sum across all weeks in the range for one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTotal {
    pub state: String,
    #[serde(flatten)]
    pub counts: CaseCounts,
}

/// Which states a request covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateFilter {
    All,
    Only(Vec<String>),
}

impl StateFilter {
    /// Builds a filter from user input. An empty list, or one containing the
    /// "All States" sentinel, means no filter.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() || names.iter().any(|n| n.trim() == ALL_STATES) {
            StateFilter::All
        } else {
            StateFilter::Only(names)
        }
    }

    /// Exact-name match.
    pub fn matches(&self, state: &str) -> bool {
        match self {
            StateFilter::All => true,
            StateFilter::Only(names) => names.iter().any(|n| n == state),
        }
    }

    /// Human-readable label carried into summaries.
    pub fn label(&self) -> String {
        match self {
            StateFilter::All => ALL_STATES.to_string(),
            StateFilter::Only(names) => names.join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_coercion() {
        assert_eq!(RawValue::Int(7).as_i64(), Some(7));
        assert_eq!(RawValue::Float(7.9).as_i64(), Some(7));
        assert_eq!(RawValue::from(" 12 ").as_i64(), Some(12));
        assert_eq!(RawValue::from("3.0").as_i64(), Some(3));
        assert_eq!(RawValue::from("n/a").as_i64(), None);
        assert_eq!(RawValue::Float(f64::NAN).as_i64(), None);
    }

    #[test]
    fn test_raw_value_deserializes_string_or_number() {
        let row: RawRow = serde_json::from_str(
            r#"{"iso_year": "2024", "iso_week": 3, "state": "Kano", "suspected": null, "confirmed": "4"}"#,
        )
        .unwrap();
        assert_eq!(row.iso_year, Some(RawValue::Text("2024".into())));
        assert_eq!(row.iso_week, Some(RawValue::Int(3)));
        assert_eq!(row.suspected, None);
        assert_eq!(row.deaths, None);
    }

    #[test]
    fn test_case_counts_sum_saturates() {
        let big = CaseCounts {
            suspected: 1,
            confirmed: i64::MAX as u64,
            deaths: u64::MAX,
        };
        let mut sum = big;
        sum += big;
        sum += big;
        assert_eq!(sum.suspected, 3);
        assert_eq!(sum.confirmed, u64::MAX);
        assert_eq!(sum.deaths, u64::MAX);
    }

    #[test]
    fn test_state_filter_sentinel() {
        assert_eq!(StateFilter::from_names(Vec::<String>::new()), StateFilter::All);
        assert_eq!(StateFilter::from_names(["All States"]), StateFilter::All);
        let only = StateFilter::from_names(["Lagos", "Kano"]);
        assert!(only.matches("Lagos"));
        assert!(!only.matches("lagos"));
        assert_eq!(only.label(), "Lagos, Kano");
    }
}
