//! ISO-8601 week arithmetic.
//!
//! [`WeekKey`] is the canonical `YYYY-Www` identifier used as a map key
//! everywhere else. [`weeks_between`] produces the authoritative sequence of
//! expected weeks for a date range, independent of which rows arrived.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

/// Monday of ISO week `week` in ISO year `year`.
///
/// Week 1 always contains the year's first Thursday, so the first Thursday is
/// located, floored to its Monday, and `week - 1` weeks are added.
pub fn iso_week_start(year: i32, week: u32) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let offset = (4 + 7 - jan1.weekday().number_from_monday()) % 7;
    let first_thursday = jan1.checked_add_days(Days::new(u64::from(offset)))?;
    let week1_monday = first_thursday.checked_sub_days(Days::new(3))?;
    week1_monday.checked_add_days(Days::new(7 * u64::from(week.checked_sub(1)?)))
}

/// Sunday of ISO week `week` in ISO year `year`.
pub fn iso_week_end(year: i32, week: u32) -> Option<NaiveDate> {
    iso_week_start(year, week)?.checked_add_days(Days::new(6))
}

/// Number of ISO weeks (52 or 53) in `year`. December 28th is always in the
/// last ISO week of its year.
pub fn weeks_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 28)
        .map(|d| d.iso_week().week())
        .unwrap_or(52)
}

/// Identifier of one ISO week. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey {
    year: i32,
    week: u32,
}

impl WeekKey {
    /// Builds a key, rejecting weeks outside `1..=53` and week 53 of a
    /// 52-week year.
    pub fn new(year: i32, week: u32) -> Option<Self> {
        if !(0..=9999).contains(&year) || week == 0 || week > weeks_in_year(year) {
            return None;
        }
        Some(Self { year, week })
    }

    /// The ISO week containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn start(&self) -> Option<NaiveDate> {
        iso_week_start(self.year, self.week)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        iso_week_end(self.year, self.week)
    }

    /// Whole weeks from this week to `later`; 1 for adjacent weeks.
    pub fn weeks_until(&self, later: WeekKey) -> Option<i64> {
        Some((later.start()? - self.start()?).num_weeks())
    }

    /// True when any day of this week falls inside `[start, end]`.
    pub fn overlaps(&self, range: &DateRange) -> bool {
        match (self.start(), self.end()) {
            (Some(first), Some(last)) => first <= range.end() && last >= range.start(),
            _ => false,
        }
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

/// Returned when a string is not a valid `YYYY-Www` key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid week key '{0}'")]
pub struct InvalidWeekKey(pub String);

impl FromStr for WeekKey {
    type Err = InvalidWeekKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidWeekKey(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 8 || bytes[4] != b'-' || bytes[5] != b'W' {
            return Err(invalid());
        }
        let all_digits = |part: &[u8]| part.iter().all(u8::is_ascii_digit);
        if !all_digits(&bytes[..4]) || !all_digits(&bytes[6..]) {
            return Err(invalid());
        }
        let year: i32 = s[..4].parse().map_err(|_| invalid())?;
        let week: u32 = s[6..].parse().map_err(|_| invalid())?;
        WeekKey::new(year, week).ok_or_else(invalid)
    }
}

impl Serialize for WeekKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Formats `(year, week)` as `YYYY-Www`, or `None` if the week is invalid.
pub fn format_week_key(year: i32, week: u32) -> Option<String> {
    WeekKey::new(year, week).map(|k| k.to_string())
}

/// Parses a `YYYY-Www` key. Invalid input yields `None`.
pub fn parse_week_key(s: &str) -> Option<WeekKey> {
    s.parse().ok()
}

/// Ordered, deduplicated ISO weeks overlapping `[start, end]`.
///
/// Walks from the Monday of `start`'s week in 7-day steps until past `end`.
/// Empty when `end < start`.
pub fn weeks_between(start: NaiveDate, end: NaiveDate) -> Vec<WeekKey> {
    let mut keys: Vec<WeekKey> = Vec::new();
    if end < start {
        return keys;
    }

    let back = u64::from(start.weekday().num_days_from_monday());
    let mut cursor = start.checked_sub_days(Days::new(back)).unwrap_or(start);

    while cursor <= end {
        let key = WeekKey::from_date(cursor);
        if keys.last() != Some(&key) {
            keys.push(key);
        }
        match cursor.checked_add_days(Days::new(7)) {
            Some(next) => cursor = next,
            None => break,
        }
    }

    keys
}

/// ISO years whose weeks overlap `[start, end]`. Only a scoping hint for the
/// upstream fetch.
pub fn years_overlapping(start: NaiveDate, end: NaiveDate) -> BTreeSet<i32> {
    weeks_between(start, end).iter().map(WeekKey::year).collect()
}

/// Parses an inclusive calendar date in `YYYY-MM-DD` form.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// A validated inclusive date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> EngineResult<Self> {
        if end < start {
            return Err(EngineError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parses both bounds, failing on the first unparseable one.
    pub fn parse(start: &str, end: &str) -> EngineResult<Self> {
        let s = parse_date(start).ok_or_else(|| EngineError::InvalidDate(start.to_string()))?;
        let e = parse_date(end).ok_or_else(|| EngineError::InvalidDate(end.to_string()))?;
        Self::new(s, e)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive length in days (at least 1).
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Nominal window length in weeks: `ceil(days / 7)`, minimum 1.
    pub fn nominal_weeks(&self) -> u32 {
        let weeks = (self.days() + 6) / 7;
        u32::try_from(weeks.max(1)).unwrap_or(u32::MAX)
    }

    pub fn weeks(&self) -> Vec<WeekKey> {
        weeks_between(self.start, self.end)
    }

    pub fn years(&self) -> BTreeSet<i32> {
        years_overlapping(self.start, self.end)
    }

    /// The window of identical length ending the day before `start`.
    pub fn previous(&self) -> Option<Self> {
        let end = self.start.pred_opt()?;
        let span = u64::try_from(self.days() - 1).ok()?;
        let start = end.checked_sub_days(Days::new(span))?;
        Some(Self { start, end })
    }
}
