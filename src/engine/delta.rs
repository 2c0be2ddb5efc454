//! Percentage-change and averaging arithmetic.

use crate::engine::calendar::DateRange;

/// Percentage change from `previous` to `current`.
///
/// Growth from a zero base is reported as +100% (or 0% when both are zero),
/// never as an infinity.
pub fn percentage_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current == 0.0 { 0.0 } else { 100.0 }
    } else {
        (current - previous) / previous.abs() * 100.0
    }
}

/// Denominator for per-week averages: weeks that actually reported, or the
/// nominal window length when none did.
pub fn average_denominator(weeks_reported: usize, range: &DateRange) -> u32 {
    if weeks_reported > 0 {
        u32::try_from(weeks_reported).unwrap_or(u32::MAX)
    } else {
        range.nominal_weeks()
    }
}

/// `total / denominator`, 0 when the denominator is 0.
pub fn per_week(total: u64, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        total as f64 / f64::from(denominator)
    }
}

/// Rounds to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_change_zero_base() {
        assert_eq!(percentage_change(0.0, 0.0), 0.0);
        assert_eq!(percentage_change(5.0, 0.0), 100.0);
    }

    #[test]
    fn test_percentage_change_normal_values() {
        assert_eq!(percentage_change(150.0, 100.0), 50.0);
        assert_eq!(percentage_change(50.0, 100.0), -50.0);
        assert_eq!(percentage_change(0.0, 20.0), -100.0);
    }

    #[test]
    fn test_average_denominator_prefers_reported_weeks() {
        let range = DateRange::parse("2024-01-01", "2024-01-28").unwrap();
        assert_eq!(average_denominator(3, &range), 3);
        assert_eq!(average_denominator(0, &range), 4);
    }

    #[test]
    fn test_per_week_and_rounding() {
        assert_eq!(per_week(10, 4), 2.5);
        assert_eq!(per_week(10, 0), 0.0);
        assert_eq!(round_to(0.66666, 3), 0.667);
        assert_eq!(round_to(1.0, 3), 1.0);
    }
}
