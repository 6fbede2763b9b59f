use chrono::{Duration, NaiveDate, Utc};

use crate::models::{PeriodComparison, TimeWindow};

/// Window of `days` calendar days ending today, today included.
pub fn date_range(days: i64) -> TimeWindow {
    date_range_on(Utc::now().date_naive(), days)
}

/// Current window plus the immediately preceding window of the same length.
pub fn comparison_periods(days: i64) -> PeriodComparison {
    comparison_periods_on(Utc::now().date_naive(), days)
}

pub fn date_range_on(today: NaiveDate, days: i64) -> TimeWindow {
    let days = days.max(1);
    TimeWindow::new(today - Duration::days(days - 1), today)
}

pub fn comparison_periods_on(today: NaiveDate, days: i64) -> PeriodComparison {
    let days = days.max(1);
    let current = date_range_on(today, days);
    let previous_end = current.start - Duration::days(1);
    let previous = TimeWindow::new(previous_end - Duration::days(days - 1), previous_end);
    PeriodComparison { current, previous }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn seven_day_range_includes_today() {
        let window = date_range_on(day(2026, 8, 6), 7);
        assert_eq!(window.start, day(2026, 7, 31));
        assert_eq!(window.end, day(2026, 8, 6));
        assert_eq!(window.days(), 7);
    }

    #[test]
    fn one_day_range_is_today_only() {
        let window = date_range_on(day(2026, 8, 6), 1);
        assert_eq!(window.start, window.end);
    }

    #[test]
    fn non_positive_days_is_treated_as_one() {
        assert_eq!(date_range_on(day(2026, 8, 6), 0).days(), 1);
        assert_eq!(date_range_on(day(2026, 8, 6), -3).days(), 1);
    }

    #[test]
    fn periods_are_adjacent_with_no_gap_or_overlap() {
        for days in [1, 7, 30, 365] {
            let pair = comparison_periods_on(day(2026, 8, 6), days);
            assert_eq!(
                pair.previous.end + Duration::days(1),
                pair.current.start,
                "days={days}"
            );
            assert_eq!(pair.previous.days(), pair.current.days(), "days={days}");
            assert_eq!(
                pair.previous.end_exclusive(),
                pair.current.start_datetime(),
                "days={days}"
            );
        }
    }

    #[test]
    fn results_are_stable_for_a_fixed_day() {
        let a = comparison_periods_on(day(2026, 2, 28), 30);
        let b = comparison_periods_on(day(2026, 2, 28), 30);
        assert_eq!(a.current, b.current);
        assert_eq!(a.previous, b.previous);
    }

    #[test]
    fn crossing_midnight_shifts_the_window() {
        let before = date_range_on(day(2026, 8, 6), 7);
        let after = date_range_on(day(2026, 8, 7), 7);
        assert_eq!(after.start, before.start + Duration::days(1));
        assert_eq!(after.end, before.end + Duration::days(1));
    }
}
