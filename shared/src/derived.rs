//! Derived fields: values computed from stored data, never accepted from callers.

use chrono::{Datelike, NaiveDate};

/// Total daily yield. Always recomputed from the two milkings.
pub fn total_daily(morning_amount: f64, evening_amount: f64) -> f64 {
    morning_amount + evening_amount
}

/// Whole months between `birth` and `today` by calendar year/month difference.
///
/// The day of month is ignored, so 2024-01-31 to 2024-02-01 counts as one
/// month. A birth date in the future yields 0.
pub fn age_in_months(birth: NaiveDate, today: NaiveDate) -> u32 {
    let years = today.year() - birth.year();
    let months = today.month() as i32 - birth.month() as i32;
    (years * 12 + months).max(0) as u32
}

fn plural(count: u32, unit: &str) -> String {
    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Human-readable age, e.g. "11 months", "1 year", "2 years, 3 months".
pub fn age_label(birth: NaiveDate, today: NaiveDate) -> String {
    let total = age_in_months(birth, today);
    if total < 12 {
        return plural(total, "month");
    }
    let (years, months) = (total / 12, total % 12);
    if months == 0 {
        plural(years, "year")
    } else {
        format!("{}, {}", plural(years, "year"), plural(months, "month"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Months;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_label_boundaries() {
        let today = date(2024, 6, 15);
        assert_eq!(age_label(date(2023, 7, 15), today), "11 months");
        assert_eq!(age_label(date(2023, 6, 15), today), "1 year");
        assert_eq!(age_label(date(2023, 5, 15), today), "1 year, 1 month");
        assert_eq!(age_label(date(2021, 3, 1), today), "3 years, 3 months");
        assert_eq!(age_label(date(2024, 5, 20), today), "1 month");
        assert_eq!(age_label(date(2024, 6, 1), today), "0 months");
    }

    #[test]
    fn test_age_ignores_day_of_month() {
        assert_eq!(age_in_months(date(2024, 1, 31), date(2024, 2, 1)), 1);
        assert_eq!(age_in_months(date(2024, 1, 1), date(2024, 1, 31)), 0);
    }

    #[test]
    fn test_future_birth_date_is_zero() {
        assert_eq!(age_in_months(date(2025, 1, 1), date(2024, 1, 1)), 0);
        assert_eq!(age_label(date(2025, 1, 1), date(2024, 1, 1)), "0 months");
    }

    #[test]
    fn test_total_daily() {
        assert_eq!(total_daily(3.5, 4.0), 7.5);
        assert_eq!(total_daily(0.0, 0.0), 0.0);
    }

    proptest! {
        #[test]
        fn total_daily_is_sum(m in 0.0f64..1000.0, e in 0.0f64..1000.0) {
            let total = total_daily(m, e);
            prop_assert!((total - (m + e)).abs() < 1e-9);
            prop_assert!(total >= m && total >= e);
        }

        #[test]
        fn months_elapsed_matches_calendar_offset(
            year in 1990i32..2030,
            month in 1u32..=12,
            day in 1u32..=28,
            offset in 0u32..600,
        ) {
            let birth = date(year, month, day);
            let today = birth + Months::new(offset);
            prop_assert_eq!(age_in_months(birth, today), offset);
            prop_assert_eq!(age_label(birth, today), age_label(birth, today));
        }

        #[test]
        fn label_uses_years_from_twelve_months(offset in 12u32..600) {
            let birth = date(2000, 1, 10);
            let label = age_label(birth, birth + Months::new(offset));
            prop_assert!(label.contains("year"));
            prop_assert_eq!(label.contains("month"), offset % 12 != 0);
        }
    }
}
