use chrono::{Datelike, Local, Months, NaiveDate};
use tally_common::ServiceType;

use crate::json_err;

pub use tally_common::format::round2;

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `YYYY-MM`, the key budgets are stored under.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// First day of the month containing `date` and first day of the next one.
pub fn month_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date - chrono::Days::new(u64::from(date.day0()));
    (first, first + Months::new(1))
}

/// e.g. `October 18, 2026`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

pub fn parse_service(s: &str) -> Result<ServiceType, axum::response::Response> {
    s.parse::<ServiceType>().map_err(|e| json_err!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_range() {
        assert_eq!(
            month_range(date(2026, 10, 18)),
            (date(2026, 10, 1), date(2026, 11, 1))
        );
        assert_eq!(
            month_range(date(2025, 12, 31)),
            (date(2025, 12, 1), date(2026, 1, 1))
        );
        assert_eq!(
            month_range(date(2024, 2, 1)),
            (date(2024, 2, 1), date(2024, 3, 1))
        );
    }

    #[test]
    fn test_formats() {
        assert_eq!(month_key(date(2025, 11, 3)), "2025-11");
        assert_eq!(long_date(date(2026, 10, 18)), "October 18, 2026");
    }
}
