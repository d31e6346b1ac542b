//! MMWR epidemiological week arithmetic.
//!
//! Weeks run Sunday through Saturday. Week 1 of a year is the week that
//! contains January 4th, so a week belongs to the year its Wednesday falls
//! in. Year Y's first week may therefore start in late December of Y-1.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::{Error, Result};

/// A Sunday-anchored MMWR week.
///
/// Ordering follows `start_date`, which also orders `year`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EpiWeek {
    pub start_date: NaiveDate,
    pub year: i32,
}

impl EpiWeek {
    /// Saturday closing this week.
    pub fn end_date(&self) -> NaiveDate {
        self.start_date + Duration::days(6)
    }

    /// 1-based week number within the MMWR year.
    pub fn number(&self) -> u32 {
        let first = first_week_start(self.year);
        ((self.start_date - first).num_days() / 7 + 1) as u32
    }

    pub fn next(&self) -> EpiWeek {
        week_start_of(self.start_date + Duration::days(7))
    }
}

/// Returns the MMWR week containing `date`.
pub fn week_start_of(date: NaiveDate) -> EpiWeek {
    let offset = i64::from(date.weekday().num_days_from_sunday());
    let start_date = date - Duration::days(offset);
    // Wednesday decides the year: it is the fourth day of the week.
    let year = (start_date + Duration::days(3)).year();
    EpiWeek { start_date, year }
}

/// Parses `raw` leniently and returns its MMWR week.
///
/// # Errors
///
/// Returns [`Error::InvalidDate`] if `raw` is empty or unparsable.
pub fn week_start_of_str(raw: &str) -> Result<EpiWeek> {
    parse_date(raw).map(week_start_of)
}

/// All weeks overlapping `[start, end]`, ascending. Empty when `start > end`.
pub fn weeks_in_range(start: NaiveDate, end: NaiveDate) -> Vec<EpiWeek> {
    if start > end {
        return Vec::new();
    }

    let mut weeks = Vec::new();
    let mut week = week_start_of(start);
    while week.start_date <= end {
        weeks.push(week);
        week = week.next();
    }
    weeks
}

/// First and last week of MMWR `year` (52 or 53 weeks apart, inclusive).
pub fn active_year_window(year: i32) -> (EpiWeek, EpiWeek) {
    let first = EpiWeek {
        start_date: first_week_start(year),
        year,
    };
    let last = EpiWeek {
        start_date: first_week_start(year + 1) - Duration::days(7),
        year,
    };
    (first, last)
}

fn first_week_start(year: i32) -> NaiveDate {
    // Jan 4th exists in every year chrono can represent for our range.
    let jan4 = NaiveDate::from_ymd_opt(year, 1, 4).unwrap_or(NaiveDate::MIN);
    week_start_of(jan4).start_date
}

/// Parses a date from the shapes the upstream feeds emit.
///
/// Accepts ISO dates, ISO date-times (with or without offset or fractional
/// seconds) and US `MM/DD/YYYY`.
///
/// # Errors
///
/// Returns [`Error::InvalidDate`] for blank or unrecognized input.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(Error::InvalidDate(raw.to_string()));
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    for fmt in ["%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }

    Err(Error::InvalidDate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_week_start_is_sunday() {
        let week = week_start_of(d(2025, 3, 13));
        assert_eq!(week.start_date, d(2025, 3, 9));
        assert_eq!(week.start_date.weekday(), Weekday::Sun);
        assert_eq!(week.year, 2025);
    }

    #[test]
    fn test_year_one_starts_in_previous_december() {
        let week = week_start_of(d(2025, 1, 1));
        assert_eq!(week.start_date, d(2024, 12, 29));
        assert_eq!(week.year, 2025);
        assert_eq!(week.number(), 1);
    }

    #[test]
    fn test_early_january_can_belong_to_previous_year() {
        // Jan 1 2022 is a Saturday; its week has only one day in 2022.
        let week = week_start_of(d(2022, 1, 1));
        assert_eq!(week.start_date, d(2021, 12, 26));
        assert_eq!(week.year, 2021);
        assert_eq!(week.number(), 52);
    }

    #[test]
    fn test_late_december_can_belong_to_next_year() {
        let week = week_start_of(d(2024, 12, 31));
        assert_eq!(week.year, 2025);
    }

    #[test]
    fn test_weeks_in_range_dedupes_and_orders() {
        let weeks = weeks_in_range(d(2025, 1, 1), d(2025, 1, 20));
        let starts: Vec<_> = weeks.iter().map(|w| w.start_date).collect();
        assert_eq!(
            starts,
            vec![d(2024, 12, 29), d(2025, 1, 5), d(2025, 1, 12), d(2025, 1, 19)]
        );
    }

    #[test]
    fn test_weeks_in_range_inverted_is_empty() {
        assert!(weeks_in_range(d(2025, 2, 1), d(2025, 1, 1)).is_empty());
    }

    #[test]
    fn test_active_year_window_52_weeks() {
        let (first, last) = active_year_window(2024);
        assert_eq!(first.start_date, d(2023, 12, 31));
        assert_eq!(last.start_date, d(2024, 12, 22));
        assert_eq!(last.number(), 52);
    }

    #[test]
    fn test_active_year_window_2025_has_53_weeks() {
        let (first, last) = active_year_window(2025);
        assert_eq!(first.start_date, d(2024, 12, 29));
        assert_eq!(last.start_date, d(2025, 12, 28));
        assert_eq!(last.number(), 53);
    }

    #[test]
    fn test_active_year_window_53_weeks() {
        let (first, last) = active_year_window(2020);
        assert_eq!(first.start_date, d(2019, 12, 29));
        assert_eq!(last.start_date, d(2020, 12, 27));
        assert_eq!(last.number(), 53);
    }

    #[test]
    fn test_parse_date_variants() {
        assert_eq!(parse_date("2025-02-03").unwrap(), d(2025, 2, 3));
        assert_eq!(parse_date("2025-02-03T10:00:00.000").unwrap(), d(2025, 2, 3));
        assert_eq!(parse_date("2025-02-03T10:00:00Z").unwrap(), d(2025, 2, 3));
        assert_eq!(parse_date("02/03/2025").unwrap(), d(2025, 2, 3));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(matches!(parse_date(""), Err(Error::InvalidDate(_))));
        assert!(matches!(parse_date("soon"), Err(Error::InvalidDate(_))));
        assert!(week_start_of_str("2025-13-01").is_err());
    }
}
