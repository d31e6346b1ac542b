//! Data types used by the reconciliation pipeline.

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::EpiWeek;

/// County placeholder for grid cells with no source row.
pub const UNKNOWN_COUNTY: &str = "UNKNOWN";

/// One row of the county-level case feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCaseRecord {
    pub county: String,
    /// Canonical jurisdiction key.
    pub jurisdiction: String,
    pub date: NaiveDate,
    pub cases: u64,
}

/// One (jurisdiction, week) cell of the dense grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub jurisdiction: String,
    pub jurisdiction_code: String,
    pub week: EpiWeek,
    /// Latest source date in the week, or the week start when empty.
    pub date: NaiveDate,
    pub cases: u64,
    /// Contributing counties joined by `"; "`, or [`UNKNOWN_COUNTY`].
    pub county: String,
}

/// Jurisdiction × week grid straight from the source feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    pub cells: Vec<GridCell>,
}

/// Grid with city-level entities folded into their parents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapsedGrid {
    pub cells: Vec<GridCell>,
}

/// CSV row shape for grid cells.
#[derive(Debug, Serialize)]
pub struct GridRow<'a> {
    pub jurisdiction: &'a str,
    #[serde(rename = "weekStart")]
    pub week_start: NaiveDate,
    pub date: NaiveDate,
    pub cases: u64,
    pub county: &'a str,
    #[serde(rename = "jurisdictionCode")]
    pub jurisdiction_code: &'a str,
}

impl<'a> From<&'a GridCell> for GridRow<'a> {
    fn from(cell: &'a GridCell) -> Self {
        GridRow {
            jurisdiction: &cell.jurisdiction,
            week_start: cell.week.start_date,
            date: cell.date,
            cases: cell.cases,
            county: &cell.county,
            jurisdiction_code: &cell.jurisdiction_code,
        }
    }
}

/// Direction of change between the prior and current year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn between(prior: u64, current: u64) -> Self {
        match current.cmp(&prior) {
            std::cmp::Ordering::Greater => Trend::Up,
            std::cmp::Ordering::Less => Trend::Down,
            std::cmp::Ordering::Equal => Trend::Flat,
        }
    }

    /// Glyph written to the comparison report.
    pub fn glyph(self) -> &'static str {
        match self {
            Trend::Up => "▲",
            Trend::Down => "▼",
            Trend::Flat => "➝",
        }
    }
}

impl Serialize for Trend {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.glyph())
    }
}

/// Year-over-year comparison for one jurisdiction.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRecord {
    /// Display name.
    pub jurisdiction: String,
    pub prior_year_cases: u64,
    pub current_year_cases: u64,
    /// `None` when the prior year had zero cases.
    pub percent_change: Option<f64>,
    /// `None` when the jurisdiction has no baseline at all.
    pub trend: Option<Trend>,
}

/// Comparison records plus the years they cover.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub prior_year: i32,
    pub current_year: i32,
    pub records: Vec<ComparisonRecord>,
}

/// National case total for one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NationalWeek {
    #[serde(rename = "weekStart")]
    pub week_start: NaiveDate,
    pub cases: u64,
}
