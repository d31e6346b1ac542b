//! CSV parser for the county-level case feed.
//!
//! Each row carries `location_name` (`County, JURISDICTION`), `date` and
//! `value`. The `location_type` column and anything else is ignored.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::calendar::parse_date;
use crate::error::Result;
use crate::jurisdiction::{Registry, parse_location};
use crate::reconcile::types::RawCaseRecord;

#[derive(Debug, Deserialize)]
struct CaseFeedRow {
    location_name: String,
    date: String,
    #[serde(default)]
    value: Option<String>,
}

/// Rows kept from the case feed plus counts of the ones that were not.
#[derive(Debug, Default)]
pub struct CaseFeed {
    pub records: Vec<RawCaseRecord>,
    pub malformed_location: usize,
    pub invalid_date: usize,
    pub unknown_jurisdiction: usize,
    /// Rows kept with `cases` forced to 0.
    pub coerced_cases: usize,
}

impl CaseFeed {
    pub fn skipped(&self) -> usize {
        self.malformed_location + self.invalid_date + self.unknown_jurisdiction
    }
}

/// Decodes the case feed CSV into [`RawCaseRecord`]s in file order.
///
/// Rows that cannot be keyed to a jurisdiction and week are counted and
/// skipped: a malformed location, unknown jurisdiction or unparsable date
/// leaves no grid cell to default into. Case values that are blank,
/// non-numeric or negative become 0 and the row is kept.
///
/// # Errors
///
/// Returns [`crate::Error::Csv`] if the bytes are not CSV with the expected
/// header.
pub fn parse_case_feed(bytes: &[u8], registry: &Registry) -> Result<CaseFeed> {
    let mut rdr = csv::Reader::from_reader(bytes);
    let mut feed = CaseFeed::default();

    for result in rdr.deserialize() {
        let row: CaseFeedRow = result?;

        let location = match parse_location(&row.location_name) {
            Ok(loc) => loc,
            Err(e) => {
                debug!(error = %e, "Skipping case row");
                feed.malformed_location += 1;
                continue;
            }
        };

        let jurisdiction = match registry.canonicalize(&location.jurisdiction) {
            Ok(j) => j,
            Err(e) => {
                debug!(error = %e, "Skipping case row");
                feed.unknown_jurisdiction += 1;
                continue;
            }
        };

        let date = match parse_date(&row.date) {
            Ok(d) => d,
            Err(e) => {
                debug!(error = %e, location = %row.location_name, "Skipping case row");
                feed.invalid_date += 1;
                continue;
            }
        };

        let cases = match row.value.as_deref().and_then(parse_count) {
            Some(n) => n,
            None => {
                feed.coerced_cases += 1;
                0
            }
        };

        feed.records.push(RawCaseRecord {
            county: location.county,
            jurisdiction: jurisdiction.name.to_string(),
            date,
            cases,
        });
    }

    if feed.skipped() > 0 {
        warn!(
            malformed_location = feed.malformed_location,
            invalid_date = feed.invalid_date,
            unknown_jurisdiction = feed.unknown_jurisdiction,
            "Case feed rows skipped"
        );
    }
    if feed.coerced_cases > 0 {
        warn!(rows = feed.coerced_cases, "Case values coerced to 0");
    }

    Ok(feed)
}

/// Parses a non-negative count. Returns `None` for blank, non-numeric,
/// non-finite or negative input.
///
/// Accepts thousands separators and fractional values, which are rounded.
pub fn parse_count(raw: &str) -> Option<u64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let n: f64 = cleaned.parse().ok()?;
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    Some(n.round() as u64)
}
