//! Dense jurisdiction × week grid construction.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::calendar::{EpiWeek, week_start_of};
use crate::error::{Error, Result};
use crate::jurisdiction::Jurisdiction;
use crate::reconcile::types::{Grid, GridCell, RawCaseRecord, UNKNOWN_COUNTY};

struct CellAccumulator<'a> {
    cases: u64,
    counties: BTreeSet<&'a str>,
    latest: NaiveDate,
}

/// Left-merges `records` onto the full `jurisdictions` × `weeks` product.
///
/// Records sharing a (jurisdiction, week) key are summed. Cells with no
/// record get 0 cases, the `UNKNOWN` county and the week start as date.
/// Records outside the grid are dropped. Cells are ordered by jurisdiction
/// (input order) then week.
///
/// # Errors
///
/// Returns [`Error::DuplicateGridKey`] if the output would hold a key twice,
/// which happens only when `jurisdictions` or `weeks` repeat an entry.
pub fn build_grid(
    records: &[RawCaseRecord],
    jurisdictions: &[Jurisdiction],
    weeks: &[EpiWeek],
) -> Result<Grid> {
    let mut merged: HashMap<(&str, NaiveDate), CellAccumulator> = HashMap::new();

    for record in records {
        let week = week_start_of(record.date);
        let acc = merged
            .entry((record.jurisdiction.as_str(), week.start_date))
            .or_insert_with(|| CellAccumulator {
                cases: 0,
                counties: BTreeSet::new(),
                latest: record.date,
            });
        acc.cases = acc.cases.saturating_add(record.cases);
        acc.counties.insert(record.county.as_str());
        acc.latest = acc.latest.max(record.date);
    }

    let mut cells = Vec::with_capacity(jurisdictions.len() * weeks.len());
    let mut matched = 0usize;

    for jurisdiction in jurisdictions {
        for week in weeks {
            let cell = match merged.get(&(jurisdiction.name, week.start_date)) {
                Some(acc) => {
                    matched += 1;
                    GridCell {
                        jurisdiction: jurisdiction.name.to_string(),
                        jurisdiction_code: jurisdiction.code.to_string(),
                        week: *week,
                        date: acc.latest,
                        cases: acc.cases,
                        county: acc.counties.iter().copied().collect::<Vec<_>>().join("; "),
                    }
                }
                None => GridCell {
                    jurisdiction: jurisdiction.name.to_string(),
                    jurisdiction_code: jurisdiction.code.to_string(),
                    week: *week,
                    date: week.start_date,
                    cases: 0,
                    county: UNKNOWN_COUNTY.to_string(),
                },
            };
            cells.push(cell);
        }
    }

    let outside = merged.len().saturating_sub(matched);
    if outside > 0 {
        debug!(keys = outside, "Source keys outside the grid were dropped");
    }

    verify_unique(&cells)?;

    info!(
        jurisdictions = jurisdictions.len(),
        weeks = weeks.len(),
        cells = cells.len(),
        populated = matched,
        "Dense grid built"
    );

    Ok(Grid { cells })
}

/// Checks that no (jurisdiction, week) key appears twice.
///
/// # Errors
///
/// Returns [`Error::DuplicateGridKey`] naming the first repeated key.
pub fn verify_unique(cells: &[GridCell]) -> Result<()> {
    let mut seen = HashSet::with_capacity(cells.len());
    for cell in cells {
        if !seen.insert((cell.jurisdiction.as_str(), cell.week.start_date)) {
            return Err(Error::DuplicateGridKey {
                jurisdiction: cell.jurisdiction.clone(),
                week_start: cell.week.start_date,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::weeks_in_range;
    use crate::jurisdiction::Registry;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(county: &str, jurisdiction: &str, date: NaiveDate, cases: u64) -> RawCaseRecord {
        RawCaseRecord {
            county: county.to_string(),
            jurisdiction: jurisdiction.to_string(),
            date,
            cases,
        }
    }

    fn three_weeks() -> Vec<EpiWeek> {
        weeks_in_range(d(2025, 1, 5), d(2025, 1, 19))
    }

    #[test]
    fn test_every_key_exactly_once() {
        let registry = Registry::us();
        let weeks = three_weeks();
        let grid = build_grid(&[], registry.all(), &weeks).unwrap();

        assert_eq!(grid.cells.len(), registry.all().len() * weeks.len());
        for j in registry.all() {
            for w in &weeks {
                let n = grid
                    .cells
                    .iter()
                    .filter(|c| c.jurisdiction == j.name && c.week == *w)
                    .count();
                assert_eq!(n, 1);
            }
        }
    }

    #[test]
    fn test_missing_week_filled_with_zero() {
        let registry = Registry::us();
        let weeks = three_weeks();
        let records = vec![
            record("GAINES", "TEXAS", d(2025, 1, 6), 3),
            record("GAINES", "TEXAS", d(2025, 1, 14), 5),
        ];
        let grid = build_grid(&records, registry.all(), &weeks).unwrap();

        let texas: Vec<_> = grid
            .cells
            .iter()
            .filter(|c| c.jurisdiction == "TEXAS")
            .collect();
        assert_eq!(texas.len(), 3);
        assert_eq!(texas[0].cases, 3);
        assert_eq!(texas[1].cases, 5);
        assert_eq!(texas[2].cases, 0);
        assert_eq!(texas[2].county, UNKNOWN_COUNTY);
        assert_eq!(texas[2].date, weeks[2].start_date);
        assert_eq!(texas[0].jurisdiction_code, "TX");
    }

    #[test]
    fn test_counties_in_same_week_are_summed() {
        let registry = Registry::us();
        let weeks = three_weeks();
        let records = vec![
            record("TERRY", "TEXAS", d(2025, 1, 7), 2),
            record("GAINES", "TEXAS", d(2025, 1, 9), 4),
            record("GAINES", "TEXAS", d(2025, 1, 8), 1),
        ];
        let grid = build_grid(&records, registry.all(), &weeks).unwrap();

        let cell = grid
            .cells
            .iter()
            .find(|c| c.jurisdiction == "TEXAS" && c.week.start_date == d(2025, 1, 5))
            .unwrap();
        assert_eq!(cell.cases, 7);
        assert_eq!(cell.county, "GAINES; TERRY");
        assert_eq!(cell.date, d(2025, 1, 9));
    }

    #[test]
    fn test_records_outside_range_dropped() {
        let registry = Registry::us();
        let weeks = three_weeks();
        let records = vec![record("GAINES", "TEXAS", d(2024, 6, 1), 9)];
        let grid = build_grid(&records, registry.all(), &weeks).unwrap();
        assert!(grid.cells.iter().all(|c| c.cases == 0));
    }

    #[test]
    fn test_huge_counts_saturate() {
        let registry = Registry::us();
        let weeks = three_weeks();
        let records = vec![
            record("GAINES", "TEXAS", d(2025, 1, 6), u64::MAX),
            record("TERRY", "TEXAS", d(2025, 1, 7), u64::MAX),
        ];
        let grid = build_grid(&records, registry.all(), &weeks).unwrap();
        let cell = grid
            .cells
            .iter()
            .find(|c| c.jurisdiction == "TEXAS" && c.week.start_date == d(2025, 1, 5))
            .unwrap();
        assert_eq!(cell.cases, u64::MAX);
    }

    #[test]
    fn test_repeated_jurisdiction_is_duplicate_key() {
        let registry = Registry::us();
        let texas = *registry.get("TEXAS").unwrap();
        let result = build_grid(&[], &[texas, texas], &three_weeks());
        assert!(matches!(result, Err(Error::DuplicateGridKey { .. })));
    }
}
