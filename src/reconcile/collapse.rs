//! Folding city-level jurisdictions into their parent and per-jurisdiction
//! and per-week totals over the folded grid.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::info;

use crate::error::Result;
use crate::jurisdiction::Registry;
use crate::reconcile::grid::verify_unique;
use crate::reconcile::types::{CollapsedGrid, Grid, GridCell, NationalWeek, UNKNOWN_COUNTY};

/// Child → parent jurisdiction mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: Vec<(String, String)>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every registry entry that names a parent.
    pub fn from_registry(registry: &Registry) -> Self {
        let entries = registry
            .all()
            .iter()
            .filter_map(|j| j.parent.map(|p| (j.name.to_string(), p.to_string())))
            .collect();
        Self { entries }
    }

    pub fn with_alias(mut self, child: &str, parent: &str) -> Self {
        self.entries.push((child.to_string(), parent.to_string()));
        self
    }

    /// Parent for `name`, or `name` itself when it is not an alias.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(child, _)| child == name)
            .map_or(name, |(_, parent)| parent.as_str())
    }

    pub fn is_child(&self, name: &str) -> bool {
        self.entries.iter().any(|(child, _)| child == name)
    }
}

/// Sums every alias into its parent per week and drops the alias rows.
///
/// Cells keep grid order, with each parent at the position of its first
/// contributing cell.
///
/// # Errors
///
/// Returns [`crate::Error::DuplicateGridKey`] if the folded grid repeats a
/// key.
pub fn collapse_grid(grid: &Grid, aliases: &AliasMap) -> Result<CollapsedGrid> {
    let mut cells: Vec<GridCell> = Vec::new();
    let mut index: HashMap<(String, NaiveDate), usize> = HashMap::new();
    let mut folded = 0usize;

    for cell in &grid.cells {
        let target = aliases.resolve(&cell.jurisdiction);
        let is_alias = target != cell.jurisdiction;
        if is_alias {
            folded += 1;
        }

        match index.get(&(target.to_string(), cell.week.start_date)) {
            Some(&i) => {
                let existing = &mut cells[i];
                existing.cases = existing.cases.saturating_add(cell.cases);
                existing.date = existing.date.max(cell.date);
                existing.county = merge_counties(&existing.county, &cell.county);
                if !is_alias {
                    existing.jurisdiction_code = cell.jurisdiction_code.clone();
                }
            }
            None => {
                index.insert((target.to_string(), cell.week.start_date), cells.len());
                cells.push(GridCell {
                    jurisdiction: target.to_string(),
                    ..cell.clone()
                });
            }
        }
    }

    verify_unique(&cells)?;

    info!(
        input_cells = grid.cells.len(),
        output_cells = cells.len(),
        folded,
        "Jurisdictions collapsed"
    );

    Ok(CollapsedGrid { cells })
}

fn merge_counties(a: &str, b: &str) -> String {
    let counties: BTreeSet<&str> = a
        .split("; ")
        .chain(b.split("; "))
        .filter(|c| !c.is_empty() && *c != UNKNOWN_COUNTY)
        .collect();
    if counties.is_empty() {
        UNKNOWN_COUNTY.to_string()
    } else {
        counties.into_iter().collect::<Vec<_>>().join("; ")
    }
}

/// Total cases per jurisdiction over weeks of MMWR `year`.
///
/// Every jurisdiction in the grid is present, with 0 when it had no cases.
pub fn jurisdiction_totals(grid: &CollapsedGrid, year: i32) -> BTreeMap<String, u64> {
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for cell in &grid.cells {
        let total = totals.entry(cell.jurisdiction.clone()).or_insert(0);
        if cell.week.year == year {
            *total = total.saturating_add(cell.cases);
        }
    }
    totals
}

/// Sum across jurisdictions for each week, ascending.
pub fn national_weekly_totals(grid: &CollapsedGrid) -> Vec<NationalWeek> {
    let mut by_week: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for cell in &grid.cells {
        let total = by_week.entry(cell.week.start_date).or_insert(0);
        *total = total.saturating_add(cell.cases);
    }
    by_week
        .into_iter()
        .map(|(week_start, cases)| NationalWeek { week_start, cases })
        .collect()
}
