//! Year-over-year comparison against a fixed prior-year baseline.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::jurisdiction::Registry;
use crate::reconcile::collapse::AliasMap;
use crate::reconcile::types::{ComparisonRecord, ComparisonReport, Trend};

/// 2024 confirmed measles cases by reporting jurisdiction.
pub const BASELINE_2024_TSV: &str = "\
Alabama\t0
Alaska\t0
Arizona\t5
California\t15
Illinois\t67
Minnesota\t70
New York\t1
New York City\t14
Oregon\t31
Texas\t1
Washington\t6
";

pub const BASELINE_2024_YEAR: i32 = 2024;

/// Prior-year case counts keyed by canonical jurisdiction, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub year: i32,
    entries: Vec<(String, u64)>,
}

impl Baseline {
    /// The built-in 2024 table, folded with the registry's aliases.
    pub fn builtin(registry: &Registry) -> Result<Self> {
        let aliases = AliasMap::from_registry(registry);
        Ok(Self::from_tsv(BASELINE_2024_YEAR, BASELINE_2024_TSV, registry)?.collapsed(&aliases))
    }

    /// Parses `name<TAB>count` lines. Blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownJurisdiction`] for names the registry does not
    /// know and [`Error::SchemaMismatch`] for lines without a count.
    pub fn from_tsv(year: i32, tsv: &str, registry: &Registry) -> Result<Self> {
        let mut entries: Vec<(String, u64)> = Vec::new();

        for line in tsv.lines().filter(|l| !l.trim().is_empty()) {
            let (name, count) = line
                .split_once('\t')
                .ok_or_else(|| Error::SchemaMismatch(format!("baseline line {line:?}")))?;
            let count: u64 = count
                .trim()
                .parse()
                .map_err(|_| Error::SchemaMismatch(format!("baseline count {count:?}")))?;
            let jurisdiction = registry.canonicalize(name)?;

            match entries.iter_mut().find(|(n, _)| n == jurisdiction.name) {
                Some((_, existing)) => *existing = existing.saturating_add(count),
                None => entries.push((jurisdiction.name.to_string(), count)),
            }
        }

        Ok(Self { year, entries })
    }

    /// Folds alias rows into their parent, as the grid collapser does.
    pub fn collapsed(self, aliases: &AliasMap) -> Self {
        let mut entries: Vec<(String, u64)> = Vec::new();
        for (name, count) in self.entries {
            let target = aliases.resolve(&name).to_string();
            match entries.iter_mut().find(|(n, _)| *n == target) {
                Some((_, existing)) => *existing = existing.saturating_add(count),
                None => entries.push((target, count)),
            }
        }
        Self {
            year: self.year,
            entries,
        }
    }

    pub fn get(&self, jurisdiction: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(n, _)| n == jurisdiction)
            .map(|(_, c)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rounds `(current - prior) / prior * 100` to 4 decimals, ties to even.
/// `None` when `prior` is 0.
pub fn percent_change(prior: u64, current: u64) -> Option<f64> {
    if prior == 0 {
        return None;
    }
    let raw = (current as f64 - prior as f64) / prior as f64 * 100.0;
    Some((raw * 10_000.0).round_ties_even() / 10_000.0)
}

/// Trend for a jurisdiction; `None` only when it has no baseline.
pub fn trend_indicator(prior: Option<u64>, current: u64) -> Option<Trend> {
    prior.map(|p| Trend::between(p, current))
}

/// Joins the baseline against current-year totals.
///
/// Baseline rows define the output, in baseline order. Jurisdictions
/// missing from `current_totals` count as 0; jurisdictions without a
/// baseline row are not reported.
pub fn compare_years(
    baseline: &Baseline,
    current_year: i32,
    current_totals: &BTreeMap<String, u64>,
    registry: &Registry,
) -> ComparisonReport {
    let records: Vec<ComparisonRecord> = baseline
        .iter()
        .map(|(name, prior)| {
            let current = current_totals.get(name).copied().unwrap_or(0);
            let display = registry.get(name).map_or(name, |j| j.display);
            ComparisonRecord {
                jurisdiction: display.to_string(),
                prior_year_cases: prior,
                current_year_cases: current,
                percent_change: percent_change(prior, current),
                trend: trend_indicator(Some(prior), current),
            }
        })
        .collect();

    let unreported = current_totals
        .iter()
        .filter(|(name, cases)| **cases > 0 && baseline.get(name).is_none())
        .count();
    if unreported > 0 {
        debug!(
            jurisdictions = unreported,
            "Jurisdictions with cases but no baseline left out of comparison"
        );
    }

    info!(
        prior_year = baseline.year,
        current_year,
        records = records.len(),
        "Year-over-year comparison built"
    );

    ComparisonReport {
        prior_year: baseline.year,
        current_year,
        records,
    }
}
