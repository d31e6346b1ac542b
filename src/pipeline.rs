//! Stage wiring for one reconciliation run.
//!
//! Every stage takes its inputs by reference and returns new data, so a run
//! is a pure function of the feed snapshot and [`RunContext`].

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::calendar::{EpiWeek, active_year_window, week_start_of, weeks_in_range};
use crate::config::ColumnVocabulary;
use crate::error::Result;
use crate::feeds::summary::{ExternalSummary, parse_summary};
use crate::feeds::weekly::{WeeklySeriesPoint, parse_weekly_series};
use crate::jurisdiction::Registry;
use crate::parser::parse_case_feed;
use crate::reconcile::collapse::{
    AliasMap, collapse_grid, jurisdiction_totals, national_weekly_totals,
};
use crate::reconcile::compare::{Baseline, compare_years};
use crate::reconcile::grid::build_grid;
use crate::reconcile::types::{CollapsedGrid, ComparisonReport, NationalWeek};

/// Raw feed bodies for one run. Optional feeds are `None` when unavailable.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    pub cases: Vec<u8>,
    pub summary: Option<Vec<u8>>,
    pub weekly_series: Option<Vec<u8>>,
}

/// Fixed inputs that are not fetched.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Upper bound of the week range.
    pub as_of: NaiveDate,
    pub registry: Registry,
    pub aliases: AliasMap,
    pub baseline: Baseline,
    pub vocabulary: ColumnVocabulary,
}

impl RunContext {
    /// US registry, its aliases and the built-in baseline.
    pub fn new(as_of: NaiveDate) -> Result<Self> {
        let registry = Registry::us();
        Ok(Self {
            as_of,
            aliases: AliasMap::from_registry(&registry),
            baseline: Baseline::builtin(&registry)?,
            registry,
            vocabulary: ColumnVocabulary::default(),
        })
    }

    pub fn with_vocabulary(mut self, vocabulary: ColumnVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }
}

/// The MMWR year being reported and the weeks of it seen so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingPeriod {
    pub current_year: i32,
    pub weeks: Vec<EpiWeek>,
}

impl ReportingPeriod {
    /// The year after `baseline_year`, from its first week through `as_of`.
    ///
    /// Weeks past the end of that year are kept; comparison totals filter
    /// on [`EpiWeek::year`].
    pub fn after_baseline(baseline_year: i32, as_of: NaiveDate) -> Self {
        let current_year = baseline_year + 1;
        let (first, _) = active_year_window(current_year);
        Self {
            current_year,
            weeks: weeks_in_range(first.start_date, as_of),
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub grid: CollapsedGrid,
    pub comparison: ComparisonReport,
    pub summary: ExternalSummary,
    pub weekly_series: Vec<WeeklySeriesPoint>,
    pub national: Vec<NationalWeek>,
}

/// Runs every stage over `snapshot`.
///
/// # Errors
///
/// Fails when the case feed cannot be decoded or a grid invariant breaks.
/// Optional feed problems only log warnings.
#[tracing::instrument(skip_all, fields(as_of = %ctx.as_of))]
pub fn run(snapshot: &FeedSnapshot, ctx: &RunContext) -> Result<Artifacts> {
    let period = ReportingPeriod::after_baseline(ctx.baseline.year, ctx.as_of);
    if period.weeks.is_empty() {
        warn!(
            current_year = period.current_year,
            "As-of date precedes the reporting year, grid will be empty"
        );
    }

    let grid = reconcile_cases(&snapshot.cases, ctx, &period.weeks)?;
    let totals = jurisdiction_totals(&grid, period.current_year);
    let comparison = compare_years(&ctx.baseline, period.current_year, &totals, &ctx.registry);
    let national = national_weekly_totals(&grid);
    let summary = summarize(snapshot.summary.as_deref());
    let weekly_series = weekly_series(
        snapshot.weekly_series.as_deref(),
        &ctx.vocabulary,
        period.current_year,
    );

    info!(
        cells = grid.cells.len(),
        comparisons = comparison.records.len(),
        summary_metrics = summary.metrics.len(),
        weekly_points = weekly_series.len(),
        "Run complete"
    );

    Ok(Artifacts {
        grid,
        comparison,
        summary,
        weekly_series,
        national,
    })
}

/// Case feed → dense grid → collapsed grid.
pub fn reconcile_cases(bytes: &[u8], ctx: &RunContext, weeks: &[EpiWeek]) -> Result<CollapsedGrid> {
    let feed = parse_case_feed(bytes, &ctx.registry)?;
    info!(
        records = feed.records.len(),
        skipped = feed.skipped(),
        latest_week = ?feed.records.iter().map(|r| week_start_of(r.date).start_date).max(),
        "Case feed parsed"
    );

    let grid = build_grid(&feed.records, ctx.registry.all(), weeks)?;
    collapse_grid(&grid, &ctx.aliases)
}

/// Summary feed → metrics, or empty when missing or unreadable.
pub fn summarize(bytes: Option<&[u8]>) -> ExternalSummary {
    let Some(bytes) = bytes else {
        return ExternalSummary::default();
    };
    match parse_summary(bytes) {
        Ok(summary) => summary,
        Err(e) => {
            warn!(error = %e, "Summary feed unreadable, using empty summary");
            ExternalSummary::default()
        }
    }
}

/// Weekly-series feed → points for `year`, or empty when missing or its
/// schema is not recognized.
pub fn weekly_series(
    bytes: Option<&[u8]>,
    vocab: &ColumnVocabulary,
    year: i32,
) -> Vec<WeeklySeriesPoint> {
    let Some(bytes) = bytes else {
        return Vec::new();
    };
    match parse_weekly_series(bytes, vocab, year) {
        Ok(points) => points,
        Err(e) => {
            warn!(error = %e, "Weekly series feed unusable, emitting empty series");
            Vec::new()
        }
    }
}
