//! Artifact writers.
//!
//! Each writer targets any [`Write`] so runs can be compared byte for byte
//! in memory; [`write_artifacts`] puts them on disk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, info};

use crate::feeds::summary::ExternalSummary;
use crate::feeds::weekly::WeeklySeriesPoint;
use crate::pipeline::Artifacts;
use crate::reconcile::types::{
    CollapsedGrid, ComparisonRecord, ComparisonReport, GridRow, NationalWeek,
};

pub const GRID_FILE: &str = "USMeaslesCases.csv";
pub const COMPARISON_FILE: &str = "YearlyComparison.json";
pub const SUMMARY_FILE: &str = "MeaslesSummary.csv";
pub const WEEKLY_SERIES_FILE: &str = "WeeklySeries.csv";
pub const NATIONAL_FILE: &str = "NationalWeeklyCases.csv";

const GRID_HEADER: [&str; 6] = [
    "jurisdiction",
    "weekStart",
    "date",
    "cases",
    "county",
    "jurisdictionCode",
];
const WEEK_HEADER: [&str; 2] = ["weekStart", "cases"];

/// Writes every artifact into `dir`, replacing existing files.
pub fn write_artifacts(dir: &Path, artifacts: &Artifacts) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    write_file(&dir.join(GRID_FILE), |w| write_grid_csv(w, &artifacts.grid))?;
    write_file(&dir.join(COMPARISON_FILE), |w| {
        write_comparison_json(w, &artifacts.comparison)
    })?;
    write_file(&dir.join(SUMMARY_FILE), |w| {
        write_summary_csv(w, &artifacts.summary)
    })?;
    write_file(&dir.join(WEEKLY_SERIES_FILE), |w| {
        write_weekly_series_csv(w, &artifacts.weekly_series)
    })?;
    write_file(&dir.join(NATIONAL_FILE), |w| {
        write_national_csv(w, &artifacts.national)
    })?;

    info!(dir = %dir.display(), "Artifacts written");
    Ok(())
}

fn write_file(path: &Path, write: impl FnOnce(&mut BufWriter<File>) -> Result<()>) -> Result<()> {
    debug!(path = %path.display(), "Writing artifact");
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer).with_context(|| format!("writing {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

/// Dense collapsed grid, one row per (jurisdiction, week).
pub fn write_grid_csv<W: Write>(out: W, grid: &CollapsedGrid) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(GRID_HEADER)?;
    for cell in &grid.cells {
        writer.serialize(GridRow::from(cell))?;
    }
    writer.flush()?;
    Ok(())
}

struct YearlyRecord<'a> {
    record: &'a ComparisonRecord,
    prior_key: &'a str,
    current_key: &'a str,
}

impl Serialize for YearlyRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let r = self.record;
        let len = 3 + usize::from(r.trend.is_some()) + usize::from(r.percent_change.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("State", &r.jurisdiction)?;
        map.serialize_entry(self.prior_key, &r.prior_year_cases)?;
        map.serialize_entry(self.current_key, &r.current_year_cases)?;
        if let Some(trend) = r.trend {
            map.serialize_entry("Change Indicator", &trend)?;
        }
        if let Some(pct) = r.percent_change {
            map.serialize_entry("Percent Change", &pct)?;
        }
        map.end()
    }
}

/// Pretty-printed comparison array. `Percent Change` is omitted, not null,
/// when undefined.
pub fn write_comparison_json<W: Write>(mut out: W, report: &ComparisonReport) -> Result<()> {
    let prior_key = format!("{} Cases", report.prior_year);
    let current_key = format!("{} Cases", report.current_year);
    let records: Vec<YearlyRecord> = report
        .records
        .iter()
        .map(|record| YearlyRecord {
            record,
            prior_key: &prior_key,
            current_key: &current_key,
        })
        .collect();

    serde_json::to_writer_pretty(&mut out, &records)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// One header row of metric names and one row of values. Empty summaries
/// produce an empty file.
pub fn write_summary_csv<W: Write>(out: W, summary: &ExternalSummary) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    if !summary.is_empty() {
        writer.write_record(summary.metrics.keys())?;
        writer.write_record(summary.metrics.values().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Two-column weekly series; header only when empty.
pub fn write_weekly_series_csv<W: Write>(out: W, points: &[WeeklySeriesPoint]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(WEEK_HEADER)?;
    for point in points {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}

/// National weekly totals.
pub fn write_national_csv<W: Write>(out: W, national: &[NationalWeek]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(WEEK_HEADER)?;
    for week in national {
        writer.serialize(week)?;
    }
    writer.flush()?;
    Ok(())
}
