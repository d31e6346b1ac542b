//! Normalization of externally published weekly case series.
//!
//! The payload may be an array of row objects, an object wrapping such an
//! array under a container key, or an object of equal-length column arrays.
//! Date and case columns are located by name using a [`ColumnVocabulary`].

use chrono::{DateTime, Datelike, NaiveDate, Weekday};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::calendar::{active_year_window, parse_date};
use crate::config::ColumnVocabulary;
use crate::error::{Error, Result};
use crate::feeds::summary::type_name;
use crate::parser::parse_count;

/// One week of the normalized series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklySeriesPoint {
    #[serde(rename = "weekStart")]
    pub week_start: NaiveDate,
    pub cases: u64,
}

type Row = Map<String, Value>;

/// Decodes and normalizes a weekly-series payload for MMWR `year`.
///
/// # Errors
///
/// Returns [`Error::Json`] for invalid JSON and [`Error::SchemaMismatch`]
/// when the shape or columns are not recognized.
pub fn parse_weekly_series(
    bytes: &[u8],
    vocab: &ColumnVocabulary,
    year: i32,
) -> Result<Vec<WeeklySeriesPoint>> {
    let payload: Value = serde_json::from_slice(bytes)?;
    normalize_weekly_series(&payload, vocab, year)
}

/// Extracts `(week start, cases)` points inside MMWR `year`, ascending.
///
/// Rows with unparsable dates are dropped; unparsable case counts become 0.
/// Dates that are not Sundays are kept and logged.
///
/// # Errors
///
/// Returns [`Error::SchemaMismatch`] when the payload shape is unknown or
/// either column cannot be resolved.
pub fn normalize_weekly_series(
    payload: &Value,
    vocab: &ColumnVocabulary,
    year: i32,
) -> Result<Vec<WeeklySeriesPoint>> {
    let rows = extract_rows(payload, vocab)?;
    let columns = column_names(&rows);

    let date_col = resolve_column(&columns, &vocab.date_columns)
        .ok_or_else(|| Error::SchemaMismatch(format!("no date column among {columns:?}")))?;
    let case_col = resolve_column(&columns, &vocab.case_columns)
        .ok_or_else(|| Error::SchemaMismatch(format!("no case column among {columns:?}")))?;
    debug!(date_col, case_col, rows = rows.len(), "Weekly series columns resolved");

    let (first, last) = active_year_window(year);
    let (lo, hi) = (first.start_date, last.end_date());

    let mut unparsable = 0usize;
    let mut outside = 0usize;
    let mut points = Vec::new();

    for row in &rows {
        let Some(week_start) = row.get(date_col).and_then(value_to_date) else {
            unparsable += 1;
            continue;
        };
        if week_start < lo || week_start > hi {
            outside += 1;
            continue;
        }
        let cases = row.get(case_col).and_then(value_to_count).unwrap_or(0);
        points.push(WeeklySeriesPoint { week_start, cases });
    }

    points.sort_by_key(|p| p.week_start);

    let off_sunday = points
        .iter()
        .filter(|p| p.week_start.weekday() != Weekday::Sun)
        .count();
    if off_sunday > 0 {
        warn!(points = off_sunday, "Weekly series has week starts that are not Sundays");
    }

    info!(
        year,
        kept = points.len(),
        unparsable,
        outside,
        "Weekly series normalized"
    );

    Ok(points)
}

fn extract_rows(payload: &Value, vocab: &ColumnVocabulary) -> Result<Vec<Row>> {
    match payload {
        Value::Array(items) => {
            let rows: Vec<Row> = items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect();
            if rows.is_empty() && !items.is_empty() {
                return Err(Error::SchemaMismatch(
                    "weekly series array holds no row objects".to_string(),
                ));
            }
            Ok(rows)
        }
        Value::Object(map) => {
            for container in &vocab.container_keys {
                let found = map
                    .iter()
                    .find(|(k, v)| k.trim().eq_ignore_ascii_case(container.trim()) && v.is_array());
                if let Some((_, inner)) = found {
                    return extract_rows(inner, vocab);
                }
            }
            columns_to_rows(map)
        }
        other => Err(Error::SchemaMismatch(format!(
            "weekly series payload is a {}",
            type_name(other)
        ))),
    }
}

fn columns_to_rows(map: &Map<String, Value>) -> Result<Vec<Row>> {
    let mut columns = Vec::with_capacity(map.len());
    for (name, value) in map {
        match value {
            Value::Array(values) => columns.push((name, values)),
            _ => {
                return Err(Error::SchemaMismatch(format!(
                    "weekly series field {name:?} is neither a row container nor a column"
                )));
            }
        }
    }

    let len = columns.first().map_or(0, |(_, v)| v.len());
    if columns.iter().any(|(_, v)| v.len() != len) {
        return Err(Error::SchemaMismatch(
            "weekly series columns differ in length".to_string(),
        ));
    }

    Ok((0..len)
        .map(|i| {
            columns
                .iter()
                .map(|(name, values)| ((*name).clone(), values[i].clone()))
                .collect::<Row>()
        })
        .collect())
}

fn column_names(rows: &[Row]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !names.contains(&key.as_str()) {
                names.push(key);
            }
        }
    }
    names
}

/// First column matching a candidate, trying candidates in order.
pub fn resolve_column<'a>(columns: &[&'a str], candidates: &[String]) -> Option<&'a str> {
    candidates.iter().find_map(|candidate| {
        let wanted = candidate.trim().to_lowercase();
        columns
            .iter()
            .copied()
            .find(|col| col.trim().to_lowercase() == wanted)
    })
}

/// Date strings in any format [`parse_date`] accepts, or integer epoch
/// milliseconds (UTC).
fn value_to_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date(s).ok(),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

fn value_to_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => parse_count(s),
        _ => None,
    }
}
