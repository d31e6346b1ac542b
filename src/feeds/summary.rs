//! Normalization of the national summary feed.
//!
//! The feed is a flat JSON object whose values mix integers and prose such
//! as `"82% of cases"` or `"(286 of 2,255) 13%"`. Only recognizable metrics
//! survive; everything else is dropped.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::parser::parse_count;

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("valid percent pattern"));
static OF_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*(\d[\d,]*)\s+of\b").expect("valid count pattern"));

pub const TOTAL_CASES: &str = "total_cases";
pub const TOTAL_DEATHS: &str = "total_deaths";
pub const HOSPITALIZED_PCT: &str = "hospitalized_pct";
pub const HOSPITALIZED_COUNT: &str = "hospitalized_count";

/// A metric value: an absolute count or a fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Count(u64),
    Fraction(f64),
}

impl fmt::Display for SummaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryValue::Count(n) => write!(f, "{n}"),
            SummaryValue::Fraction(x) => write!(f, "{x}"),
        }
    }
}

/// Sparse metric map, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExternalSummary {
    pub metrics: BTreeMap<String, SummaryValue>,
}

impl ExternalSummary {
    pub fn get(&self, key: &str) -> Option<SummaryValue> {
        self.metrics.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    TotalCases,
    TotalDeaths,
    CasesHospitalized,
    HospitalizationRate,
    Other,
}

fn classify(key: &str) -> KeyKind {
    let words = key.replace(['_', '-'], " ");
    if words.contains("death") {
        KeyKind::TotalDeaths
    } else if words.contains("hospitalized") {
        KeyKind::CasesHospitalized
    } else if words.contains("hospitalization") {
        KeyKind::HospitalizationRate
    } else if words.contains("total") && words.contains("case") {
        KeyKind::TotalCases
    } else {
        KeyKind::Other
    }
}

/// Decodes and normalizes a summary payload.
///
/// # Errors
///
/// Returns [`Error::Json`] for invalid JSON and [`Error::SchemaMismatch`]
/// when the top level is not an object.
pub fn parse_summary(bytes: &[u8]) -> Result<ExternalSummary> {
    let value: Value = serde_json::from_slice(bytes)?;
    match value {
        Value::Object(map) => Ok(normalize_summary(&map)),
        other => Err(Error::SchemaMismatch(format!(
            "summary payload is not an object: {}",
            type_name(&other)
        ))),
    }
}

/// Extracts typed metrics from a loosely-typed key/value payload.
///
/// Hospitalization-rate keys are read before cases-hospitalized keys, so a
/// percentage embedded in the latter only fills the fraction when no rate
/// was given.
pub fn normalize_summary(payload: &Map<String, Value>) -> ExternalSummary {
    let mut summary = ExternalSummary::default();
    let mut deferred = Vec::new();

    for (raw_key, value) in payload {
        let key = raw_key.trim().to_lowercase();
        match classify(&key) {
            KeyKind::TotalCases if insert_count(&mut summary, TOTAL_CASES, value) => {}
            KeyKind::TotalDeaths if insert_count(&mut summary, TOTAL_DEATHS, value) => {}
            KeyKind::HospitalizationRate => {
                if let Some(pct) = value.as_str().and_then(extract_percent) {
                    summary
                        .metrics
                        .insert(HOSPITALIZED_PCT.to_string(), SummaryValue::Fraction(pct));
                }
            }
            KeyKind::CasesHospitalized => deferred.push(value),
            KeyKind::TotalCases | KeyKind::TotalDeaths | KeyKind::Other => {
                if let Some(pct) = value
                    .as_str()
                    .filter(|s| s.contains('%'))
                    .and_then(extract_percent)
                {
                    summary.metrics.insert(key, SummaryValue::Fraction(pct));
                } else {
                    debug!(key = %raw_key, "Dropping unrecognized summary field");
                }
            }
        }
    }

    for value in deferred {
        let Some(text) = value.as_str() else {
            continue;
        };
        if let Some(count) = OF_COUNT
            .captures(text)
            .and_then(|c| parse_count(&c[1]))
        {
            summary
                .metrics
                .insert(HOSPITALIZED_COUNT.to_string(), SummaryValue::Count(count));
        }
        if !summary.metrics.contains_key(HOSPITALIZED_PCT) {
            if let Some(pct) = extract_trailing_percent(text) {
                summary
                    .metrics
                    .insert(HOSPITALIZED_PCT.to_string(), SummaryValue::Fraction(pct));
            }
        }
    }

    summary
}

/// Stores `value` as an integer count under `key`. Returns false when it is
/// not one.
fn insert_count(summary: &mut ExternalSummary, key: &str, value: &Value) -> bool {
    let count = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => parse_count(s),
        _ => None,
    };
    match count {
        Some(n) => {
            summary.metrics.insert(key.to_string(), SummaryValue::Count(n));
            true
        }
        None => false,
    }
}

/// First `<number>%` in `text`, as a fraction.
fn extract_percent(text: &str) -> Option<f64> {
    PERCENT
        .captures(text)
        .and_then(|c| c[1].parse::<f64>().ok())
        .map(|p| p / 100.0)
}

/// Last `<number>%` in `text`, as a fraction.
fn extract_trailing_percent(text: &str) -> Option<f64> {
    PERCENT
        .captures_iter(text)
        .last()
        .and_then(|c| c[1].parse::<f64>().ok())
        .map(|p| p / 100.0)
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> ExternalSummary {
        match value {
            Value::Object(map) => normalize_summary(&map),
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn test_hospitalization_percent_becomes_fraction() {
        let summary = normalize(json!({"US_Hospitalizations_in_2024": "82% of cases"}));
        assert_eq!(summary.metrics.len(), 1);
        assert_eq!(
            summary.get(HOSPITALIZED_PCT),
            Some(SummaryValue::Fraction(0.82))
        );
    }

    #[test]
    fn test_totals_coerced_to_integers() {
        let summary = normalize(json!({
            " Total Cases ": "1,197",
            "total_deaths": 3,
        }));
        assert_eq!(summary.get(TOTAL_CASES), Some(SummaryValue::Count(1197)));
        assert_eq!(summary.get(TOTAL_DEATHS), Some(SummaryValue::Count(3)));
    }

    #[test]
    fn test_cases_hospitalized_count_and_fallback_percent() {
        let summary = normalize(json!({"Cases Hospitalized": "(155 of 1,197) 13%"}));
        assert_eq!(
            summary.get(HOSPITALIZED_COUNT),
            Some(SummaryValue::Count(155))
        );
        assert_eq!(
            summary.get(HOSPITALIZED_PCT),
            Some(SummaryValue::Fraction(0.13))
        );
    }

    #[test]
    fn test_rate_wins_over_hospitalized_percent() {
        let summary = normalize(json!({
            "cases_hospitalized": "(155 of 1,197) 13%",
            "hospitalization_rate": "12%",
        }));
        assert_eq!(
            summary.get(HOSPITALIZED_PCT),
            Some(SummaryValue::Fraction(0.12))
        );
        assert_eq!(
            summary.get(HOSPITALIZED_COUNT),
            Some(SummaryValue::Count(155))
        );
    }

    #[test]
    fn test_generic_percent_and_dropped_fields() {
        let summary = normalize(json!({
            "Vaccinated_Share": "96% unvaccinated or unknown",
            "Updated": "Wednesday",
            "jurisdictions": 35,
        }));
        assert_eq!(summary.metrics.len(), 1);
        assert_eq!(
            summary.get("vaccinated_share"),
            Some(SummaryValue::Fraction(0.96))
        );
    }

    #[test]
    fn test_percent_under_count_key_kept_generically() {
        let summary = normalize(json!({
            "death_rate": "2%",
            "Deaths_pct": "1%",
            "Total Cases Share": "50% of reported",
        }));
        assert_eq!(summary.get("death_rate"), Some(SummaryValue::Fraction(0.02)));
        assert_eq!(summary.get("deaths_pct"), Some(SummaryValue::Fraction(0.01)));
        assert_eq!(
            summary.get("total cases share"),
            Some(SummaryValue::Fraction(0.5))
        );
        assert_eq!(summary.get(TOTAL_DEATHS), None);
        assert_eq!(summary.get(TOTAL_CASES), None);
    }

    #[test]
    fn test_parse_summary_rejects_non_object() {
        assert!(matches!(
            parse_summary(b"[1, 2]"),
            Err(Error::SchemaMismatch(_))
        ));
        assert!(matches!(parse_summary(b"{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_display_for_csv() {
        assert_eq!(SummaryValue::Count(7).to_string(), "7");
        assert_eq!(SummaryValue::Fraction(0.82).to_string(), "0.82");
    }
}
