//! Run configuration: feed endpoints, timeouts and the weekly-series
//! column vocabulary.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// County-level JHU CSSE measles case feed.
pub const DEFAULT_CASES_FEED_URL: &str =
    "https://raw.githubusercontent.com/CSSEGISandData/measles_data/main/measles_county_all_updates.csv";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where each feed is fetched from.
///
/// The summary and weekly-series feeds are optional; `None` means the feed
/// is unavailable for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    pub cases: String,
    pub summary: Option<String>,
    pub weekly_series: Option<String>,
}

impl Default for FeedEndpoints {
    fn default() -> Self {
        Self {
            cases: DEFAULT_CASES_FEED_URL.to_string(),
            summary: None,
            weekly_series: None,
        }
    }
}

impl FeedEndpoints {
    /// Reads `CASES_FEED_URL`, `SUMMARY_FEED_URL` and
    /// `WEEKLY_SERIES_FEED_URL`, falling back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            cases: non_empty("CASES_FEED_URL")
                .unwrap_or_else(|| DEFAULT_CASES_FEED_URL.to_string()),
            summary: non_empty("SUMMARY_FEED_URL"),
            weekly_series: non_empty("WEEKLY_SERIES_FEED_URL"),
        }
    }
}

/// Candidate names used to find columns in the weekly-series feed.
///
/// Matching trims and lower-cases both sides; earlier candidates win.
/// Stored on disk as JSON:
/// ```json
/// {
///   "date_columns": ["week start date", "week_start"],
///   "case_columns": ["weekly cases", "cases"],
///   "container_keys": ["data", "rows"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnVocabulary {
    pub date_columns: Vec<String>,
    pub case_columns: Vec<String>,
    /// Object keys that may wrap the row array.
    #[serde(default = "default_container_keys")]
    pub container_keys: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_container_keys() -> Vec<String> {
    strings(&["data", "rows", "records", "results", "items", "series", "weeks"])
}

impl Default for ColumnVocabulary {
    fn default() -> Self {
        Self {
            date_columns: strings(&[
                "week start date",
                "week_start_date",
                "week start",
                "week_start",
                "weekstart",
                "mmwr_week_start",
                "week_start_dt",
                "week",
                "date",
            ]),
            case_columns: strings(&[
                "weekly cases",
                "weekly_cases",
                "cases",
                "case_count",
                "new cases",
                "new_cases",
                "count",
                "value",
            ]),
            container_keys: default_container_keys(),
        }
    }
}

impl ColumnVocabulary {
    /// Loads a vocabulary from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading column vocabulary {path}"))?;
        let vocab = serde_json::from_str(&content)
            .with_context(|| format!("parsing column vocabulary {path}"))?;
        Ok(vocab)
    }

    /// Uses the file named by `WEEKLY_SERIES_VOCABULARY` when set.
    pub fn from_env() -> Result<Self> {
        match std::env::var("WEEKLY_SERIES_VOCABULARY") {
            Ok(path) if !path.trim().is_empty() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env;
    use std::fs;

    #[test]
    fn test_endpoints_default_when_unset() {
        let endpoints = FeedEndpoints::from_lookup(|_| None);
        assert_eq!(endpoints, FeedEndpoints::default());
    }

    #[test]
    fn test_endpoints_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CASES_FEED_URL", "http://localhost/cases.csv"),
            ("SUMMARY_FEED_URL", "  "),
            ("WEEKLY_SERIES_FEED_URL", "http://localhost/weekly.json"),
        ]
        .into_iter()
        .collect();
        let endpoints = FeedEndpoints::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(endpoints.cases, "http://localhost/cases.csv");
        assert_eq!(endpoints.summary, None);
        assert_eq!(
            endpoints.weekly_series.as_deref(),
            Some("http://localhost/weekly.json")
        );
    }

    #[test]
    fn test_vocabulary_load_defaults_container_keys() {
        let path = format!(
            "{}/measles_tracker_vocab_test.json",
            env::temp_dir().display()
        );
        fs::write(
            &path,
            r#"{"date_columns": ["Semana"], "case_columns": ["Casos"]}"#,
        )
        .unwrap();

        let vocab = ColumnVocabulary::load(&path).unwrap();
        assert_eq!(vocab.date_columns, vec!["Semana"]);
        assert_eq!(vocab.container_keys, default_container_keys());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_vocabulary_load_missing_file() {
        assert!(ColumnVocabulary::load("/nonexistent/vocab.json").is_err());
    }
}
