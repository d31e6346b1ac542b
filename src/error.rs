//! Error taxonomy for the reconciliation engine.

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reconciling case feeds.
#[derive(Debug, Error)]
pub enum Error {
    /// A date was null or could not be parsed.
    #[error("invalid date: {0:?}")]
    InvalidDate(String),

    /// A location label did not split into exactly `county, jurisdiction`.
    #[error("malformed location: {0:?}")]
    MalformedLocation(String),

    /// A jurisdiction name did not resolve against the registry.
    #[error("unknown jurisdiction: {0:?}")]
    UnknownJurisdiction(String),

    /// The weekly series payload did not expose the expected columns.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A feed could not be retrieved.
    #[error("transport failure for {url}: {message}")]
    TransportFailure {
        /// Endpoint that was requested.
        url: String,
        /// Underlying cause.
        message: String,
    },

    /// The grid contained a (jurisdiction, week) key more than once.
    #[error("duplicate grid key: {jurisdiction} / {week_start}")]
    DuplicateGridKey {
        jurisdiction: String,
        week_start: chrono::NaiveDate,
    },

    /// The case feed was not readable CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON feed was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
