//! Reconciles weekly measles case counts from disagreeing public feeds into
//! one gap-free MMWR-week series per US jurisdiction, with a year-over-year
//! comparison report.

pub mod calendar;
pub mod config;
pub mod error;
pub mod feeds;
pub mod fetch;
pub mod jurisdiction;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod reconcile;

pub use error::{Error, Result};
