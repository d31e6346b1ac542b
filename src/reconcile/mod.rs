//! Case reconciliation.
//!
//! Raw county rows are merged onto a dense jurisdiction × week grid, city
//! jurisdictions are folded into their state, and the folded totals are
//! compared against the prior-year baseline.

pub mod collapse;
pub mod compare;
pub mod grid;
pub mod types;
