//! Normalizers for the optional secondary feeds.

pub mod summary;
pub mod weekly;
