//! Stats module - descriptive statistics for legends and color scales

mod summary;

pub use summary::{value_range, ScoreSummary};
