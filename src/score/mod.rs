//! Score module - per-code score lookups

mod table;

pub use table::{is_missing, ScoreMode, ScoreSource, ScoreTable, MISSING_SCORE};
