//! Error taxonomy shared by every loader and lookup.

use polars::prelude::PolarsError;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AtlasError>;

#[derive(Error, Debug)]
pub enum AtlasError {
    /// File missing, unreadable or not shaped the way the loader needs.
    #[error("Failed to load {origin}: {reason}")]
    DataLoad { origin: String, reason: String },
    #[error("Unsupported table format for {0}: expected .csv, .xlsx or .xls")]
    UnsupportedFormat(PathBuf),
    #[error("{kind} `{name}` not found")]
    NotFound { kind: &'static str, name: String },
    #[error("Column `{0}` has no numeric values")]
    NoNumericValues(String),
    #[error("Invalid configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

impl AtlasError {
    pub fn load(path: &Path, reason: impl ToString) -> Self {
        AtlasError::DataLoad {
            origin: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(kind: &'static str, name: impl ToString) -> Self {
        AtlasError::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}
