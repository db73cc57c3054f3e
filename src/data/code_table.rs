//! Administrative Code Table Module
//! Cross-reference between region/commune names and their official codes.

use crate::data::loader::{int_values, load_table, string_values};
use crate::error::{AtlasError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hash;
use std::path::Path;
use tracing::{info, warn};

/// Which half of the code table a lookup works against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    Region,
    Commune,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::Region => "region",
            Level::Commune => "commune",
        }
    }
}

/// Index-aligned names and codes for one administrative level.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NameCodes {
    names: Vec<String>,
    codes: Vec<i64>,
}

impl NameCodes {
    pub fn new(names: Vec<String>, codes: Vec<i64>) -> Result<Self> {
        if names.len() != codes.len() {
            return Err(AtlasError::DataLoad {
                origin: "code table".to_string(),
                reason: format!(
                    "{} names do not align with {} codes",
                    names.len(),
                    codes.len()
                ),
            });
        }
        Ok(Self { names, codes })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn codes(&self) -> &[i64] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Code of the first entry named `name`.
    pub fn code_for(&self, name: &str) -> Option<i64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.codes[i])
    }

    /// Name of the first entry with `code`.
    pub fn name_for(&self, code: i64) -> Option<&str> {
        self.codes
            .iter()
            .position(|&c| c == code)
            .map(|i| self.names[i].as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.codes.iter().copied())
    }
}

/// The CUT reference table: regions and communes with their codes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CodeTable {
    regions: NameCodes,
    communes: NameCodes,
}

impl CodeTable {
    pub fn new(regions: NameCodes, communes: NameCodes) -> Self {
        Self { regions, communes }
    }

    /// Load the reference table.
    ///
    /// Columns are positional: 0 = region code, 1 = region name,
    /// second-to-last = commune code, last = commune name. Each column is
    /// de-duplicated on its own, keeping first-seen order.
    pub fn load(path: &Path) -> Result<Self> {
        let df = load_table(path)?;
        let width = df.width();
        if width < 4 {
            return Err(AtlasError::load(
                path,
                format!("expected at least 4 columns, found {width}"),
            ));
        }

        let columns = df.get_columns();
        let region_codes = unique_present(int_values(&columns[0])?, "region code", path);
        let region_names = unique_present(string_values(&columns[1])?, "region name", path);
        let commune_codes =
            unique_present(int_values(&columns[width - 2])?, "commune code", path);
        let commune_names =
            unique_present(string_values(&columns[width - 1])?, "commune name", path);

        let regions = NameCodes::new(region_names, region_codes)
            .map_err(|e| AtlasError::load(path, format!("regions: {e}")))?;
        let communes = NameCodes::new(commune_names, commune_codes)
            .map_err(|e| AtlasError::load(path, format!("communes: {e}")))?;

        info!(
            path = %path.display(),
            regions = regions.len(),
            communes = communes.len(),
            "loaded code table"
        );
        Ok(Self { regions, communes })
    }

    pub fn regions(&self) -> &NameCodes {
        &self.regions
    }

    pub fn communes(&self) -> &NameCodes {
        &self.communes
    }

    pub fn level(&self, level: Level) -> &NameCodes {
        match level {
            Level::Region => &self.regions,
            Level::Commune => &self.communes,
        }
    }

    /// Communes whose code falls under `region_code` (commune code / 1000).
    pub fn communes_in_region(&self, region_code: i64) -> Vec<(&str, i64)> {
        self.communes
            .iter()
            .filter(|(_, code)| code / 1000 == region_code)
            .collect()
    }
}

/// First-seen unique values, skipping empty cells.
fn unique_present<T: Eq + Hash + Clone>(
    values: Vec<Option<T>>,
    what: &str,
    path: &Path,
) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut skipped = 0usize;
    for value in values {
        match value {
            Some(v) => {
                if seen.insert(v.clone()) {
                    out.push(v);
                }
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "empty {what} cells ignored");
    }
    out
}
