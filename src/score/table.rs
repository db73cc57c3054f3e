//! Score Table Module
//! Per-code score lookups for regions or communes, resolved through the CUT code table.

use crate::data::loader::{float_values, int_values, load_table, require_column};
use crate::data::{CodeTable, Level, NameCodes};
use crate::error::{AtlasError, Result};
use crate::geo::{float_value, FeatureCollection};
use crate::stats::{value_range, ScoreSummary};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Score reported for a code with no row in the dataset.
///
/// This is a "no data" marker, not an error and not a real score: callers must
/// check for it (see [`is_missing`]) before treating the value as a measurement.
/// A dataset that genuinely stores `-1` is indistinguishable through
/// [`ScoreTable::score_by_code`]; use [`ScoreTable::lookup`] when that matters.
pub const MISSING_SCORE: f64 = -1.0;

/// True when `score` is the [`MISSING_SCORE`] marker.
pub fn is_missing(score: f64) -> bool {
    score == MISSING_SCORE
}

/// Which administrative level a score dataset is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Keyed by region code; bulk queries return dataset rows as they are.
    Regional,
    /// Keyed by commune code; bulk queries walk every commune in the code table.
    #[default]
    Communal,
}

impl ScoreMode {
    pub fn level(self) -> Level {
        match self {
            ScoreMode::Regional => Level::Region,
            ScoreMode::Communal => Level::Commune,
        }
    }
}

/// Where a score dataset lives and which of its columns matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSource {
    /// Internal name used to select the score.
    pub identifier: String,
    pub path: PathBuf,
    pub code_column: String,
    pub score_column: String,
    #[serde(default)]
    pub regional: bool,
    /// Extra columns carried along for display; not interpreted here.
    #[serde(default)]
    pub additional_columns: Vec<String>,
}

impl ScoreSource {
    pub fn mode(&self) -> ScoreMode {
        if self.regional {
            ScoreMode::Regional
        } else {
            ScoreMode::Communal
        }
    }
}

/// A read-only score dataset joined to one half of the code table.
#[derive(Debug, Clone)]
pub struct ScoreTable {
    identifier: String,
    mode: ScoreMode,
    data: DataFrame,
    locations: NameCodes,
    code_column: String,
    score_column: String,
    additional_columns: Vec<String>,
    codes: Vec<Option<i64>>,
    scores: Vec<f64>,
    /// Row positions per code, in dataset order.
    index: HashMap<i64, Vec<usize>>,
}

impl ScoreTable {
    /// Load the dataset at `source.path` (.csv, .xlsx or .xls).
    pub fn load(source: &ScoreSource, code_table: &CodeTable) -> Result<Self> {
        let data = load_table(&source.path)?;
        Self::from_dataframe(data, source, code_table)
    }

    /// Build a table from an already loaded dataset.
    pub fn from_dataframe(
        data: DataFrame,
        source: &ScoreSource,
        code_table: &CodeTable,
    ) -> Result<Self> {
        let required = [&source.code_column, &source.score_column]
            .into_iter()
            .chain(source.additional_columns.iter());
        for column in required {
            require_column(&data, column, &source.path)?;
        }

        let codes = int_values(data.column(&source.code_column)?)?;
        let scores = float_values(data.column(&source.score_column)?)?;

        let mut index: HashMap<i64, Vec<usize>> = HashMap::new();
        for (row, code) in codes.iter().enumerate() {
            if let Some(code) = code {
                index.entry(*code).or_default().push(row);
            }
        }

        let mode = source.mode();
        let locations = code_table.level(mode.level()).clone();

        info!(
            identifier = %source.identifier,
            ?mode,
            rows = data.height(),
            codes = index.len(),
            locations = locations.len(),
            "loaded score table"
        );

        Ok(Self {
            identifier: source.identifier.clone(),
            mode,
            data,
            locations,
            code_column: source.code_column.clone(),
            score_column: source.score_column.clone(),
            additional_columns: source.additional_columns.clone(),
            codes,
            scores,
            index,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn mode(&self) -> ScoreMode {
        self.mode
    }

    pub fn locations(&self) -> &NameCodes {
        &self.locations
    }

    pub fn code_column(&self) -> &str {
        &self.code_column
    }

    pub fn score_column(&self) -> &str {
        &self.score_column
    }

    pub fn additional_columns(&self) -> &[String] {
        &self.additional_columns
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Number of dataset rows.
    pub fn len(&self) -> usize {
        self.data.height()
    }

    pub fn is_empty(&self) -> bool {
        self.data.height() == 0
    }

    /// Score of the first row with `code`, `None` when no row has it.
    ///
    /// A row whose score cell is empty yields `Some(NaN)`.
    pub fn lookup(&self, code: i64) -> Option<f64> {
        self.index
            .get(&code)
            .and_then(|rows| rows.first())
            .map(|&row| self.scores[row])
    }

    /// Score of the first row with `code`, or [`MISSING_SCORE`] when absent.
    ///
    /// Rows sharing a code beyond the first are ignored.
    pub fn score_by_code(&self, code: i64) -> f64 {
        let score = self.lookup(code).unwrap_or(MISSING_SCORE);
        debug!(identifier = %self.identifier, code, score, "score lookup");
        score
    }

    /// Score for a region or commune name (by mode); `NotFound` for unknown names.
    pub fn score_by_name(&self, name: &str) -> Result<f64> {
        let code = self
            .locations
            .code_for(name)
            .ok_or_else(|| AtlasError::not_found(self.mode.level().label(), name))?;
        Ok(self.score_by_code(code))
    }

    /// Scores with their codes.
    ///
    /// Regional tables return the dataset's own rows in order (rows without a
    /// code are skipped). Communal tables return one entry per commune of the
    /// code table, in code table order, with [`MISSING_SCORE`] for communes the
    /// dataset lacks.
    pub fn all_scores(&self) -> (Vec<f64>, Vec<i64>) {
        match self.mode {
            ScoreMode::Regional => self.dataset_rows().unzip(),
            ScoreMode::Communal => self
                .locations
                .codes()
                .iter()
                .map(|&code| (self.score_by_code(code), code))
                .unzip(),
        }
    }

    /// Same as [`all_scores`](Self::all_scores) with names in place of codes.
    ///
    /// Regional codes missing from the code table are reported as the code text.
    pub fn scores_and_names(&self) -> (Vec<f64>, Vec<String>) {
        match self.mode {
            ScoreMode::Regional => self
                .dataset_rows()
                .map(|(score, code)| {
                    let name = self
                        .locations
                        .name_for(code)
                        .map(str::to_string)
                        .unwrap_or_else(|| code.to_string());
                    (score, name)
                })
                .unzip(),
            ScoreMode::Communal => self
                .locations
                .iter()
                .map(|(name, code)| (self.score_by_code(code), name.to_string()))
                .unzip(),
        }
    }

    fn dataset_rows(&self) -> impl Iterator<Item = (f64, i64)> + '_ {
        self.codes
            .iter()
            .zip(self.scores.iter())
            .filter_map(|(code, score)| code.map(|c| (*score, c)))
    }

    /// Copy of `collection` with each feature's score written to `target`.
    ///
    /// The code is read from the `code_property` property; features without a
    /// readable code get [`MISSING_SCORE`].
    pub fn apply_scores_to_geometry(
        &self,
        collection: &FeatureCollection,
        code_property: &str,
        target: &str,
    ) -> FeatureCollection {
        let mut out = collection.clone();
        for feature in &mut out.features {
            let score = feature
                .code_property(code_property)
                .map(|code| self.score_by_code(code))
                .unwrap_or(MISSING_SCORE);
            feature.set_property(target, float_value(score));
        }
        out
    }

    /// Every dataset row with `code` (zero, one or more).
    pub fn row_for_code(&self, code: i64) -> Result<DataFrame> {
        let rows: Vec<IdxSize> = self
            .index
            .get(&code)
            .map(|rows| rows.iter().map(|&r| r as IdxSize).collect())
            .unwrap_or_default();
        let idx = IdxCa::from_vec("rows".into(), rows);
        Ok(self.data.take(&idx)?)
    }

    /// Additional column values of the first row with `code`, as display text.
    pub fn details_for_code(&self, code: i64) -> Result<Vec<(String, String)>> {
        let Some(&row) = self.index.get(&code).and_then(|rows| rows.first()) else {
            return Ok(Vec::new());
        };
        self.additional_columns
            .iter()
            .map(|name| {
                let value = self.data.column(name)?.get(row)?;
                let text = if value.is_null() {
                    String::new()
                } else {
                    value.str_value().into_owned()
                };
                Ok((name.clone(), text))
            })
            .collect()
    }

    /// Min and max of a numeric column, ignoring missing values.
    pub fn column_min_max(&self, column: &str) -> Result<(f64, f64)> {
        let values = match self.data.column(column) {
            Ok(col) => float_values(col)?,
            Err(_) => return Err(AtlasError::not_found("column", column)),
        };
        value_range(&values).ok_or_else(|| AtlasError::NoNumericValues(column.to_string()))
    }

    /// Descriptive statistics of the score column.
    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary::from_values(&self.scores)
    }
}
