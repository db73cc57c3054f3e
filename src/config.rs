//! Atlas configuration: where the code table, boundaries, forecasts and scores live.

use crate::data::ForecastColumns;
use crate::error::{AtlasError, Result};
use crate::score::ScoreSource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// CUT reference table.
    pub code_table: PathBuf,
    /// Directory holding `1.geojson` .. `16.geojson`.
    pub geo_dir: PathBuf,
    pub forecast: PathBuf,
    pub forecast_columns: ForecastColumns,
    pub scores: Vec<ScoreSource>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            code_table: PathBuf::from("./data/cut.xls"),
            geo_dir: PathBuf::from("./chile-geojson-master"),
            forecast: PathBuf::from("./data/fcast_delitos_comunas.csv"),
            forecast_columns: ForecastColumns::default(),
            scores: Vec::new(),
        }
    }
}

impl AtlasConfig {
    /// Read a JSON configuration file; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| AtlasError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| AtlasError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!(path = %path.display(), scores = config.scores.len(), "loaded config");
        Ok(config)
    }

    pub fn score_source(&self, identifier: &str) -> Option<&ScoreSource> {
        self.scores.iter().find(|s| s.identifier == identifier)
    }
}
